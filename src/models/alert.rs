use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// What a condition is measured against. Unrecognized types deserialize to
/// `Unknown`, which never holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Balance,
    Transaction,
    Price,
    Volume,
    #[serde(other)]
    Unknown,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Balance => "balance",
            ConditionKind::Transaction => "transaction",
            ConditionKind::Price => "price",
            ConditionKind::Volume => "volume",
            ConditionKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "!=")]
    Ne,
    #[serde(other)]
    Unknown,
}

impl Operator {
    /// Apply the comparison `actual <op> expected`. `Unknown` is always false.
    pub fn compare(&self, actual: Decimal, expected: Decimal) -> bool {
        match self {
            Operator::Gt => actual > expected,
            Operator::Lt => actual < expected,
            Operator::Eq => actual == expected,
            Operator::Gte => actual >= expected,
            Operator::Lte => actual <= expected,
            Operator::Ne => actual != expected,
            Operator::Unknown => false,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Ne => "!=",
            Operator::Unknown => "?",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub operator: Operator,
    pub value: Decimal,
    /// Stored with the alert but not consulted during evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl AlertCondition {
    pub fn new(kind: ConditionKind, operator: Operator, value: Decimal) -> Self {
        Self {
            kind,
            operator,
            value,
            timeframe: None,
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.operator, self.value)
    }
}

// ---------------------------------------------------------------------------
// Alert definitions and triggers
// ---------------------------------------------------------------------------

/// Database row for the alerts table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertDefinition {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub conditions: Json<Vec<AlertCondition>>,
    pub actions: Json<Vec<String>>,
    pub is_active: bool,
    pub triggered_count: i32,
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub conditions: Vec<AlertCondition>,
    pub actions: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err("name must be 1-100 characters".into());
    }
    Ok(())
}

impl NewAlert {
    /// Reject definitions the evaluation cycle could never act on.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        if self.conditions.is_empty() {
            return Err("at least one condition is required".into());
        }
        if self.actions.is_empty() {
            return Err("at least one action is required".into());
        }
        Ok(())
    }
}

/// Partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub conditions: Option<Vec<AlertCondition>>,
    pub actions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl AlertUpdate {
    /// Same rules as creation, applied only to the fields being changed.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if self.conditions.as_ref().is_some_and(Vec::is_empty) {
            return Err("at least one condition is required".into());
        }
        if self.actions.as_ref().is_some_and(Vec::is_empty) {
            return Err("at least one action is required".into());
        }
        Ok(())
    }
}

/// Database row for the append-only alert_triggers table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertTrigger {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    /// Copy of the alert's conditions at trigger time.
    pub conditions: Json<Vec<AlertCondition>>,
    pub data: Json<serde_json::Value>,
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct NewTrigger {
    pub alert_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    pub conditions: Vec<AlertCondition>,
    pub data: serde_json::Value,
    pub message: String,
    pub success: bool,
}
