pub mod alerts;
pub mod health;
pub mod metrics;
pub mod stats;
pub mod transactions;
pub mod whales;
pub mod ws;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::TransferKind;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// `None` when no type filter was given; an unrecognized type is a 400.
    pub fn kind(&self) -> Result<Option<TransferKind>, AppError> {
        match self.kind.as_deref() {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => TransferKind::from_api_str(raw)
                .map(Some)
                .ok_or_else(|| AppError::BadRequest(format!("unknown transaction type: {raw}"))),
        }
    }
}
