use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AlertDefinition, AlertTrigger, AlertUpdate, NewAlert, NewTrigger};

pub async fn get_all_alerts(pool: &PgPool) -> anyhow::Result<Vec<AlertDefinition>> {
    let alerts =
        sqlx::query_as::<_, AlertDefinition>("SELECT * FROM alerts ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    Ok(alerts)
}

pub async fn get_active_alerts(pool: &PgPool) -> anyhow::Result<Vec<AlertDefinition>> {
    let alerts = sqlx::query_as::<_, AlertDefinition>(
        "SELECT * FROM alerts WHERE is_active = true ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

pub async fn get_alert(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<AlertDefinition>> {
    let alert = sqlx::query_as::<_, AlertDefinition>("SELECT * FROM alerts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(alert)
}

pub async fn create_alert(pool: &PgPool, alert: &NewAlert) -> anyhow::Result<AlertDefinition> {
    let row = sqlx::query_as::<_, AlertDefinition>(
        r#"
        INSERT INTO alerts (name, description, conditions, actions, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(alert.name.trim())
    .bind(&alert.description)
    .bind(Json(&alert.conditions))
    .bind(Json(&alert.actions))
    .bind(alert.is_active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Apply a partial update. Returns `None` when the alert does not exist.
pub async fn update_alert(
    pool: &PgPool,
    id: Uuid,
    update: &AlertUpdate,
) -> anyhow::Result<Option<AlertDefinition>> {
    let row = sqlx::query_as::<_, AlertDefinition>(
        r#"
        UPDATE alerts
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            conditions = COALESCE($4, conditions),
            actions = COALESCE($5, actions),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name.as_deref().map(str::trim))
    .bind(&update.description)
    .bind(update.conditions.as_ref().map(Json))
    .bind(update.actions.as_ref().map(Json))
    .bind(update.is_active)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Append a trigger record and bump the alert's counters in one transaction.
pub async fn record_trigger(pool: &PgPool, trigger: &NewTrigger) -> anyhow::Result<AlertTrigger> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, AlertTrigger>(
        r#"
        INSERT INTO alert_triggers (alert_id, triggered_at, conditions, data, message, success)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(trigger.alert_id)
    .bind(trigger.triggered_at)
    .bind(Json(&trigger.conditions))
    .bind(Json(&trigger.data))
    .bind(&trigger.message)
    .bind(trigger.success)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE alerts
        SET triggered_count = triggered_count + 1,
            last_triggered = $2
        WHERE id = $1
        "#,
    )
    .bind(trigger.alert_id)
    .bind(trigger.triggered_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(row)
}

/// Attach the delivery report to a freshly written trigger. Applies at most
/// once per trigger; a row that already carries a report is left alone.
pub async fn finalize_trigger(
    pool: &PgPool,
    id: Uuid,
    success: bool,
    delivery: &serde_json::Value,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE alert_triggers
        SET success = $2,
            data = data || jsonb_build_object('delivery', $3::jsonb)
        WHERE id = $1 AND NOT (data ? 'delivery')
        "#,
    )
    .bind(id)
    .bind(success)
    .bind(Json(delivery))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_triggers_for_alert(
    pool: &PgPool,
    alert_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<AlertTrigger>> {
    let rows = sqlx::query_as::<_, AlertTrigger>(
        r#"
        SELECT * FROM alert_triggers
        WHERE alert_id = $1
        ORDER BY triggered_at DESC
        LIMIT $2
        "#,
    )
    .bind(alert_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
