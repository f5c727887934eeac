use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{AlertDefinition, AlertTrigger, AlertUpdate, NewAlert};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AlertDefinition>>>, AppError> {
    let alerts = state.store.list_alerts().await?;
    Ok(Json(ApiResponse::ok(alerts)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewAlert>,
) -> Result<(StatusCode, Json<ApiResponse<AlertDefinition>>), AppError> {
    body.validate().map_err(AppError::BadRequest)?;

    let alert = state.store.create_alert(&body).await?;
    tracing::info!(alert_id = %alert.id, name = %alert.name, "Alert created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(alert))))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AlertDefinition>>, AppError> {
    let alert = state
        .store
        .get_alert(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("alert {id}")))?;
    Ok(Json(ApiResponse::ok(alert)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AlertUpdate>,
) -> Result<Json<ApiResponse<AlertDefinition>>, AppError> {
    body.validate().map_err(AppError::BadRequest)?;

    let alert = state
        .store
        .update_alert(id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("alert {id}")))?;

    tracing::info!(alert_id = %alert.id, is_active = alert.is_active, "Alert updated");
    Ok(Json(ApiResponse::ok(alert)))
}

pub async fn triggers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<TriggerQuery>,
) -> Result<Json<ApiResponse<Vec<AlertTrigger>>>, AppError> {
    if state.store.get_alert(id).await?.is_none() {
        return Err(AppError::NotFound(format!("alert {id}")));
    }
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let rows = state.store.triggers_for_alert(id, limit).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
