use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{ActivityStats, Timeframe, WhaleMetrics};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub timeframe: Option<String>,
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub timeframe: Timeframe,
    #[serde(flatten)]
    pub stats: ActivityStats,
}

pub async fn activity(
    State(state): State<AppState>,
    Query(q): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<ActivityResponse>>, AppError> {
    let timeframe = Timeframe::parse(q.timeframe.as_deref().unwrap_or("24h"));
    let stats = state.aggregator.activity_stats(timeframe, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(ActivityResponse { timeframe, stats })))
}

pub async fn metrics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<WhaleMetrics>>, AppError> {
    let metrics = state.aggregator.whale_metrics().await?;
    Ok(Json(ApiResponse::ok(metrics)))
}
