use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use super::{ApiResponse, PageQuery};
use crate::db::TransactionFilter;
use crate::errors::AppError;
use crate::models::{TransactionRecord, WhaleAccount};
use crate::AppState;

const DETAIL_RECENT_TRANSACTIONS: i64 = 20;

#[derive(Serialize)]
pub struct WhaleDetail {
    #[serde(flatten)]
    pub whale: WhaleAccount,
    pub recent_transactions: Vec<TransactionRecord>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<WhaleAccount>>>, AppError> {
    let whales = state.store.top_whales(page.limit(), page.offset()).await?;
    Ok(Json(ApiResponse::ok(whales)))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<WhaleDetail>>, AppError> {
    let whale = state
        .store
        .get_whale(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("whale {address}")))?;

    let recent_transactions = state
        .store
        .recent_transactions(&TransactionFilter {
            whale_address: Some(address),
            limit: DETAIL_RECENT_TRANSACTIONS,
            ..Default::default()
        })
        .await?;

    Ok(Json(ApiResponse::ok(WhaleDetail {
        whale,
        recent_transactions,
    })))
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionRecord>>>, AppError> {
    let filter = TransactionFilter {
        whale_address: Some(address),
        kind: page.kind()?,
        limit: page.limit(),
        offset: page.offset(),
    };
    let rows = state.store.recent_transactions(&filter).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
