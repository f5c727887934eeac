use axum::extract::{Query, State};
use axum::Json;

use super::{ApiResponse, PageQuery};
use crate::db::TransactionFilter;
use crate::errors::AppError;
use crate::models::TransactionRecord;
use crate::AppState;

pub async fn recent(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionRecord>>>, AppError> {
    let filter = TransactionFilter {
        whale_address: None,
        kind: page.kind()?,
        limit: page.limit(),
        offset: page.offset(),
    };
    let rows = state.store.recent_transactions(&filter).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
