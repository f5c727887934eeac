use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Pull the presented token from `Authorization: Bearer <token>`, or from a
/// `token` query parameter for WebSocket clients that cannot set headers.
fn presented_token(req: &Request) -> Option<&str> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    header.or_else(|| {
        req.uri()
            .query()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
    })
}

/// Guards `/api/*` and `/ws`. With no `API_TOKEN` configured every request
/// passes (local development).
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_token.as_deref() else {
        return next.run(req).await;
    };

    let rejection = match presented_token(&req) {
        Some(token) if token == expected => None,
        Some(_) => Some("Invalid token"),
        None => Some("Missing bearer token"),
    };

    match rejection {
        None => next.run(req).await,
        Some(reason) => AppError::Unauthorized(reason).into_response(),
    }
}
