use crate::api::requests::InvalidateRequest;
use crate::api::responses::{ErrorResponse, RemovedResponse, ResetResponse, StatsResponse};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

/// GET /cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().await.into())
}

/// POST /cache/invalidate
pub async fn invalidate(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>, (StatusCode, Json<ErrorResponse>)> {
    let pattern = req.pattern.trim();
    if pattern.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("pattern must not be empty")),
        ));
    }

    info!("INVALIDATE: pattern={}", pattern);
    let removed = state.cache.invalidate_pattern(pattern).await;
    Ok(Json(RemovedResponse { removed }))
}

/// POST /cache/cleanup
pub async fn cleanup(State(state): State<AppState>) -> Json<RemovedResponse> {
    info!("CLEANUP");
    let removed = state.cache.cleanup().await;
    Json(RemovedResponse { removed })
}

/// DELETE /cache
pub async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    info!("RESET");
    state.cache.reset().await;
    Json(ResetResponse { ok: true })
}
