//! Readiness endpoint: which data generation is being served.

use axum::{extract::State, routing::get, Json, Router};

use super::AppState;
use crate::error::ApiError;
use crate::snapshot::SnapshotInfo;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/status", get(handler))
}

/// Handle `GET /status`.
///
/// 503 until the first generation has been published.
async fn handler(State((store, _config)): State<AppState>) -> Result<Json<SnapshotInfo>, ApiError> {
    // ---
    let snapshot = store.current().ok_or(ApiError::Unavailable)?;
    Ok(Json(snapshot.info()))
}
