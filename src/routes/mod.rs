use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{Config, SnapshotStore};

mod get_recommendations;
mod health;
mod status;

// ---

/// Shared state handed to every route: the published snapshot holder and the
/// immutable configuration.
pub type AppState = (Arc<SnapshotStore>, Config);

pub fn router(store: Arc<SnapshotStore>, config: Config) -> Router {
    // ---
    Router::new()
        .merge(get_recommendations::router())
        .merge(status::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .with_state((store, config))
}
