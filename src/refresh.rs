//! Periodic dataset refresh.
//!
//! Each refresh loads the source tables, builds a new [`Snapshot`] and
//! publishes it. A failed refresh leaves the previous generation in place.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::dataset::{load_dataset, DatasetProvider};
use crate::error::SnapshotError;
use crate::scoring::ScoringConfig;
use crate::snapshot::{Snapshot, SnapshotStore};

// ---

/// Load, score and publish one generation.
///
/// # Errors
/// Dataset or snapshot build failures; the store is left untouched.
pub async fn refresh_once(
    provider: &dyn DatasetProvider,
    store: &SnapshotStore,
    scoring: &ScoringConfig,
) -> Result<Arc<Snapshot>, SnapshotError> {
    // ---
    let dataset = load_dataset(provider).await?;
    let snapshot = Snapshot::build(dataset, scoring)?;
    Ok(store.publish(snapshot))
}

/// Refresh every `period`, starting one period from now.
pub fn spawn_refresh_loop(
    provider: Arc<dyn DatasetProvider>,
    store: Arc<SnapshotStore>,
    scoring: ScoringConfig,
    period: Duration,
) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial load is done
        // by the caller.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            info!("refreshing dataset");
            if let Err(e) = refresh_once(provider.as_ref(), &store, &scoring).await {
                error!("dataset refresh failed, keeping previous generation: {}", e);
            }
        }
    })
}
