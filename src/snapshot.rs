//! Immutable data generations and their atomic publication.
//!
//! A [`Snapshot`] bundles the deduplicated sensor table, the polluter
//! registry and the scored prediction grid built from one load of the
//! source data. It is never modified after construction. [`SnapshotStore`]
//! holds the currently published generation behind an `ArcSwapOption`;
//! readers get a consistent `Arc` without blocking and writers replace it
//! in a single pointer swap.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::dataset::{Dataset, POLLUTERS, PREDICTIONS, SENSORS};
use crate::error::SnapshotError;
use crate::models::{PolluterRecord, ScoredPrediction, SensorRecord};
use crate::scoring::{self, ScoringConfig};

// ---

/// One data generation.
#[derive(Debug)]
pub struct Snapshot {
    generation: Uuid,
    loaded_at: DateTime<Utc>,
    sensors: Vec<SensorRecord>,
    polluters: Vec<PolluterRecord>,
    predictions: Vec<ScoredPrediction>,
}

/// Summary of a published generation, served by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub generation: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub sensors: usize,
    pub polluters: usize,
    pub predictions: usize,
}

impl Snapshot {
    /// Score and package a freshly loaded dataset.
    ///
    /// Sensors are deduplicated by `sensor_id`, keeping the first row seen.
    ///
    /// # Errors
    /// [`SnapshotError::EmptyTable`] when any source table has no rows, or
    /// the normalizer's error when the prediction grid cannot be scored.
    pub fn build(dataset: Dataset, scoring: &ScoringConfig) -> Result<Self, SnapshotError> {
        // ---
        let Dataset {
            sensors,
            polluters,
            predictions,
        } = dataset;

        if sensors.is_empty() {
            return Err(SnapshotError::EmptyTable { table: SENSORS });
        }
        if polluters.is_empty() {
            return Err(SnapshotError::EmptyTable { table: POLLUTERS });
        }
        if predictions.is_empty() {
            return Err(SnapshotError::EmptyTable { table: PREDICTIONS });
        }

        let predictions = scoring::normalize(&predictions, scoring)?;
        let sensors = dedup_sensors(sensors);

        Ok(Self {
            generation: Uuid::new_v4(),
            loaded_at: Utc::now(),
            sensors,
            polluters,
            predictions,
        })
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn sensors(&self) -> &[SensorRecord] {
        &self.sensors
    }

    pub fn polluters(&self) -> &[PolluterRecord] {
        &self.polluters
    }

    pub fn predictions(&self) -> &[ScoredPrediction] {
        &self.predictions
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            generation: self.generation,
            loaded_at: self.loaded_at,
            sensors: self.sensors.len(),
            polluters: self.polluters.len(),
            predictions: self.predictions.len(),
        }
    }
}

fn dedup_sensors(sensors: Vec<SensorRecord>) -> Vec<SensorRecord> {
    // ---
    let mut seen = HashSet::with_capacity(sensors.len());
    sensors
        .into_iter()
        .filter(|s| seen.insert(s.sensor_id.clone()))
        .collect()
}

/// Holder of the currently published generation.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// The published generation, if any has been loaded yet.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Atomically replace the published generation.
    ///
    /// Readers holding the previous `Arc` keep using it until they drop it.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        // ---
        let snapshot = Arc::new(snapshot);
        let previous = self.current.swap(Some(snapshot.clone()));

        info!(
            generation = %snapshot.generation,
            previous = ?previous.map(|p| p.generation),
            sensors = snapshot.sensors.len(),
            polluters = snapshot.polluters.len(),
            predictions = snapshot.predictions.len(),
            "published new data generation"
        );
        snapshot
    }
}
