//! CSV tables from a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{parse_table, DatasetProvider, POLLUTERS, PREDICTIONS, SENSORS};
use crate::error::DatasetError;
use crate::models::{PolluterRecord, PredictionRecord, SensorRecord};

// ---

pub const SENSOR_FILE: &str = "sensors.csv";
pub const POLLUTER_FILE: &str = "polluters.csv";
pub const PREDICTION_FILE: &str = "preds_loneliness.csv";

/// Reads `sensors.csv`, `polluters.csv` and `preds_loneliness.csv` from a
/// directory.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    dir: PathBuf,
}

impl LocalProvider {
    // ---
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(&self, table: &'static str, file: &str) -> Result<Vec<u8>, DatasetError> {
        // ---
        let path = self.dir.join(file);
        debug!("Looking for {} file locally at {}", table, path.display());

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(source) => Err(DatasetError::ReadFile {
                table,
                path,
                source,
            }),
        }
    }
}

#[async_trait]
impl DatasetProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn sensors(&self) -> Result<Vec<SensorRecord>, DatasetError> {
        let bytes = self.read(SENSORS, SENSOR_FILE).await?;
        parse_table(SENSORS, &bytes)
    }

    async fn polluters(&self) -> Result<Vec<PolluterRecord>, DatasetError> {
        let bytes = self.read(POLLUTERS, POLLUTER_FILE).await?;
        parse_table(POLLUTERS, &bytes)
    }

    async fn predictions(&self) -> Result<Vec<PredictionRecord>, DatasetError> {
        let bytes = self.read(PREDICTIONS, PREDICTION_FILE).await?;
        parse_table(PREDICTIONS, &bytes)
    }
}
