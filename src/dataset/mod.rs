//! Dataset providers.
//!
//! A [`DatasetProvider`] supplies the three source tables the service needs:
//! existing sensors, the polluter registry, and the prediction grid. Where
//! the bytes come from is the provider's business; callers only see typed
//! rows or a [`DatasetError`].
//!
//! - [`LocalProvider`] reads CSV files from a directory.
//! - [`RemoteProvider`] fetches the same tables from an object store over
//!   HTTP, walking back day by day to find the newest dated sensor export.
//! - [`FallbackProvider`] tries one provider per table and falls back to a
//!   second on failure.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::DatasetError;
use crate::models::{PolluterRecord, PredictionRecord, SensorRecord};

mod local;
mod remote;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

// ---

pub(crate) const SENSORS: &str = "sensor";
pub(crate) const POLLUTERS: &str = "polluter";
pub(crate) const PREDICTIONS: &str = "prediction";

/// Raw source tables for one data generation.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    // ---
    pub sensors: Vec<SensorRecord>,
    pub polluters: Vec<PolluterRecord>,
    pub predictions: Vec<PredictionRecord>,
}

/// Source of the raw tables.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &'static str;

    /// Existing sensor table, possibly with repeated `sensor_id`s.
    async fn sensors(&self) -> Result<Vec<SensorRecord>, DatasetError>;

    /// Polluter registry table.
    async fn polluters(&self) -> Result<Vec<PolluterRecord>, DatasetError>;

    /// Prediction grid table, not yet scored.
    async fn predictions(&self) -> Result<Vec<PredictionRecord>, DatasetError>;
}

/// Fetch all three tables from `provider`.
///
/// # Errors
/// Returns the first table failure; nothing partial is returned.
pub async fn load_dataset(provider: &dyn DatasetProvider) -> Result<Dataset, DatasetError> {
    // ---
    let sensors = provider.sensors().await?;
    let polluters = provider.polluters().await?;
    let predictions = provider.predictions().await?;

    info!(
        provider = provider.name(),
        sensors = sensors.len(),
        polluters = polluters.len(),
        predictions = predictions.len(),
        "dataset loaded"
    );

    Ok(Dataset {
        sensors,
        polluters,
        predictions,
    })
}

/// Per-table fallback between two providers.
pub struct FallbackProvider {
    primary: Box<dyn DatasetProvider>,
    secondary: Option<Box<dyn DatasetProvider>>,
}

impl FallbackProvider {
    // ---
    pub fn new(
        primary: Box<dyn DatasetProvider>,
        secondary: Option<Box<dyn DatasetProvider>>,
    ) -> Self {
        Self { primary, secondary }
    }
}

/// Try `$method` on the primary provider, then on the secondary if any.
macro_rules! with_fallback {
    ($self:ident, $method:ident, $table:expr) => {{
        match $self.primary.$method().await {
            Ok(rows) => Ok(rows),
            Err(e) => match &$self.secondary {
                Some(secondary) => {
                    warn!(
                        table = $table,
                        primary = $self.primary.name(),
                        secondary = secondary.name(),
                        "{}, falling back",
                        e
                    );
                    secondary.$method().await
                }
                None => Err(e),
            },
        }
    }};
}

#[async_trait]
impl DatasetProvider for FallbackProvider {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn sensors(&self) -> Result<Vec<SensorRecord>, DatasetError> {
        with_fallback!(self, sensors, SENSORS)
    }

    async fn polluters(&self) -> Result<Vec<PolluterRecord>, DatasetError> {
        with_fallback!(self, polluters, POLLUTERS)
    }

    async fn predictions(&self) -> Result<Vec<PredictionRecord>, DatasetError> {
        with_fallback!(self, predictions, PREDICTIONS)
    }
}

/// Decode a CSV table with a header row into typed records.
pub(crate) fn parse_table<T: DeserializeOwned>(
    table: &'static str,
    bytes: &[u8],
) -> Result<Vec<T>, DatasetError> {
    // ---
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| DatasetError::Parse { table, source })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Provider with fixed tables, or failing every call.
    struct FixedProvider {
        dataset: Option<Dataset>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedProvider {
        fn failing(calls: Arc<AtomicUsize>) -> Self {
            Self {
                dataset: None,
                calls,
            }
        }

        fn serving(dataset: Dataset, calls: Arc<AtomicUsize>) -> Self {
            Self {
                dataset: Some(dataset),
                calls,
            }
        }

        fn get<T: Clone>(
            &self,
            table: &'static str,
            pick: impl Fn(&Dataset) -> &Vec<T>,
        ) -> Result<Vec<T>, DatasetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.dataset {
                Some(d) => Ok(pick(d).clone()),
                None => Err(DatasetError::ReadFile {
                    table,
                    path: PathBuf::from("missing.csv"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
            }
        }
    }

    #[async_trait]
    impl DatasetProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn sensors(&self) -> Result<Vec<SensorRecord>, DatasetError> {
            self.get(SENSORS, |d| &d.sensors)
        }

        async fn polluters(&self) -> Result<Vec<PolluterRecord>, DatasetError> {
            self.get(POLLUTERS, |d| &d.polluters)
        }

        async fn predictions(&self) -> Result<Vec<PredictionRecord>, DatasetError> {
            self.get(PREDICTIONS, |d| &d.predictions)
        }
    }

    fn sample_dataset() -> Dataset {
        // ---
        Dataset {
            sensors: vec![SensorRecord {
                sensor_id: "1".to_string(),
                lat: 37.8,
                lon: -122.2,
                name: "Rooftop".to_string(),
            }],
            polluters: vec![],
            predictions: vec![PredictionRecord {
                lat: 37.8,
                lon: -122.3,
                raw_need_score: 2.0,
                loneliness_factor: 0.4,
            }],
        }
    }

    #[test]
    fn test_parse_table_ignores_extra_columns() {
        // ---
        let csv = "xy_,lat,lon,preds,lonely_factor\n\
                   A,37.5, -122.1 ,12.5,0.3\n\
                   B,37.6,-122.0,1.0,0.9\n";

        let rows: Vec<PredictionRecord> = parse_table(PREDICTIONS, csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lon, -122.1);
        assert_eq!(rows[0].raw_need_score, 12.5);
        assert_eq!(rows[1].loneliness_factor, 0.9);
    }

    #[test]
    fn test_parse_table_blank_emission_is_none() {
        // ---
        let csv = "Name,Street,City,Lat,Lon,PM\n\
                   Refinery,1 Main St,Richmond,37.9,-122.3,\n\
                   Plant,,Oakland,37.8,-122.2,4.5\n";

        let rows: Vec<PolluterRecord> = parse_table(POLLUTERS, csv.as_bytes()).unwrap();

        assert_eq!(rows[0].emission_metric, None);
        assert_eq!(rows[1].emission_metric, Some(4.5));
        assert_eq!(rows[1].street, "");
    }

    #[test]
    fn test_parse_table_reports_bad_rows() {
        // ---
        let csv = "lat,lon,preds,lonely_factor\nnorth,-122.0,1.0,0.1\n";

        let err = parse_table::<PredictionRecord>(PREDICTIONS, csv.as_bytes()).unwrap_err();

        assert!(matches!(err, DatasetError::Parse { table: "prediction", .. }));
    }

    #[tokio::test]
    async fn test_fallback_uses_secondary_when_primary_fails() {
        // ---
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let secondary_calls = Arc::new(AtomicUsize::new(0));
        let provider = FallbackProvider::new(
            Box::new(FixedProvider::failing(primary_calls.clone())),
            Some(Box::new(FixedProvider::serving(
                sample_dataset(),
                secondary_calls.clone(),
            ))),
        );

        let dataset = assert_ok!(load_dataset(&provider).await);

        assert_eq!(dataset.sensors.len(), 1);
        assert_eq!(dataset.predictions.len(), 1);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 3);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fallback_skips_secondary_when_primary_succeeds() {
        // ---
        let secondary_calls = Arc::new(AtomicUsize::new(0));
        let provider = FallbackProvider::new(
            Box::new(FixedProvider::serving(
                sample_dataset(),
                Arc::new(AtomicUsize::new(0)),
            )),
            Some(Box::new(FixedProvider::failing(secondary_calls.clone()))),
        );

        assert_ok!(load_dataset(&provider).await);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_without_secondary_propagates_error() {
        // ---
        let provider = FallbackProvider::new(
            Box::new(FixedProvider::failing(Arc::new(AtomicUsize::new(0)))),
            None,
        );

        let err = assert_err!(load_dataset(&provider).await);

        assert!(matches!(err, DatasetError::ReadFile { table: "sensor", .. }));
    }
}
