//! CSV tables from an HTTP object store.
//!
//! Layout under the base URL:
//! - `PurpleAirDaily/YYYYMMDD.csv` – daily sensor export
//! - `UtilFiles/polluters.csv` – polluter registry
//! - `UtilFiles/preds_loneliness.csv` – prediction grid
//!
//! The sensor export for today may not have been written yet, so lookup
//! starts at today and walks back one day at a time.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{parse_table, DatasetProvider, POLLUTERS, PREDICTIONS, SENSORS};
use crate::error::DatasetError;
use crate::models::{PolluterRecord, PredictionRecord, SensorRecord};

// ---

const SENSOR_PREFIX: &str = "PurpleAirDaily";
const POLLUTER_KEY: &str = "UtilFiles/polluters.csv";
const PREDICTION_KEY: &str = "UtilFiles/preds_loneliness.csv";

/// Fetches tables from an object store over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: Client,
    base_url: String,
    lookback_days: u32,
}

impl RemoteProvider {
    // ---
    pub fn new(base_url: impl Into<String>, lookback_days: u32) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lookback_days,
        }
    }

    /// Newest sensor export dated `newest` or up to `lookback_days` earlier.
    pub async fn sensors_as_of(
        &self,
        newest: NaiveDate,
    ) -> Result<Vec<SensorRecord>, DatasetError> {
        // ---
        for offset in 0..=self.lookback_days {
            let Some(date) = newest.checked_sub_days(Days::new(u64::from(offset))) else {
                break;
            };
            let key = format!("{}/{}.csv", SENSOR_PREFIX, date.format("%Y%m%d"));

            if let Some(bytes) = self.fetch(SENSORS, &key).await? {
                debug!("Using sensor export for {}", date);
                return parse_table(SENSORS, &bytes);
            }
        }

        Err(DatasetError::NotFound {
            table: SENSORS,
            days: self.lookback_days,
            newest,
        })
    }

    /// GET one object; `Ok(None)` when the store says it does not exist.
    ///
    /// Stores without list permission answer 403 for missing keys, so that
    /// is treated the same as 404.
    async fn fetch(
        &self,
        table: &'static str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, DatasetError> {
        // ---
        let url = format!("{}/{}", self.base_url, key);
        debug!("Looking for file {}", url);

        let fetch_err = |source: reqwest::Error| DatasetError::Fetch {
            table,
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(fetch_err)?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let bytes = response
            .error_for_status()
            .map_err(fetch_err)?
            .bytes()
            .await
            .map_err(fetch_err)?;

        Ok(Some(bytes.to_vec()))
    }

    async fn fetch_required(
        &self,
        table: &'static str,
        key: &str,
    ) -> Result<Vec<u8>, DatasetError> {
        // ---
        self.fetch(table, key)
            .await?
            .ok_or_else(|| DatasetError::MissingObject {
                table,
                url: format!("{}/{}", self.base_url, key),
            })
    }
}

#[async_trait]
impl DatasetProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn sensors(&self) -> Result<Vec<SensorRecord>, DatasetError> {
        self.sensors_as_of(Utc::now().date_naive()).await
    }

    async fn polluters(&self) -> Result<Vec<PolluterRecord>, DatasetError> {
        let bytes = self.fetch_required(POLLUTERS, POLLUTER_KEY).await?;
        parse_table(POLLUTERS, &bytes)
    }

    async fn predictions(&self) -> Result<Vec<PredictionRecord>, DatasetError> {
        let bytes = self.fetch_required(PREDICTIONS, PREDICTION_KEY).await?;
        parse_table(PREDICTIONS, &bytes)
    }
}
