//! Error types for the siting service.
//!
//! Each concern gets its own enum: request validation, dataset loading,
//! scoring, and snapshot building. [`ApiError`] is the single type route
//! handlers return; it decides the HTTP status and JSON body.

use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

// ---

/// Client-facing problems with `/update` query parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required parameter was absent or empty.
    #[error("missing {param}")]
    Missing { param: &'static str },

    /// A corner was not in `lat,lon` form.
    #[error("invalid {param}: expected \"lat,lon\", got {value:?}")]
    InvalidCorner { param: &'static str, value: String },

    /// The requested count was not an integer.
    #[error("invalid {param}: expected an integer, got {value:?}")]
    InvalidCount { param: &'static str, value: String },

    /// A toggle was something other than the two literal values.
    #[error("invalid {param}: expected one of {{\"true\",\"false\"}}, got {value:?}")]
    InvalidToggle { param: &'static str, value: String },
}

/// Failures while fetching or decoding a source table.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Reading a local table file failed.
    #[error("failed to read {table} table at {}", .path.display())]
    ReadFile {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A table did not decode as CSV with the expected columns.
    #[error("failed to parse {table} table")]
    Parse {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    /// Fetching a table over HTTP failed.
    #[error("failed to fetch {table} table from {url}")]
    Fetch {
        table: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The object store has no such table.
    #[error("{table} table not found at {url}")]
    MissingObject { table: &'static str, url: String },

    /// No dated export was found inside the lookback window.
    #[error("no {table} table found from {newest} back {days} days")]
    NotFound {
        table: &'static str,
        days: u32,
        newest: chrono::NaiveDate,
    },
}

/// Failures in the score normalizer.
#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    /// The blend weight was outside `[0, 1]`.
    #[error("loneliness weight {0} is outside [0, 1]")]
    InvalidWeight(f64),

    /// Every row was rejected, or there were none to begin with.
    #[error("no usable prediction rows ({rejected} of {total} rejected)")]
    NoUsableRows { total: usize, rejected: usize },
}

/// Failures while building a new data generation.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// A source table came back with no rows.
    #[error("{table} table is empty")]
    EmptyTable { table: &'static str },
}

/// Error returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The query string itself could not be decoded, e.g. a repeated key.
    #[error("invalid query: {0}")]
    MalformedQuery(String),

    /// No data generation has been published yet.
    #[error("dataset not loaded yet, try again later")]
    Unavailable,
}

impl ApiError {
    // ---
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // ---
        let status = self.status();
        tracing::warn!(%status, "request rejected: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
