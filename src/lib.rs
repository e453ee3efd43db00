//! Air-quality sensor siting service.
//!
//! Recommends where to place new sensors inside the map region a user is
//! looking at. Candidate grid points carry a predicted-need score; the
//! service ranks them and picks the best ones while keeping a minimum
//! spacing between picks so recommendations do not cluster.
//!
//! Module layout follows the Explicit Module Boundary Pattern (EMBP):
//! - `scoring` normalizes the raw prediction grid once per data generation
//! - `selection` filters to the visible bounding box and runs the spacing
//!   constrained greedy selector
//! - `recommend` assembles the response
//! - `snapshot` and `refresh` own the immutable, atomically swapped data
//!   generation
//! - `dataset` supplies raw tables from local disk or an object store
//! - `routes` is the HTTP gateway

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod recommend;
pub mod refresh;
pub mod routes;
pub mod scoring;
pub mod selection;
pub mod snapshot;

pub use config::Config;
pub use error::{ApiError, DatasetError, ScoringError, SnapshotError, ValidationError};
pub use scoring::ScoringConfig;
pub use selection::SpacingConfig;
pub use snapshot::{Snapshot, SnapshotStore};

// Re-exported so routes/*.rs and the binary only need to know about the
// crate root, not about where each type lives.
pub use models::{
    BoundingBox, LatLon, PolluterRecord, PredictionRecord, RecommendationRequest,
    RecommendationResult, ScoredPrediction, SensorRecord,
};
