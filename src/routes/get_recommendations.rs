use std::num::IntErrorKind;
use std::sync::LazyLock;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;
use crate::error::{ApiError, ValidationError};
use crate::models::{BoundingBox, LatLon, RecommendationRequest, RecommendationResult};
use crate::recommend::recommend;

// ---

/// `lat,lon` with optional sign and fractional part on each number.
static CORNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?,-?[0-9]+(\.[0-9]+)?$").expect("corner pattern compiles")
});

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/update", get(handler))
}

async fn handler(
    query: Result<Query<UpdateQuery>, QueryRejection>,
    State((store, config)): State<AppState>,
) -> Result<Json<RecommendationResult>, ApiError> {
    // ---
    let Query(params) =
        query.map_err(|rejection| ApiError::MalformedQuery(rejection.body_text()))?;
    debug!("GET /update - {:?}", params);

    let request = params.validate()?;
    let snapshot = store.current().ok_or(ApiError::Unavailable)?;

    let result = recommend(&snapshot, &request, &config.spacing());
    info!(
        "GET /update - returning {} recommendations, {} existing, {} polluters, {} heatmap points",
        result.recommendations.len(),
        result.existing.len(),
        result.polluters.len(),
        result.heatmap.len()
    );
    Ok(Json(result))
}

/// Raw `/update` query parameters, validated by [`UpdateQuery::validate`].
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    sw: Option<String>,
    ne: Option<String>,
    q: Option<String>,
    toggle_existing: Option<String>,
    toggle_polluters: Option<String>,
    toggle_heatmap: Option<String>,
}

impl UpdateQuery {
    /// Check every parameter and build the request the core works with.
    pub fn validate(&self) -> Result<RecommendationRequest, ValidationError> {
        // ---
        let sw = parse_corner("sw", self.sw.as_deref())?;
        let ne = parse_corner("ne", self.ne.as_deref())?;

        Ok(RecommendationRequest {
            bbox: BoundingBox::new(sw, ne),
            desired_count: parse_count("q", self.q.as_deref())?,
            include_existing: parse_toggle("toggle_existing", self.toggle_existing.as_deref())?,
            include_polluters: parse_toggle("toggle_polluters", self.toggle_polluters.as_deref())?,
            include_heatmap: parse_toggle("toggle_heatmap", self.toggle_heatmap.as_deref())?,
        })
    }
}

fn parse_corner(param: &'static str, value: Option<&str>) -> Result<LatLon, ValidationError> {
    // ---
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Missing { param })?;
    let invalid = || ValidationError::InvalidCorner {
        param,
        value: value.to_string(),
    };

    if !CORNER.is_match(value) {
        return Err(invalid());
    }
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;

    Ok(LatLon::new(
        lat.parse().map_err(|_| invalid())?,
        lon.parse().map_err(|_| invalid())?,
    ))
}

/// Absent or empty means 0; negative counts are treated as 0. Counts too
/// large to represent saturate, since they ask for every candidate anyway.
fn parse_count(param: &'static str, value: Option<&str>) -> Result<usize, ValidationError> {
    // ---
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(0);
    };

    match value.parse::<i64>() {
        Ok(count) => Ok(usize::try_from(count.max(0)).unwrap_or(usize::MAX)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(usize::MAX),
            IntErrorKind::NegOverflow => Ok(0),
            _ => Err(ValidationError::InvalidCount {
                param,
                value: value.to_string(),
            }),
        },
    }
}

/// Exactly `"true"` or `"false"`; absent means `false`.
fn parse_toggle(param: &'static str, value: Option<&str>) -> Result<bool, ValidationError> {
    // ---
    match value {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ValidationError::InvalidToggle {
            param,
            value: other.to_string(),
        }),
    }
}
