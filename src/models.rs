//! Table rows and request/response shapes for the siting service.

use serde::{Deserialize, Serialize};

// ---

/// A point in plain lat/lon coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    // ---
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    // ---
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Plane distance in coordinate units, `sqrt(dlat^2 + dlon^2)`.
    ///
    /// No geodesic correction is applied; a degree of longitude is treated
    /// the same as a degree of latitude.
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        // ---
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }
}

/// Raw prediction grid row as supplied by the dataset provider.
///
/// CSV columns are `lat,lon,preds,lonely_factor`; any extra columns are
/// ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRecord {
    // ---
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "preds")]
    pub raw_need_score: f64,
    #[serde(rename = "lonely_factor")]
    pub loneliness_factor: f64,
}

/// Prediction grid row with the derived ranking columns filled in.
///
/// Only [`crate::scoring::normalize`] builds these, so the derived fields
/// always reflect the min/max of the whole table they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPrediction {
    // ---
    pub lat: f64,
    pub lon: f64,
    pub raw_need_score: f64,
    pub loneliness_factor: f64,
    pub log_need_score: f64,
    pub need_score_normalized: f64,
    pub loneliness_normalized: f64,
    pub combined_score: f64,
}

impl ScoredPrediction {
    // ---
    pub fn location(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Existing sensor as listed in the daily sensor export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorRecord {
    // ---
    pub sensor_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "sensor_name")]
    pub name: String,
}

/// Registered emission source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolluterRecord {
    // ---
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Street", default)]
    pub street: String,
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    /// Reported particulate emissions; blank in the registry for some sites.
    #[serde(rename = "PM")]
    pub emission_metric: Option<f64>,
}

/// Visible map region, given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    // ---
    pub sw: LatLon,
    pub ne: LatLon,
}

impl BoundingBox {
    // ---
    pub fn new(sw: LatLon, ne: LatLon) -> Self {
        Self { sw, ne }
    }

    /// Strict containment on all four edges; points on the border are
    /// outside. An inverted or zero-area box contains nothing.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        // ---
        self.sw.lat < lat && lat < self.ne.lat && self.sw.lon < lon && lon < self.ne.lon
    }
}

/// Validated `/update` request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationRequest {
    // ---
    pub bbox: BoundingBox,
    pub desired_count: usize,
    pub include_existing: bool,
    pub include_polluters: bool,
    pub include_heatmap: bool,
}

/// Response body for `/update`.
///
/// Each entry serializes as a JSON array so the map front-end can consume
/// the rows positionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    // ---
    pub recommendations: Vec<(f64, f64)>,
    pub existing: Vec<(f64, f64, String)>,
    pub polluters: Vec<(f64, f64, String, String, String, Option<f64>)>,
    #[serde(rename = "heatmappy")]
    pub heatmap: Vec<(f64, f64, f64)>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0))
    }

    #[test]
    fn test_distance_is_plane_euclidean() {
        // ---
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(3.0, 4.0);

        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_bbox_is_strict_on_every_edge() {
        // ---
        let bbox = unit_box();

        assert!(bbox.contains(0.5, 0.5));

        // Edges are excluded
        assert!(!bbox.contains(0.0, 0.5));
        assert!(!bbox.contains(1.0, 0.5));
        assert!(!bbox.contains(0.5, 0.0));
        assert!(!bbox.contains(0.5, 1.0));
    }

    #[test]
    fn test_degenerate_and_inverted_boxes_contain_nothing() {
        // ---
        let point = BoundingBox::new(LatLon::new(10.0, 10.0), LatLon::new(10.0, 10.0));
        assert!(!point.contains(10.0, 10.0));

        let inverted = BoundingBox::new(LatLon::new(1.0, 1.0), LatLon::new(0.0, 0.0));
        assert!(!inverted.contains(0.5, 0.5));
    }

    #[test]
    fn test_result_serializes_positionally() {
        // ---
        let result = RecommendationResult {
            recommendations: vec![(1.0, 2.0)],
            existing: vec![(3.0, 4.0, "backyard".to_string())],
            polluters: vec![(
                5.0,
                6.0,
                "Refinery".to_string(),
                "1 Main St".to_string(),
                "Richmond".to_string(),
                None,
            )],
            heatmap: vec![(7.0, 8.0, 0.5)],
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["recommendations"], serde_json::json!([[1.0, 2.0]]));
        assert_eq!(json["existing"], serde_json::json!([[3.0, 4.0, "backyard"]]));
        assert_eq!(
            json["polluters"],
            serde_json::json!([[5.0, 6.0, "Refinery", "1 Main St", "Richmond", null]])
        );
        assert_eq!(json["heatmappy"], serde_json::json!([[7.0, 8.0, 0.5]]));
        assert!(json.get("heatmap").is_none());
    }
}
