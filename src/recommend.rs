//! Request pipeline and result assembly.
//!
//! bbox filter -> spacing selector -> projection of whichever optional
//! tables the caller asked for.

use tracing::debug;

use crate::models::{RecommendationRequest, RecommendationResult};
use crate::selection::{filter_bbox, select_spaced, SpacingConfig};
use crate::snapshot::Snapshot;

// ---

/// Answer one recommendation request against a published snapshot.
pub fn recommend(
    snapshot: &Snapshot,
    request: &RecommendationRequest,
    spacing: &SpacingConfig,
) -> RecommendationResult {
    // ---
    let in_view = filter_bbox(snapshot.predictions(), &request.bbox);
    let selection = select_spaced(&in_view, request.desired_count, spacing);

    debug!(
        generation = %snapshot.generation(),
        in_view = in_view.len(),
        desired = request.desired_count,
        picked = selection.picks.len(),
        rounds = selection.rounds,
        "selection complete"
    );

    let recommendations = selection.locations().map(|l| (l.lat, l.lon)).collect();

    let existing = if request.include_existing {
        snapshot
            .sensors()
            .iter()
            .map(|s| (s.lat, s.lon, s.name.clone()))
            .collect()
    } else {
        Vec::new()
    };

    let polluters = if request.include_polluters {
        snapshot
            .polluters()
            .iter()
            .map(|p| {
                (
                    p.lat,
                    p.lon,
                    p.name.clone(),
                    p.street.clone(),
                    p.city.clone(),
                    p.emission_metric,
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    let heatmap = if request.include_heatmap {
        in_view
            .iter()
            .map(|r| (r.lat, r.lon, r.log_need_score))
            .collect()
    } else {
        Vec::new()
    };

    RecommendationResult {
        recommendations,
        existing,
        polluters,
        heatmap,
    }
}
