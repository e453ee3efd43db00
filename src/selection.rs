//! Bounding-box filtering and spacing-constrained top-K selection.
//!
//! Both steps work on request-local vectors of references into the shared
//! snapshot; nothing here writes back to it.

use tracing::{debug, warn};

use crate::models::{BoundingBox, LatLon, ScoredPrediction};

// ---

/// Parameters for [`select_spaced`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingConfig {
    // ---
    /// Minimum pairwise distance for the first round, in lat/lon units.
    pub min_spacing: f64,

    /// Relaxation stops once halving would take the spacing below this.
    pub spacing_floor: f64,

    /// Maximum number of times the spacing may be halved.
    pub max_relaxations: u32,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            min_spacing: 0.02,
            spacing_floor: 1e-6,
            max_relaxations: 32,
        }
    }
}

/// One accepted location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    // ---
    pub location: LatLon,

    /// Spacing in force in the round that accepted this pick, or `None`
    /// when there were few enough candidates to skip spacing altogether.
    pub min_spacing: Option<f64>,
}

/// Outcome of [`select_spaced`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    // ---
    /// Accepted locations in selection order.
    pub picks: Vec<Pick>,

    /// Number of scans over the candidate list; 0 when spacing was skipped.
    pub rounds: u32,
}

impl Selection {
    // ---
    pub fn locations(&self) -> impl Iterator<Item = LatLon> + '_ {
        self.picks.iter().map(|p| p.location)
    }
}

/// Rows strictly inside `bbox`, in table order.
pub fn filter_bbox<'a>(
    rows: &'a [ScoredPrediction],
    bbox: &BoundingBox,
) -> Vec<&'a ScoredPrediction> {
    // ---
    rows.iter().filter(|r| bbox.contains(r.lat, r.lon)).collect()
}

/// Stable sort by `combined_score`, highest first. Equal scores keep their
/// incoming order.
pub fn rank_by_score(candidates: &mut [&ScoredPrediction]) {
    // ---
    candidates.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
}

/// Pick up to `desired` of the best-scoring candidates that are at least
/// `min_spacing` apart.
///
/// When there are no more candidates than `desired`, all of them are
/// returned in score order and spacing is not enforced. Otherwise the
/// ranked list is scanned greedily; each time a scan finishes short of
/// `desired` the spacing is halved and the scan restarts from the top,
/// keeping everything already picked. Relaxation is bounded by
/// `max_relaxations` and `spacing_floor`, so fewer than `desired` picks can
/// come back when the candidates are too tightly packed.
pub fn select_spaced(
    candidates: &[&ScoredPrediction],
    desired: usize,
    config: &SpacingConfig,
) -> Selection {
    // ---
    if desired == 0 {
        return Selection::default();
    }

    let mut ranked = candidates.to_vec();
    rank_by_score(&mut ranked);

    if ranked.len() <= desired {
        debug!(
            candidates = ranked.len(),
            desired, "not enough candidates to enforce spacing, returning all"
        );
        return Selection {
            picks: ranked
                .iter()
                .map(|c| Pick {
                    location: c.location(),
                    min_spacing: None,
                })
                .collect(),
            rounds: 0,
        };
    }

    let mut taken = vec![false; ranked.len()];
    let mut picks: Vec<Pick> = Vec::with_capacity(desired);
    let mut spacing = config.min_spacing;
    let mut rounds = 0;

    loop {
        rounds += 1;

        for (idx, candidate) in ranked.iter().enumerate() {
            if picks.len() == desired {
                break;
            }
            if taken[idx] {
                continue;
            }

            let location = candidate.location();
            if picks
                .iter()
                .all(|p| p.location.distance_to(&location) >= spacing)
            {
                taken[idx] = true;
                picks.push(Pick {
                    location,
                    min_spacing: Some(spacing),
                });
            }
        }

        if picks.len() == desired {
            break;
        }

        let relaxed = spacing / 2.0;
        if rounds > config.max_relaxations || relaxed < config.spacing_floor {
            warn!(
                picked = picks.len(),
                desired,
                rounds,
                spacing,
                "spacing relaxation exhausted, returning partial selection"
            );
            break;
        }

        debug!(
            picked = picks.len(),
            from = spacing,
            to = relaxed,
            "ran out of candidates, decreasing spacing"
        );
        spacing = relaxed;
    }

    Selection { picks, rounds }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn scored(lat: f64, lon: f64, score: f64) -> ScoredPrediction {
        // ---
        ScoredPrediction {
            lat,
            lon,
            raw_need_score: 1.0,
            loneliness_factor: 0.0,
            log_need_score: 0.0,
            need_score_normalized: score,
            loneliness_normalized: 0.0,
            combined_score: score,
        }
    }

    fn locations(selection: &Selection) -> Vec<(f64, f64)> {
        selection.locations().map(|l| (l.lat, l.lon)).collect()
    }

    #[test]
    fn test_well_spaced_candidates_taken_in_score_order() {
        // ---
        let rows = vec![
            scored(0.0, 0.0, 0.9),
            scored(0.0, 0.5, 0.5),
            scored(0.0, 1.0, 0.1),
        ];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 2, &SpacingConfig::default());

        assert_eq!(locations(&selection), vec![(0.0, 0.0), (0.0, 0.5)]);
        assert_eq!(selection.rounds, 1);
    }

    #[test]
    fn test_close_pair_with_matching_demand_is_returned_whole() {
        // ---
        let rows = vec![scored(0.0, 0.0, 0.9), scored(0.0, 0.005, 0.8)];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 2, &SpacingConfig::default());

        assert_eq!(locations(&selection), vec![(0.0, 0.0), (0.0, 0.005)]);
    }

    #[test]
    fn test_spacing_rejects_close_candidate_in_first_round() {
        // ---
        let rows = vec![
            scored(0.0, 0.0, 0.9),
            scored(0.0, 0.005, 0.8),
            scored(5.0, 5.0, 0.1),
        ];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 2, &SpacingConfig::default());

        assert_eq!(locations(&selection), vec![(0.0, 0.0), (5.0, 5.0)]);
        assert_eq!(selection.rounds, 1);
    }

    #[test]
    fn test_relaxation_halves_spacing_per_round() {
        // ---
        // Scenario: (0,0) 0.9 and (0,0.005) 0.8, with a third candidate that
        // is never eligible so that spacing is enforced
        let rows = vec![
            scored(0.0, 0.0, 0.9),
            scored(0.0, 0.005, 0.8),
            scored(0.0, 0.001, 0.1),
        ];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 2, &SpacingConfig::default());

        // 0.02 rejects, 0.01 rejects, 0.005 accepts
        assert_eq!(locations(&selection), vec![(0.0, 0.0), (0.0, 0.005)]);
        assert_eq!(selection.rounds, 3);
        assert_eq!(selection.picks[0].min_spacing, Some(0.02));
        assert_eq!(selection.picks[1].min_spacing, Some(0.005));
    }

    #[test]
    fn test_few_candidates_skip_spacing() {
        // ---
        let rows = vec![
            scored(0.0, 0.0, 0.2),
            scored(0.0, 0.001, 0.9),
            scored(0.0, 0.002, 0.5),
            scored(0.0, 0.003, 0.7),
            scored(0.0, 0.004, 0.1),
        ];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 10, &SpacingConfig::default());

        assert_eq!(
            locations(&selection),
            vec![
                (0.0, 0.001),
                (0.0, 0.003),
                (0.0, 0.002),
                (0.0, 0.0),
                (0.0, 0.004)
            ]
        );
        assert!(selection.picks.iter().all(|p| p.min_spacing.is_none()));
    }

    #[test]
    fn test_zero_desired_returns_nothing() {
        // ---
        let rows = vec![scored(0.0, 0.0, 1.0)];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 0, &SpacingConfig::default());

        assert!(selection.picks.is_empty());
    }

    #[test]
    fn test_ties_keep_table_order() {
        // ---
        let rows = vec![
            scored(1.0, 0.0, 0.5),
            scored(2.0, 0.0, 0.5),
            scored(3.0, 0.0, 0.5),
            scored(4.0, 0.0, 0.9),
        ];
        let candidates: Vec<_> = rows.iter().collect();

        let selection = select_spaced(&candidates, 3, &SpacingConfig::default());

        assert_eq!(
            locations(&selection),
            vec![(4.0, 0.0), (1.0, 0.0), (2.0, 0.0)]
        );
    }

    #[test]
    fn test_duplicate_points_terminate_with_partial_result() {
        // ---
        let rows = vec![
            scored(0.0, 0.0, 0.9),
            scored(0.0, 0.0, 0.8),
            scored(0.0, 0.0, 0.7),
        ];
        let candidates: Vec<_> = rows.iter().collect();
        let config = SpacingConfig {
            min_spacing: 0.02,
            spacing_floor: 1e-6,
            max_relaxations: 100,
        };

        let selection = select_spaced(&candidates, 2, &config);

        assert_eq!(locations(&selection), vec![(0.0, 0.0)]);
        // Halving 0.02 stays >= 1e-6 for 14 steps, so 15 scans in total
        assert_eq!(selection.rounds, 15);
    }

    #[test]
    fn test_max_relaxations_bounds_rounds() {
        // ---
        let rows = vec![
            scored(0.0, 0.0, 0.9),
            scored(0.0, 0.0, 0.8),
            scored(0.0, 0.0, 0.7),
        ];
        let candidates: Vec<_> = rows.iter().collect();
        let config = SpacingConfig {
            min_spacing: 0.02,
            spacing_floor: 1e-12,
            max_relaxations: 3,
        };

        let selection = select_spaced(&candidates, 2, &config);

        assert_eq!(selection.picks.len(), 1);
        assert_eq!(selection.rounds, 4);
    }

    #[test]
    fn test_filter_bbox_keeps_strict_interior_in_table_order() {
        // ---
        let rows = vec![
            scored(0.5, 0.5, 0.1),
            scored(0.0, 0.5, 0.9),
            scored(2.0, 2.0, 0.9),
            scored(0.25, 0.75, 0.3),
        ];
        let bbox = BoundingBox::new(LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0));

        let inside = filter_bbox(&rows, &bbox);

        let coords: Vec<_> = inside.iter().map(|r| (r.lat, r.lon)).collect();
        assert_eq!(coords, vec![(0.5, 0.5), (0.25, 0.75)]);
    }

    #[test]
    fn test_filter_bbox_degenerate_box_is_empty() {
        // ---
        let rows = vec![scored(10.0, 10.0, 0.5), scored(10.0, 10.000001, 0.5)];
        let bbox = BoundingBox::new(LatLon::new(10.0, 10.0), LatLon::new(10.0, 10.0));

        assert!(filter_bbox(&rows, &bbox).is_empty());
    }
}
