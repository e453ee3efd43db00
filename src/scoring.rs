//! Score normalizer.
//!
//! Turns the raw prediction grid into comparable `[0, 1]` scores and a
//! single blended ranking score. Runs once per data generation over the
//! whole table; the result is never mutated afterwards.

use tracing::{debug, warn};

use crate::error::ScoringError;
use crate::models::{PredictionRecord, ScoredPrediction};

// ---

/// Knobs for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    // ---
    /// Weight `w` of the need score in
    /// `combined = w * need + (1 - w) * loneliness`.
    ///
    /// At the default of `1.0` the loneliness factor does not affect ranking.
    pub loneliness_weight: f64,

    /// Lower bound applied to raw need scores before any transform.
    ///
    /// When unset, rows with a non-positive raw need score are dropped
    /// instead, since their logarithm is undefined.
    pub need_score_floor: Option<f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            loneliness_weight: 1.0,
            need_score_floor: None,
        }
    }
}

/// Score every row of the prediction table.
///
/// Rows with a non-finite coordinate or loneliness factor are dropped, as
/// are rows whose raw need score is NaN, infinite, or (without a floor)
/// not strictly positive. Min/max for the rescaling come from the rows that
/// survive. A column whose values are all equal rescales to `0.0`.
///
/// Output keeps the input row order.
///
/// # Errors
/// [`ScoringError::InvalidWeight`] if the weight is outside `[0, 1]`,
/// [`ScoringError::NoUsableRows`] if nothing is left to score.
pub fn normalize(
    records: &[PredictionRecord],
    config: &ScoringConfig,
) -> Result<Vec<ScoredPrediction>, ScoringError> {
    // ---
    let weight = config.loneliness_weight;
    if !(0.0..=1.0).contains(&weight) {
        return Err(ScoringError::InvalidWeight(weight));
    }

    let usable: Vec<(&PredictionRecord, f64)> = records
        .iter()
        .filter_map(|r| usable_need_score(r, config.need_score_floor).map(|need| (r, need)))
        .collect();

    let rejected = records.len() - usable.len();
    if rejected > 0 {
        warn!(
            rejected,
            total = records.len(),
            "dropped prediction rows with unusable values"
        );
    }
    if usable.is_empty() {
        return Err(ScoringError::NoUsableRows {
            total: records.len(),
            rejected,
        });
    }

    let need_range = MinMax::over(usable.iter().map(|(_, need)| *need));
    let lonely_range = MinMax::over(usable.iter().map(|(r, _)| r.loneliness_factor));

    debug!(
        rows = usable.len(),
        need_min = need_range.min,
        need_max = need_range.max,
        lonely_min = lonely_range.min,
        lonely_max = lonely_range.max,
        "normalizing prediction grid"
    );

    let scored = usable
        .into_iter()
        .map(|(r, need)| {
            let need_score_normalized = need_range.rescale(need);
            let loneliness_normalized = lonely_range.rescale(r.loneliness_factor);

            ScoredPrediction {
                lat: r.lat,
                lon: r.lon,
                raw_need_score: need,
                loneliness_factor: r.loneliness_factor,
                log_need_score: need.ln(),
                need_score_normalized,
                loneliness_normalized,
                combined_score: weight * need_score_normalized
                    + (1.0 - weight) * loneliness_normalized,
            }
        })
        .collect();

    Ok(scored)
}

/// Raw need score to use for this row, or `None` to drop it.
fn usable_need_score(record: &PredictionRecord, floor: Option<f64>) -> Option<f64> {
    // ---
    if !(record.lat.is_finite() && record.lon.is_finite() && record.loneliness_factor.is_finite())
    {
        return None;
    }

    let raw = record.raw_need_score;
    if !raw.is_finite() {
        return None;
    }

    match floor {
        Some(floor) => Some(raw.max(floor)),
        None if raw > 0.0 => Some(raw),
        None => None,
    }
}

/// Observed range of one column.
#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    // ---
    fn over(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            MinMax {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| MinMax {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }

    /// Affine map of `[min, max]` onto `[0, 1]`; a flat column maps to 0.
    fn rescale(&self, value: f64) -> f64 {
        // ---
        let span = self.max - self.min;
        if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
