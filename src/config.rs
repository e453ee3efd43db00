//! Configuration loader for the `airgrid-siting` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Result};

use crate::{ScoringConfig, SpacingConfig};

/// Parse an optional environment variable into `$ty` with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional environment variable into `Option<$ty>`.
macro_rules! parse_env_opt {
    ($lookup:expr, $var_name:expr, $ty:ty) => {
        $lookup($var_name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Socket address the HTTP server binds to.
    pub listen_addr: SocketAddr,

    /// Directory holding the local CSV tables.
    pub data_dir: PathBuf,

    /// Object-store base URL used when a local table is missing.
    pub dataset_base_url: Option<String>,

    /// How many days back to search for a dated sensor export.
    pub sensor_lookback_days: u32,

    /// Seconds between dataset refreshes.
    pub refresh_interval_secs: u64,

    /// Need-score weight in the combined ranking score.
    pub loneliness_weight: f64,

    /// Starting minimum spacing between recommendations.
    pub min_spacing: f64,

    /// Smallest spacing the selector may relax to.
    pub spacing_floor: f64,

    /// Maximum number of spacing halvings per request.
    pub max_relaxations: u32,

    /// Floor applied to raw need scores before the log transform.
    pub need_score_floor: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        let scoring = ScoringConfig::default();
        let spacing = SpacingConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8083)),
            data_dir: PathBuf::from("."),
            dataset_base_url: None,
            sensor_lookback_days: 30,
            refresh_interval_secs: 24 * 60 * 60,
            loneliness_weight: scoring.loneliness_weight,
            min_spacing: spacing.min_spacing,
            spacing_floor: spacing.spacing_floor,
            max_relaxations: spacing.max_relaxations,
            need_score_floor: scoring.need_score_floor,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `LISTEN_ADDR` – bind address (default: `0.0.0.0:8083`)
/// - `DATA_DIR` – local table directory (default: `.`)
/// - `DATASET_BASE_URL` – object-store fallback (default: unset)
/// - `SENSOR_LOOKBACK_DAYS` – dated export search window (default: 30)
/// - `REFRESH_INTERVAL_SECS` – dataset refresh period (default: 86400)
/// - `LONELINESS_WEIGHT` – need-score weight in `[0, 1]` (default: 1.0)
/// - `MIN_SPACING` – starting spacing (default: 0.02)
/// - `SPACING_FLOOR` – smallest relaxed spacing (default: 1e-6)
/// - `MAX_RELAXATIONS` – spacing halvings cap (default: 32)
/// - `NEED_SCORE_FLOOR` – clip raw need scores up to this (default: unset,
///   non-positive rows are dropped)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_from(|name| env::var(name).ok())
}

/// Build a [`Config`] from an arbitrary variable lookup.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    // ---
    let defaults = Config::default();

    let cfg = Config {
        listen_addr: parse_env!(lookup, "LISTEN_ADDR", SocketAddr, defaults.listen_addr),
        data_dir: lookup("DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir),
        dataset_base_url: lookup("DATASET_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty()),
        sensor_lookback_days: parse_env!(
            lookup,
            "SENSOR_LOOKBACK_DAYS",
            u32,
            defaults.sensor_lookback_days
        ),
        refresh_interval_secs: parse_env!(
            lookup,
            "REFRESH_INTERVAL_SECS",
            u64,
            defaults.refresh_interval_secs
        ),
        loneliness_weight: parse_env!(
            lookup,
            "LONELINESS_WEIGHT",
            f64,
            defaults.loneliness_weight
        ),
        min_spacing: parse_env!(lookup, "MIN_SPACING", f64, defaults.min_spacing),
        spacing_floor: parse_env!(lookup, "SPACING_FLOOR", f64, defaults.spacing_floor),
        max_relaxations: parse_env!(lookup, "MAX_RELAXATIONS", u32, defaults.max_relaxations),
        need_score_floor: parse_env_opt!(lookup, "NEED_SCORE_FLOOR", f64),
    };

    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values the scoring and selection code cannot work with.
    pub fn validate(&self) -> Result<()> {
        // ---
        if !(0.0..=1.0).contains(&self.loneliness_weight) {
            bail!(
                "Invalid LONELINESS_WEIGHT: {} is outside [0, 1]",
                self.loneliness_weight
            );
        }
        if !(self.min_spacing.is_finite() && self.min_spacing > 0.0) {
            bail!("Invalid MIN_SPACING: {} must be positive", self.min_spacing);
        }
        if !(self.spacing_floor.is_finite() && self.spacing_floor > 0.0) {
            bail!(
                "Invalid SPACING_FLOOR: {} must be positive",
                self.spacing_floor
            );
        }
        if let Some(floor) = self.need_score_floor {
            if !(floor.is_finite() && floor > 0.0) {
                bail!("Invalid NEED_SCORE_FLOOR: {} must be positive", floor);
            }
        }
        if self.refresh_interval_secs == 0 {
            bail!("Invalid REFRESH_INTERVAL_SECS: must be at least 1");
        }
        Ok(())
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            loneliness_weight: self.loneliness_weight,
            need_score_floor: self.need_score_floor,
        }
    }

    pub fn spacing(&self) -> SpacingConfig {
        SpacingConfig {
            min_spacing: self.min_spacing,
            spacing_floor: self.spacing_floor,
            max_relaxations: self.max_relaxations,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  LISTEN_ADDR           : {}", self.listen_addr);
        tracing::info!("  DATA_DIR              : {}", self.data_dir.display());
        tracing::info!(
            "  DATASET_BASE_URL      : {}",
            self.dataset_base_url.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  SENSOR_LOOKBACK_DAYS  : {}", self.sensor_lookback_days);
        tracing::info!("  REFRESH_INTERVAL_SECS : {}", self.refresh_interval_secs);
        tracing::info!("  LONELINESS_WEIGHT     : {}", self.loneliness_weight);
        tracing::info!("  MIN_SPACING           : {}", self.min_spacing);
        tracing::info!("  SPACING_FLOOR         : {}", self.spacing_floor);
        tracing::info!("  MAX_RELAXATIONS       : {}", self.max_relaxations);
        tracing::info!("  NEED_SCORE_FLOOR      : {:?}", self.need_score_floor);
    }
}
