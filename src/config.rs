//! Configuration management for the pipeline.
//!
//! Every tunable the pipeline depends on — target states, seasonal window
//! bounds, event thresholds, model parameters — is carried here as a named
//! value so components can be exercised with small synthetic inputs.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Seasonal aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Growing season month bounds, inclusive.
    pub growing_season_months: (u32, u32),

    /// Summer sub-window for heat stress, inclusive.
    pub summer_months: (u32, u32),

    /// Daily TMAX above this counts as a heat stress day (°C).
    pub heat_stress_threshold_c: f64,

    /// Daily precipitation below this extends a dry spell (mm).
    pub dry_spell_threshold_mm: f64,

    /// Daily precipitation above this counts as heavy rain (mm).
    pub heavy_rain_threshold_mm: f64,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            growing_season_months: constants::GROWING_SEASON_MONTHS,
            summer_months: constants::SUMMER_MONTHS,
            heat_stress_threshold_c: constants::HEAT_STRESS_THRESHOLD_C,
            dry_spell_threshold_mm: constants::DRY_SPELL_THRESHOLD_MM,
            heavy_rain_threshold_mm: constants::HEAVY_RAIN_THRESHOLD_MM,
        }
    }
}

impl SeasonConfig {
    /// True if the month falls inside the growing season window.
    pub fn in_growing_season(&self, month: u32) -> bool {
        month >= self.growing_season_months.0 && month <= self.growing_season_months.1
    }

    /// True if the month falls inside the summer heat window.
    pub fn in_summer(&self, month: u32) -> bool {
        month >= self.summer_months.0 && month <= self.summer_months.1
    }
}

/// Model fitting and evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Train on years <= cutoff, test on the years after it.
    pub train_cutoff_year: i32,

    /// Fall back to a random split when the temporal train set is smaller.
    pub min_temporal_train_rows: usize,

    /// Skip model fitting for a crop with fewer complete rows than this.
    pub min_model_rows: usize,

    /// Held-out fraction for the fallback random split.
    pub test_fraction: f64,

    /// Seed for bootstrap resampling and the fallback split.
    pub seed: u64,

    /// Number of trees in the regression forest.
    pub tree_count: usize,

    /// Maximum depth of each tree.
    pub max_depth: usize,

    /// Residuals beyond this multiple of their std are anomalies.
    pub anomaly_std_multiplier: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            train_cutoff_year: constants::DEFAULT_TRAIN_CUTOFF_YEAR,
            min_temporal_train_rows: constants::MIN_TEMPORAL_TRAIN_ROWS,
            min_model_rows: constants::MIN_MODEL_ROWS,
            test_fraction: constants::DEFAULT_TEST_FRACTION,
            seed: constants::DEFAULT_RANDOM_SEED,
            tree_count: constants::DEFAULT_TREE_COUNT,
            max_depth: constants::DEFAULT_MAX_TREE_DEPTH,
            anomaly_std_multiplier: constants::ANOMALY_STD_MULTIPLIER,
        }
    }
}

/// Global configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding `ghcnd-stations.txt` and `ghcn_by_year/`.
    pub data_dir: PathBuf,

    /// Directory where JSON artifacts are read from and written to.
    pub output_dir: PathBuf,

    /// States retained during station resolution.
    pub target_states: HashSet<String>,

    /// First and last observation years to ingest, inclusive.
    pub year_range: (i32, i32),

    /// Seasonal aggregation settings.
    pub season: SeasonConfig,

    /// Model fitting settings.
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Data"),
            output_dir: PathBuf::from("public/data"),
            target_states: constants::TARGET_STATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            year_range: (constants::DEFAULT_START_YEAR, constants::DEFAULT_END_YEAR),
            season: SeasonConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration rooted at the given data and output directories.
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Override the target state set.
    pub fn with_target_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Override the observation year range.
    pub fn with_year_range(mut self, start: i32, end: i32) -> Self {
        self.year_range = (start, end);
        self
    }

    /// Override the model seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.model.seed = seed;
        self
    }

    /// Path to the fixed-width station metadata file.
    pub fn stations_file(&self) -> PathBuf {
        self.data_dir.join(constants::STATIONS_FILENAME)
    }

    /// Path to the directory of yearly observation files.
    pub fn observations_dir(&self) -> PathBuf {
        self.data_dir.join(constants::OBSERVATIONS_DIR_NAME)
    }

    /// Path to a named artifact under the output directory.
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    /// Validate directory layout before a weather processing run.
    pub fn validate_weather_inputs(&self) -> crate::error::Result<()> {
        let stations = self.stations_file();
        if !stations.exists() {
            return Err(crate::error::AgriclimeError::StationFileNotFound { path: stations });
        }
        let obs_dir = self.observations_dir();
        if !obs_dir.is_dir() {
            return Err(crate::error::AgriclimeError::ObservationsDirNotFound { path: obs_dir });
        }
        Ok(())
    }
}

/// Check that a path looks like a directory we can write artifacts into,
/// creating it if necessary.
pub fn ensure_output_dir(path: &Path) -> crate::error::Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}
