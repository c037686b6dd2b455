//! Application constants for the agriclime pipeline.
//!
//! Default thresholds, window bounds, target-state mappings, and artifact
//! filenames used throughout the pipeline. Tunables are surfaced through
//! [`crate::config::PipelineConfig`]; this module holds their defaults.

// =============================================================================
// Target Regions
// =============================================================================

/// State abbreviations covered by the yield data. Stations outside this set
/// are dropped during metadata loading.
pub const TARGET_STATES: &[&str] = &[
    "AL", "AR", "CO", "DE", "IA", "IL", "IN", "KS", "KY", "LA", "MD", "MI", "MN", "MO", "MS",
    "NC", "ND", "NE", "NJ", "NY", "OH", "OK", "PA", "SC", "SD", "TN", "TX", "VA", "VT", "WI",
    "WV", "WY",
];

/// GHCN station ids for United States stations start with this prefix.
pub const US_STATION_PREFIX: &str = "US";

/// Map a state abbreviation to its two-digit FIPS code.
pub fn state_fips(abbr: &str) -> Option<&'static str> {
    let fips = match abbr {
        "AL" => "01",
        "AK" => "02",
        "AZ" => "04",
        "AR" => "05",
        "CA" => "06",
        "CO" => "08",
        "CT" => "09",
        "DE" => "10",
        "FL" => "12",
        "GA" => "13",
        "HI" => "15",
        "ID" => "16",
        "IL" => "17",
        "IN" => "18",
        "IA" => "19",
        "KS" => "20",
        "KY" => "21",
        "LA" => "22",
        "ME" => "23",
        "MD" => "24",
        "MA" => "25",
        "MI" => "26",
        "MN" => "27",
        "MS" => "28",
        "MO" => "29",
        "MT" => "30",
        "NE" => "31",
        "NV" => "32",
        "NH" => "33",
        "NJ" => "34",
        "NM" => "35",
        "NY" => "36",
        "NC" => "37",
        "ND" => "38",
        "OH" => "39",
        "OK" => "40",
        "OR" => "41",
        "PA" => "42",
        "RI" => "44",
        "SC" => "45",
        "SD" => "46",
        "TN" => "47",
        "TX" => "48",
        "UT" => "49",
        "VT" => "50",
        "VA" => "51",
        "WA" => "53",
        "WV" => "54",
        "WI" => "55",
        "WY" => "56",
        _ => return None,
    };
    Some(fips)
}

// =============================================================================
// Seasonal Windows and Thresholds
// =============================================================================

/// Growing season months, inclusive (April through September).
pub const GROWING_SEASON_MONTHS: (u32, u32) = (4, 9);

/// Summer sub-window for heat stress, inclusive (June through August).
pub const SUMMER_MONTHS: (u32, u32) = (6, 8);

/// Daily maximum temperature above which a day counts as heat stress (°C).
pub const HEAT_STRESS_THRESHOLD_C: f64 = 35.0;

/// Daily precipitation below which a day extends a dry spell (mm).
pub const DRY_SPELL_THRESHOLD_MM: f64 = 1.0;

/// Daily precipitation above which a day counts as heavy rain (mm).
pub const HEAVY_RAIN_THRESHOLD_MM: f64 = 50.0;

// =============================================================================
// Observation Files
// =============================================================================

/// First year of daily observations to ingest.
pub const DEFAULT_START_YEAR: i32 = 2010;

/// Last year of daily observations to ingest.
pub const DEFAULT_END_YEAR: i32 = 2024;

/// GHCN elements consumed by the pipeline.
pub const ELEMENT_PRECIP: &str = "PRCP";
pub const ELEMENT_MAX_TEMP: &str = "TMAX";
pub const ELEMENT_MIN_TEMP: &str = "TMIN";

/// GHCN stores values in tenths of a unit (mm, °C).
pub const GHCN_VALUE_SCALE: f64 = 10.0;

/// Station metadata filename within the data directory.
pub const STATIONS_FILENAME: &str = "ghcnd-stations.txt";

/// Directory of yearly observation files within the data directory.
pub const OBSERVATIONS_DIR_NAME: &str = "ghcn_by_year";

// =============================================================================
// Modeling Defaults
// =============================================================================

/// Final year of the temporal training window (test years follow it).
pub const DEFAULT_TRAIN_CUTOFF_YEAR: i32 = 2022;

/// Minimum temporal training rows before falling back to a random split.
pub const MIN_TEMPORAL_TRAIN_ROWS: usize = 10;

/// Minimum complete rows required to fit a model for a crop.
pub const MIN_MODEL_ROWS: usize = 20;

/// Held-out fraction for the fallback random split.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Seed for the fallback split and bootstrap resampling.
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Number of trees in the regression forest.
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Maximum depth of each regression tree.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 8;

/// Two-sided p-value below which a correlation is reported as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Residuals beyond this multiple of their standard deviation are anomalies.
pub const ANOMALY_STD_MULTIPLIER: f64 = 1.5;

// =============================================================================
// Output Artifacts
// =============================================================================

pub const WEATHER_FEATURES_FILENAME: &str = "weather_features.json";
pub const MONTHLY_NORMALS_FILENAME: &str = "monthly_normals.json";
pub const WEATHER_BY_STATE_FILENAME: &str = "weather_by_state.json";
pub const STATE_YIELDS_FILENAME: &str = "state_yields.json";
pub const CORRELATIONS_FILENAME: &str = "correlations.json";
pub const FEATURE_IMPORTANCE_FILENAME: &str = "feature_importance.json";
pub const MODEL_PREDICTIONS_FILENAME: &str = "model_predictions.json";
pub const WEATHER_ANOMALIES_FILENAME: &str = "weather_anomalies.json";

// =============================================================================
// Helper Functions
// =============================================================================

/// Round to one decimal place (display precision for weather metrics).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to three decimal places (correlation coefficients, importances).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to four decimal places (p-values).
pub fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}
