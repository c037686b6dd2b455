//! Core data structures for the agriclime pipeline.
//!
//! Defines the observation, feature, yield, and analysis record types that
//! flow between pipeline stages. Missing measurements are carried as
//! `Option<f64>` end to end — a feature that could not be derived is absent,
//! never zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GHCN observation elements consumed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Precip,
    MaxTemp,
    MinTemp,
}

impl Element {
    /// Parse a GHCN element code, returning `None` for elements we ignore.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            crate::constants::ELEMENT_PRECIP => Some(Element::Precip),
            crate::constants::ELEMENT_MAX_TEMP => Some(Element::MaxTemp),
            crate::constants::ELEMENT_MIN_TEMP => Some(Element::MinTemp),
            _ => None,
        }
    }
}

/// One daily record per (station, date) with pivoted measurement columns.
///
/// Values are in real units (mm, °C) after conversion from GHCN tenths.
/// A `None` column means the station reported no usable value for that
/// element on that date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub station_id: String,
    pub state: String,
    pub date: NaiveDate,
    pub precip_mm: Option<f64>,
    pub max_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
}

impl DailyRecord {
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Growing-season weather features for one (state, year).
///
/// Derived fields are optional: a field is `None` (and omitted from JSON)
/// when its underlying element was entirely absent for that state-year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFeatures {
    pub state: String,
    pub state_fips: String,
    pub year: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_avg_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_max_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_min_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_precip_mm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_precip_std: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_stress_days: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dry_spell_days: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heavy_rain_days: Option<f64>,
}

impl WeatherFeatures {
    /// Empty feature record for a state-year.
    pub fn new(state: impl Into<String>, state_fips: impl Into<String>, year: i32) -> Self {
        Self {
            state: state.into(),
            state_fips: state_fips.into(),
            year,
            growing_season_avg_temp: None,
            growing_season_max_temp: None,
            growing_season_min_temp: None,
            growing_season_precip_mm: None,
            growing_season_precip_std: None,
            heat_stress_days: None,
            max_dry_spell_days: None,
            heavy_rain_days: None,
        }
    }

    /// Per-year view without the state keys, for the by-state lookup artifact.
    pub fn year_view(&self) -> YearFeatures {
        YearFeatures {
            year: self.year,
            growing_season_avg_temp: self.growing_season_avg_temp,
            growing_season_max_temp: self.growing_season_max_temp,
            growing_season_min_temp: self.growing_season_min_temp,
            growing_season_precip_mm: self.growing_season_precip_mm,
            growing_season_precip_std: self.growing_season_precip_std,
            heat_stress_days: self.heat_stress_days,
            max_dry_spell_days: self.max_dry_spell_days,
            heavy_rain_days: self.heavy_rain_days,
        }
    }
}

/// [`WeatherFeatures`] without the state/fips keys, nested under a state key
/// in `weather_by_state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearFeatures {
    pub year: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_avg_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_max_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_min_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_precip_mm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub growing_season_precip_std: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_stress_days: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dry_spell_days: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heavy_rain_days: Option<f64>,
}

/// Monthly climate normals for one (state, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNormals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_high: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_low: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_precip_mm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_temp: Option<f64>,
}

/// One crop-yield record per (state, crop, year), supplied upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRecord {
    pub state: String,
    pub crop: String,
    pub year: i32,
    pub avg_yield: f64,
}

/// Inner join of a yield record with its state-year weather features.
#[derive(Debug, Clone)]
pub struct MergedRecord {
    pub state: String,
    pub crop: String,
    pub year: i32,
    pub avg_yield: f64,
    pub weather: WeatherFeatures,
}

/// Weather features used as model inputs and correlation candidates.
///
/// Mirrors the feature column list the frontend charts are keyed on;
/// `growing_season_min_temp` and the precip std are derived outputs but
/// not model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherFeature {
    GrowingSeasonAvgTemp,
    GrowingSeasonMaxTemp,
    GrowingSeasonPrecipMm,
    HeatStressDays,
    MaxDrySpellDays,
    HeavyRainDays,
}

impl WeatherFeature {
    /// All model features, in stable column order.
    pub const ALL: [WeatherFeature; 6] = [
        WeatherFeature::GrowingSeasonAvgTemp,
        WeatherFeature::GrowingSeasonMaxTemp,
        WeatherFeature::GrowingSeasonPrecipMm,
        WeatherFeature::HeatStressDays,
        WeatherFeature::MaxDrySpellDays,
        WeatherFeature::HeavyRainDays,
    ];

    /// Serialized column name, matching the feature artifact field names.
    pub fn name(&self) -> &'static str {
        match self {
            WeatherFeature::GrowingSeasonAvgTemp => "growing_season_avg_temp",
            WeatherFeature::GrowingSeasonMaxTemp => "growing_season_max_temp",
            WeatherFeature::GrowingSeasonPrecipMm => "growing_season_precip_mm",
            WeatherFeature::HeatStressDays => "heat_stress_days",
            WeatherFeature::MaxDrySpellDays => "max_dry_spell_days",
            WeatherFeature::HeavyRainDays => "heavy_rain_days",
        }
    }

    /// Extract this feature's value from a feature record.
    pub fn value(&self, features: &WeatherFeatures) -> Option<f64> {
        match self {
            WeatherFeature::GrowingSeasonAvgTemp => features.growing_season_avg_temp,
            WeatherFeature::GrowingSeasonMaxTemp => features.growing_season_max_temp,
            WeatherFeature::GrowingSeasonPrecipMm => features.growing_season_precip_mm,
            WeatherFeature::HeatStressDays => features.heat_stress_days,
            WeatherFeature::MaxDrySpellDays => features.max_dry_spell_days,
            WeatherFeature::HeavyRainDays => features.heavy_rain_days,
        }
    }
}

/// Direction of a correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// Strength bucket for a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    /// Bucket boundaries are exact: |r| > 0.5 strong, |r| > 0.3 moderate.
    pub fn from_r(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude > 0.5 {
            Strength::Strong
        } else if magnitude > 0.3 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

/// Pearson association between one weather feature and yield, per crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub r: f64,
    pub p_value: f64,
    pub significant: bool,
    pub direction: Direction,
    pub strength: Strength,
}

/// Fitted-model prediction for one (state, year) of a crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub state: String,
    pub year: i32,
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
    pub is_anomaly: bool,
}

/// Model evaluation summary for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    /// Relative feature importances; non-negative, summing to 1.
    pub importances: BTreeMap<String, f64>,
    pub r2: f64,
    pub mae: f64,
    pub n_train: usize,
    pub n_test: usize,
}

/// Over/under-performance label for an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    Overperformed,
    Underperformed,
}

/// A state-year-crop record whose residual deviates materially from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAnomaly {
    pub crop: String,
    pub state: String,
    pub year: i32,
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub description: String,
}
