//! Weather-yield analysis stages.
//!
//! Joins yield rows with state-year weather features, then runs the
//! per-crop correlation, model-fitting, and anomaly stages. Each crop is
//! analyzed independently of the others.

pub mod anomaly;
pub mod correlation;
pub mod forest;
pub mod predictor;

use crate::config::PipelineConfig;
use crate::constants::SIGNIFICANCE_LEVEL;
use crate::models::{
    CorrelationResult, MergedRecord, ModelEvaluation, PredictionRecord, WeatherAnomaly,
    WeatherFeature, WeatherFeatures, YieldRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Everything the analysis stage produces, keyed for the JSON artifacts.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResults {
    /// crop → feature → correlation (None = undefined for that feature).
    pub correlations: BTreeMap<String, BTreeMap<String, Option<CorrelationResult>>>,

    /// crop → model evaluation; crops under the row guard are absent.
    pub feature_importance: BTreeMap<String, ModelEvaluation>,

    /// crop → in-sample prediction records.
    pub model_predictions: BTreeMap<String, Vec<PredictionRecord>>,

    /// Ranked cross-crop anomaly list.
    pub weather_anomalies: Vec<WeatherAnomaly>,

    /// Rows surviving the yield-weather join.
    pub merged_rows: usize,

    /// Crops skipped by the minimum-row guard.
    pub crops_skipped: Vec<String>,
}

/// Inner join of yield rows with weather features on (state, year).
///
/// Output cardinality equals the number of yield rows whose (state, year)
/// exists in the weather set; rows without a weather match are dropped.
pub fn join_yield_weather(
    yields: &[YieldRecord],
    weather: &[WeatherFeatures],
) -> Vec<MergedRecord> {
    let by_state_year: HashMap<(&str, i32), &WeatherFeatures> = weather
        .iter()
        .map(|w| ((w.state.as_str(), w.year), w))
        .collect();

    let merged: Vec<MergedRecord> = yields
        .iter()
        .filter_map(|y| {
            by_state_year
                .get(&(y.state.as_str(), y.year))
                .map(|&w| MergedRecord {
                    state: y.state.clone(),
                    crop: y.crop.clone(),
                    year: y.year,
                    avg_yield: y.avg_yield,
                    weather: w.clone(),
                })
        })
        .collect();

    info!(
        "Merged {} of {} yield rows with weather features",
        merged.len(),
        yields.len()
    );
    merged
}

/// Run correlation, model fitting, and anomaly detection for every crop
/// present in the merged data.
pub fn run_analysis(
    yields: &[YieldRecord],
    weather: &[WeatherFeatures],
    config: &PipelineConfig,
) -> AnalysisResults {
    let merged = join_yield_weather(yields, weather);
    let features = WeatherFeature::ALL;

    let crops: BTreeSet<&str> = merged.iter().map(|r| r.crop.as_str()).collect();

    let mut results = AnalysisResults {
        merged_rows: merged.len(),
        ..Default::default()
    };

    for crop in crops {
        let crop_records: Vec<MergedRecord> = merged
            .iter()
            .filter(|r| r.crop == crop)
            .cloned()
            .collect();

        results.correlations.insert(
            crop.to_string(),
            correlation::feature_correlations(&crop_records, &features, SIGNIFICANCE_LEVEL),
        );

        match predictor::fit_crop_model(crop, &crop_records, &features, &config.model) {
            Some(output) => {
                results
                    .feature_importance
                    .insert(crop.to_string(), output.evaluation);
                results
                    .model_predictions
                    .insert(crop.to_string(), output.predictions);
            }
            None => results.crops_skipped.push(crop.to_string()),
        }
    }

    results.weather_anomalies = anomaly::detect_anomalies(
        &mut results.model_predictions,
        config.model.anomaly_std_multiplier,
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_for(state: &str, year: i32) -> WeatherFeatures {
        let mut w = WeatherFeatures::new(state, "00", year);
        w.growing_season_avg_temp = Some(18.0 + (year % 5) as f64);
        w.growing_season_max_temp = Some(33.0 + (year % 3) as f64);
        w.growing_season_precip_mm = Some(480.0 + (year % 7) as f64 * 25.0);
        w.heat_stress_days = Some((year % 4) as f64);
        w.max_dry_spell_days = Some(5.0 + (year % 6) as f64);
        w.heavy_rain_days = Some((year % 2) as f64);
        w
    }

    fn yield_row(state: &str, crop: &str, year: i32) -> YieldRecord {
        YieldRecord {
            state: state.to_string(),
            crop: crop.to_string(),
            year,
            avg_yield: 140.0 + (year % 5) as f64 * 4.0,
        }
    }

    #[test]
    fn test_join_cardinality() {
        let yields = vec![
            yield_row("IA", "corn", 2020),
            yield_row("IA", "soybeans", 2020),
            yield_row("IA", "corn", 2021),
            yield_row("IL", "corn", 2020),
        ];
        let weather = vec![weather_for("IA", 2020), weather_for("IL", 2020)];

        let merged = join_yield_weather(&yields, &weather);

        // Three yield rows have a (state, year) weather match; the join
        // never exceeds the yield row count and fabricates nothing.
        assert_eq!(merged.len(), 3);
        assert!(merged.len() <= yields.len());
        assert!(merged.iter().all(|r| r.year == 2020));
    }

    #[test]
    fn test_join_empty_weather() {
        let yields = vec![yield_row("IA", "corn", 2020)];
        let merged = join_yield_weather(&yields, &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_insufficient_rows_skips_model_but_not_correlations() {
        // Two states with 8 matched years each for one crop: 16 merged
        // rows, under the 20-row model guard.
        let years = 2010..2018;
        let mut yields = Vec::new();
        let mut weather = Vec::new();
        for year in years {
            for state in ["IA", "IL"] {
                yields.push(yield_row(state, "corn", year));
                weather.push(weather_for(state, year));
            }
        }

        let results = run_analysis(&yields, &weather, &PipelineConfig::default());

        assert_eq!(results.merged_rows, 16);
        assert!(!results.feature_importance.contains_key("corn"));
        assert!(!results.model_predictions.contains_key("corn"));
        assert_eq!(results.crops_skipped, vec!["corn".to_string()]);
        // Correlations are still produced for the crop.
        assert!(results.correlations.contains_key("corn"));
        assert!(results.weather_anomalies.is_empty());
    }

    #[test]
    fn test_full_analysis_over_guard() {
        // Two states with 15 years each: 30 merged rows per crop.
        let mut yields = Vec::new();
        let mut weather = Vec::new();
        for year in 2010..2025 {
            for state in ["IA", "IL"] {
                yields.push(yield_row(state, "corn", year));
            }
            weather.push(weather_for("IA", year));
            weather.push(weather_for("IL", year));
        }

        let results = run_analysis(&yields, &weather, &PipelineConfig::default());

        let evaluation = &results.feature_importance["corn"];
        assert_eq!(evaluation.n_train + evaluation.n_test, 30);
        assert_eq!(results.model_predictions["corn"].len(), 30);
        let importance_sum: f64 = evaluation.importances.values().sum();
        assert!((importance_sum - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_crops_analyzed_independently() {
        let mut yields = Vec::new();
        let mut weather = Vec::new();
        for year in 2010..2025 {
            for state in ["IA", "IL"] {
                yields.push(yield_row(state, "corn", year));
            }
            // Soybeans only in one state: 15 rows, under the guard.
            yields.push(yield_row("IA", "soybeans", year));
            weather.push(weather_for("IA", year));
            weather.push(weather_for("IL", year));
        }

        let results = run_analysis(&yields, &weather, &PipelineConfig::default());

        assert!(results.feature_importance.contains_key("corn"));
        assert!(!results.feature_importance.contains_key("soybeans"));
        assert_eq!(results.crops_skipped, vec!["soybeans".to_string()]);
    }
}
