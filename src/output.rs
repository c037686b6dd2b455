//! JSON artifact reading and writing.
//!
//! Every pipeline output is a flat JSON file under the output directory,
//! consumed by the frontend or by the analysis stage of a later run. Field
//! names, rounding, and nesting are part of the frontend contract.

use crate::constants;
use crate::error::{AgriclimeError, Result};
use crate::models::{
    CorrelationResult, ModelEvaluation, MonthlyNormals, PredictionRecord, WeatherAnomaly,
    WeatherFeatures, YearFeatures,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes analysis artifacts into the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write_compact<T: Serialize>(&self, filename: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(writer, value)?;
        Ok(path)
    }

    /// Pretty output for the artifacts people read directly.
    fn write_pretty<T: Serialize>(&self, filename: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, value)?;
        Ok(path)
    }

    pub fn write_weather_features(&self, features: &[WeatherFeatures]) -> Result<()> {
        let path = self.write_compact(constants::WEATHER_FEATURES_FILENAME, &features)?;
        info!("{}: {} records", path.display(), features.len());
        Ok(())
    }

    pub fn write_monthly_normals(
        &self,
        normals: &BTreeMap<String, BTreeMap<u32, MonthlyNormals>>,
    ) -> Result<()> {
        let path = self.write_compact(constants::MONTHLY_NORMALS_FILENAME, normals)?;
        info!("{}: {} states", path.display(), normals.len());
        Ok(())
    }

    /// Nested per-state view for frontend lookups, with the state keys
    /// stripped from each year record.
    pub fn write_weather_by_state(&self, features: &[WeatherFeatures]) -> Result<()> {
        let mut by_state: BTreeMap<String, Vec<YearFeatures>> = BTreeMap::new();
        for record in features {
            by_state
                .entry(record.state.clone())
                .or_default()
                .push(record.year_view());
        }
        let path = self.write_compact(constants::WEATHER_BY_STATE_FILENAME, &by_state)?;
        info!("{}: {} states", path.display(), by_state.len());
        Ok(())
    }

    pub fn write_correlations(
        &self,
        correlations: &BTreeMap<String, BTreeMap<String, Option<CorrelationResult>>>,
    ) -> Result<()> {
        let path = self.write_pretty(constants::CORRELATIONS_FILENAME, correlations)?;
        info!("{}: {} crops", path.display(), correlations.len());
        Ok(())
    }

    pub fn write_feature_importance(
        &self,
        evaluations: &BTreeMap<String, ModelEvaluation>,
    ) -> Result<()> {
        let path = self.write_pretty(constants::FEATURE_IMPORTANCE_FILENAME, &evaluations)?;
        info!("{}: {} crops", path.display(), evaluations.len());
        Ok(())
    }

    pub fn write_model_predictions(
        &self,
        predictions: &BTreeMap<String, Vec<PredictionRecord>>,
    ) -> Result<()> {
        let path = self.write_compact(constants::MODEL_PREDICTIONS_FILENAME, &predictions)?;
        let total: usize = predictions.values().map(Vec::len).sum();
        info!("{}: {} predictions", path.display(), total);
        Ok(())
    }

    pub fn write_weather_anomalies(&self, anomalies: &[WeatherAnomaly]) -> Result<()> {
        let path = self.write_pretty(constants::WEATHER_ANOMALIES_FILENAME, &anomalies)?;
        info!("{}: {} anomalies", path.display(), anomalies.len());
        Ok(())
    }
}

/// Read the weather features artifact back for the analysis stage.
///
/// A missing file is the fatal precondition failure of the pipeline: the
/// analysis stage refuses to start rather than failing mid-computation.
pub fn read_weather_features(path: &Path) -> Result<Vec<WeatherFeatures>> {
    if !path.exists() {
        return Err(AgriclimeError::WeatherFeaturesNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    let features: Vec<WeatherFeatures> = serde_json::from_reader(reader)?;
    info!(
        "Loaded {} weather feature records from {}",
        features.len(),
        path.display()
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_features() -> Vec<WeatherFeatures> {
        let mut a = WeatherFeatures::new("IA", "19", 2020);
        a.growing_season_avg_temp = Some(21.5);
        a.growing_season_precip_mm = Some(512.3);
        let b = WeatherFeatures::new("IL", "17", 2020);
        vec![a, b]
    }

    #[test]
    fn test_weather_features_round_trip() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let features = sample_features();

        writer.write_weather_features(&features).unwrap();
        let loaded =
            read_weather_features(&dir.path().join(constants::WEATHER_FEATURES_FILENAME))
                .unwrap();

        assert_eq!(loaded, features);
    }

    #[test]
    fn test_missing_weather_features_is_precondition_failure() {
        let result = read_weather_features(Path::new("/nonexistent/weather_features.json"));
        assert!(matches!(
            result,
            Err(AgriclimeError::WeatherFeaturesNotFound { .. })
        ));
    }

    #[test]
    fn test_weather_by_state_strips_state_keys() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write_weather_by_state(&sample_features()).unwrap();

        let raw =
            std::fs::read_to_string(dir.path().join(constants::WEATHER_BY_STATE_FILENAME))
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let iowa = value["IA"].as_array().unwrap();
        assert_eq!(iowa.len(), 1);
        assert_eq!(iowa[0]["year"], 2020);
        assert!(iowa[0].get("state").is_none());
        assert!(iowa[0].get("state_fips").is_none());
        // Absent features are omitted, not null.
        assert!(iowa[0].get("heat_stress_days").is_none());
    }

    #[test]
    fn test_undefined_correlation_serialized_as_null() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let correlations = BTreeMap::from([(
            "corn".to_string(),
            BTreeMap::from([("heavy_rain_days".to_string(), None)]),
        )]);
        writer.write_correlations(&correlations).unwrap();

        let raw =
            std::fs::read_to_string(dir.path().join(constants::CORRELATIONS_FILENAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["corn"]["heavy_rain_days"].is_null());
    }
}
