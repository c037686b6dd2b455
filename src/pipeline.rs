//! Pipeline orchestration.
//!
//! Two entry points mirror the two halves of the pipeline: the weather
//! stage reduces raw observations to feature artifacts, and the analysis
//! stage fuses them with yields into correlation, model, and anomaly
//! artifacts. Each stage validates its inputs up front, reports progress,
//! and prints a summary when it finishes.

use crate::analysis;
use crate::config::{ensure_output_dir, PipelineConfig};
use crate::constants;
use crate::error::Result;
use crate::observations;
use crate::output::{read_weather_features, ArtifactWriter};
use crate::seasonal;
use crate::stations::StationIndex;
use crate::yields;
use colored::*;
use std::time::Instant;
use tracing::info;

/// Statistics from a weather processing run.
#[derive(Debug, Clone, Default)]
pub struct WeatherStats {
    pub stations_loaded: usize,
    pub station_lines_skipped: usize,
    pub files_processed: usize,
    pub rows_kept: usize,
    pub daily_records: usize,
    pub feature_records: usize,
    pub processing_time_ms: u128,
}

/// Runs the observation → feature half of the pipeline.
#[derive(Debug)]
pub struct WeatherProcessor {
    config: PipelineConfig,
}

impl WeatherProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, show_progress: bool) -> Result<WeatherStats> {
        let start = Instant::now();
        println!("{}", "Processing weather observations".bright_green().bold());
        println!(
            "  {} {}",
            "Data:".bright_cyan(),
            self.config.data_dir.display()
        );
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            self.config.output_dir.display()
        );

        self.config.validate_weather_inputs()?;
        ensure_output_dir(&self.config.output_dir)?;

        let (index, station_stats) =
            StationIndex::load(&self.config.stations_file(), &self.config)?;
        println!(
            "  {} {} stations in {} target states",
            "Loaded".bright_green(),
            station_stats.stations_loaded.to_string().bright_white().bold(),
            self.config.target_states.len()
        );

        let (daily, obs_stats) =
            observations::load_daily_records(&self.config, &index, show_progress)?;

        let features = seasonal::aggregate_features(&daily, &self.config);
        let normals = seasonal::monthly_normals(&daily);

        let writer = ArtifactWriter::new(&self.config.output_dir);
        writer.write_weather_features(&features)?;
        writer.write_monthly_normals(&normals)?;
        writer.write_weather_by_state(&features)?;

        let stats = WeatherStats {
            stations_loaded: station_stats.stations_loaded,
            station_lines_skipped: station_stats.lines_skipped,
            files_processed: obs_stats.files_processed,
            rows_kept: obs_stats.rows_kept,
            daily_records: obs_stats.daily_records,
            feature_records: features.len(),
            processing_time_ms: start.elapsed().as_millis(),
        };

        println!("\n{}", "Weather Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            stats.processing_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Daily records:".bright_cyan(),
            stats.daily_records.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "State-year features:".bright_cyan(),
            stats.feature_records.to_string().bright_white().bold()
        );
        if stats.station_lines_skipped > 0 {
            println!(
                "  {} {}",
                "Station lines skipped:".bright_red(),
                stats.station_lines_skipped.to_string().bright_red()
            );
        }

        Ok(stats)
    }
}

/// Statistics from an analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStats {
    pub yield_rows: usize,
    pub weather_records: usize,
    pub merged_rows: usize,
    pub crops_modeled: usize,
    pub crops_skipped: usize,
    pub anomalies: usize,
    pub processing_time_ms: u128,
}

/// Runs the join → correlation → model → anomaly half of the pipeline.
#[derive(Debug)]
pub struct AnalysisRunner {
    config: PipelineConfig,
}

impl AnalysisRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<AnalysisStats> {
        let start = Instant::now();
        println!("{}", "Analyzing weather-yield relations".bright_green().bold());

        // Precondition: the weather stage must have produced its artifact.
        let features = read_weather_features(
            &self.config.artifact_path(constants::WEATHER_FEATURES_FILENAME),
        )?;

        let yield_rows = yields::load_yield_records(
            &self.config.artifact_path(constants::STATE_YIELDS_FILENAME),
        )?;

        let results = analysis::run_analysis(&yield_rows, &features, &self.config);

        ensure_output_dir(&self.config.output_dir)?;
        let writer = ArtifactWriter::new(&self.config.output_dir);
        writer.write_correlations(&results.correlations)?;
        writer.write_feature_importance(&results.feature_importance)?;
        writer.write_model_predictions(&results.model_predictions)?;
        writer.write_weather_anomalies(&results.weather_anomalies)?;

        for crop in &results.crops_skipped {
            info!("No model artifacts for {} (insufficient rows)", crop);
        }

        let stats = AnalysisStats {
            yield_rows: yield_rows.len(),
            weather_records: features.len(),
            merged_rows: results.merged_rows,
            crops_modeled: results.feature_importance.len(),
            crops_skipped: results.crops_skipped.len(),
            anomalies: results.weather_anomalies.len(),
            processing_time_ms: start.elapsed().as_millis(),
        };

        println!("\n{}", "Analysis Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            stats.processing_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Merged rows:".bright_cyan(),
            stats.merged_rows.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Crops modeled:".bright_cyan(),
            stats.crops_modeled.to_string().bright_white().bold()
        );
        if stats.crops_skipped > 0 {
            println!(
                "  {} {}",
                "Crops skipped:".bright_yellow(),
                stats.crops_skipped.to_string().bright_yellow()
            );
        }
        println!(
            "  {} {}",
            "Anomalies flagged:".bright_cyan(),
            stats.anomalies.to_string().bright_white()
        );

        Ok(stats)
    }
}
