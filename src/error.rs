//! Error handling for the agriclime pipeline.
//!
//! Provides error types with context for input discovery, parsing,
//! and artifact writing failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgriclimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Station metadata file not found: {path}")]
    StationFileNotFound { path: PathBuf },

    #[error("Observations directory not found: {path}")]
    ObservationsDirNotFound { path: PathBuf },

    #[error("Weather features not found at {path} - run the `process` command before `analyze`")]
    WeatherFeaturesNotFound { path: PathBuf },

    #[error("Yield table not found: {path}")]
    YieldTableNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AgriclimeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgriclimeError>;
