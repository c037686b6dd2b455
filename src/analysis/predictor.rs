//! Yield model fitting and evaluation.
//!
//! Fits one regression forest per crop on rows with complete feature
//! vectors, evaluates on a held-out window, and produces in-sample
//! predictions for the anomaly stage.
//!
//! The split is temporal by default (train on years up to the cutoff, test
//! on the years after it) and falls back to a seeded random 80/20 split
//! when the temporal test set is empty or the temporal train set is smaller
//! than the configured minimum.

use crate::analysis::forest::{RandomForestRegressor, Rng64};
use crate::config::ModelConfig;
use crate::constants::{round1, round3};
use crate::models::{MergedRecord, ModelEvaluation, PredictionRecord, WeatherFeature};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fitted model outputs for one crop.
#[derive(Debug, Clone)]
pub struct CropModelOutput {
    pub evaluation: ModelEvaluation,
    /// In-sample predictions over every complete row, train and test alike.
    /// The model has seen the training subset of these rows during fitting;
    /// residuals are indicative, not out-of-sample errors.
    pub predictions: Vec<PredictionRecord>,
}

/// How the train/test partition was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Train on years <= cutoff, test on later years.
    Temporal,
    /// Seeded random 80/20 shuffle, used when the temporal split is unusable.
    RandomFallback,
}

/// One modeling row: a complete feature vector with its target.
struct CompleteRow {
    state: String,
    year: i32,
    x: Vec<f64>,
    y: f64,
}

/// Fit and evaluate the model for one crop.
///
/// Returns `None` when fewer than `config.min_model_rows` complete rows
/// exist; the crop is then omitted from every model artifact.
pub fn fit_crop_model(
    crop: &str,
    records: &[MergedRecord],
    features: &[WeatherFeature],
    config: &ModelConfig,
) -> Option<CropModelOutput> {
    let rows = complete_rows(records, features);

    if rows.len() < config.min_model_rows {
        info!(
            "Skipping {} - not enough data ({} complete rows, need {})",
            crop,
            rows.len(),
            config.min_model_rows
        );
        return None;
    }

    let (train_idx, test_idx, strategy) = split_rows(&rows, config);
    debug!(
        "{}: {:?} split with {} train / {} test rows",
        crop,
        strategy,
        train_idx.len(),
        test_idx.len()
    );

    let x: Vec<Vec<f64>> = rows.iter().map(|row| row.x.clone()).collect();
    let y: Vec<f64> = rows.iter().map(|row| row.y).collect();

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();

    let forest = RandomForestRegressor::fit(&x_train, &y_train, features.len(), config);

    let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();
    let test_pred: Vec<f64> = test_idx.iter().map(|&i| forest.predict(&x[i])).collect();
    let r2 = r_squared(&y_test, &test_pred);
    let mae = mean_absolute_error(&y_test, &test_pred);

    let importances: BTreeMap<String, f64> = features
        .iter()
        .zip(forest.feature_importances())
        .map(|(feature, importance)| (feature.name().to_string(), round3(importance)))
        .collect();

    let evaluation = ModelEvaluation {
        importances,
        r2: round3(r2),
        mae: round1(mae),
        n_train: train_idx.len(),
        n_test: test_idx.len(),
    };

    // In-sample pass over the full row set; the anomaly stage fills in the
    // is_anomaly flags afterwards.
    let predictions = rows
        .iter()
        .map(|row| {
            let predicted = forest.predict(&row.x);
            PredictionRecord {
                state: row.state.clone(),
                year: row.year,
                actual: round1(row.y),
                predicted: round1(predicted),
                residual: round1(row.y - predicted),
                is_anomaly: false,
            }
        })
        .collect();

    Some(CropModelOutput {
        evaluation,
        predictions,
    })
}

/// Rows with every model feature present.
fn complete_rows(records: &[MergedRecord], features: &[WeatherFeature]) -> Vec<CompleteRow> {
    records
        .iter()
        .filter_map(|record| {
            let x: Option<Vec<f64>> = features
                .iter()
                .map(|feature| feature.value(&record.weather))
                .collect();
            x.map(|x| CompleteRow {
                state: record.state.clone(),
                year: record.year,
                x,
                y: record.avg_yield,
            })
        })
        .collect()
}

/// Decide the train/test partition.
///
/// Explicit decision procedure: the temporal split is used unless its test
/// set is empty or its train set has fewer than the configured minimum
/// rows, in which case a seeded random 80/20 shuffle applies.
fn split_rows(
    rows: &[CompleteRow],
    config: &ModelConfig,
) -> (Vec<usize>, Vec<usize>, SplitStrategy) {
    let train: Vec<usize> = (0..rows.len())
        .filter(|&i| rows[i].year <= config.train_cutoff_year)
        .collect();
    let test: Vec<usize> = (0..rows.len())
        .filter(|&i| rows[i].year > config.train_cutoff_year)
        .collect();

    if !test.is_empty() && train.len() >= config.min_temporal_train_rows {
        return (train, test, SplitStrategy::Temporal);
    }

    let mut indices: Vec<usize> = (0..rows.len()).collect();
    let mut rng = Rng64::new(config.seed);
    // Fisher-Yates shuffle.
    for i in (1..indices.len()).rev() {
        let j = rng.next_below(i + 1);
        indices.swap(i, j);
    }

    let n_test = ((rows.len() as f64) * config.test_fraction).ceil() as usize;
    let n_test = n_test.clamp(1, rows.len() - 1);
    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    (train, test, SplitStrategy::RandomFallback)
}

/// Coefficient of determination on the held-out rows.
fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}
