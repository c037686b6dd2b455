//! Weather-adjusted anomaly detection.
//!
//! Flags prediction records whose residual deviates materially from the
//! fitted model: per crop, any |residual| strictly greater than the
//! configured multiple of the population standard deviation of that crop's
//! residuals. Anomalies from all crops are merged into one list ranked by
//! descending |residual|.

use crate::models::{AnomalyKind, PredictionRecord, WeatherAnomaly};
use std::collections::BTreeMap;
use tracing::info;

/// Flag anomalies in place and return the ranked cross-crop list.
///
/// Marks `is_anomaly` on each flagged [`PredictionRecord`]. The list may
/// legitimately be empty when residuals are small or uniform.
pub fn detect_anomalies(
    model_predictions: &mut BTreeMap<String, Vec<PredictionRecord>>,
    std_multiplier: f64,
) -> Vec<WeatherAnomaly> {
    let mut anomalies = Vec::new();

    for (crop, predictions) in model_predictions.iter_mut() {
        let residuals: Vec<f64> = predictions.iter().map(|p| p.residual).collect();
        let threshold = std_multiplier * population_std(&residuals);

        for prediction in predictions.iter_mut() {
            if prediction.residual.abs() > threshold {
                prediction.is_anomaly = true;
                anomalies.push(anomaly_for(crop, prediction));
            }
        }
    }

    anomalies.sort_by(|a, b| {
        b.residual
            .abs()
            .total_cmp(&a.residual.abs())
            .then_with(|| (&a.crop, &a.state, a.year).cmp(&(&b.crop, &b.state, b.year)))
    });

    info!("Flagged {} weather-adjusted anomalies", anomalies.len());
    anomalies
}

fn anomaly_for(crop: &str, prediction: &PredictionRecord) -> WeatherAnomaly {
    let kind = if prediction.residual > 0.0 {
        AnomalyKind::Overperformed
    } else {
        AnomalyKind::Underperformed
    };

    WeatherAnomaly {
        crop: crop.to_string(),
        state: prediction.state.clone(),
        year: prediction.year,
        actual: prediction.actual,
        predicted: prediction.predicted,
        residual: prediction.residual,
        kind,
        description: format!(
            "{} {} in {}: yielded {:.1} bu/acre vs {:.1} predicted ({:+.1} deviation)",
            prediction.state,
            crop,
            prediction.year,
            prediction.actual,
            prediction.predicted,
            prediction.residual
        ),
    }
}

/// Population standard deviation (n denominator) of the residuals.
fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(state: &str, year: i32, residual: f64) -> PredictionRecord {
        PredictionRecord {
            state: state.to_string(),
            year,
            actual: 150.0 + residual,
            predicted: 150.0,
            residual,
            is_anomaly: false,
        }
    }

    fn crop_map(residuals: &[f64]) -> BTreeMap<String, Vec<PredictionRecord>> {
        let predictions = residuals
            .iter()
            .enumerate()
            .map(|(i, &r)| prediction("IA", 2010 + i as i32, r))
            .collect();
        BTreeMap::from([("corn".to_string(), predictions)])
    }

    #[test]
    fn test_threshold_is_strict_inequality() {
        // Residuals [6, -6, 2, -2, 0]: population variance is exactly 16,
        // std 4, threshold 6. The two records at |residual| = 6 sit exactly
        // on the threshold and must not be flagged.
        let mut predictions = crop_map(&[6.0, -6.0, 2.0, -2.0, 0.0]);
        let anomalies = detect_anomalies(&mut predictions, 1.5);

        assert!(anomalies.is_empty());
        assert!(predictions["corn"].iter().all(|p| !p.is_anomaly));
    }

    #[test]
    fn test_flags_beyond_threshold() {
        // std ~= 4.03, threshold ~= 6.05; the 8s are out, the 1s are not.
        let mut predictions = crop_map(&[8.0, -8.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0]);
        let anomalies = detect_anomalies(&mut predictions, 1.5);

        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].residual.abs(), 8.0);
        assert_eq!(anomalies[0].kind, AnomalyKind::Overperformed);
        let under = anomalies.iter().find(|a| a.residual < 0.0).unwrap();
        assert_eq!(under.kind, AnomalyKind::Underperformed);

        let flagged: Vec<bool> = predictions["corn"].iter().map(|p| p.is_anomaly).collect();
        assert_eq!(
            flagged,
            vec![true, true, false, false, false, false, false, false]
        );
    }

    #[test]
    fn test_ranked_across_crops_by_magnitude() {
        let mut predictions = BTreeMap::from([
            (
                "corn".to_string(),
                vec![
                    prediction("IA", 2012, 10.0),
                    prediction("IL", 2013, 0.1),
                    prediction("NE", 2014, -0.1),
                    prediction("KS", 2015, 0.0),
                ],
            ),
            (
                "soybeans".to_string(),
                vec![
                    prediction("IA", 2012, -20.0),
                    prediction("IL", 2013, 0.2),
                    prediction("NE", 2014, -0.2),
                    prediction("KS", 2015, 0.0),
                ],
            ),
        ]);

        let anomalies = detect_anomalies(&mut predictions, 1.5);
        assert!(anomalies.len() >= 2);
        assert_eq!(anomalies[0].crop, "soybeans");
        assert_eq!(anomalies[0].residual, -20.0);
        assert_eq!(anomalies[1].crop, "corn");
        assert_eq!(anomalies[1].residual, 10.0);
        for pair in anomalies.windows(2) {
            assert!(pair[0].residual.abs() >= pair[1].residual.abs());
        }
    }

    #[test]
    fn test_uniform_residuals_produce_no_anomalies() {
        let mut predictions = crop_map(&[0.0, 0.0, 0.0]);
        let anomalies = detect_anomalies(&mut predictions, 1.5);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_description_content() {
        let mut predictions = crop_map(&[9.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, -8.0]);
        let anomalies = detect_anomalies(&mut predictions, 1.5);
        let top = &anomalies[0];
        assert!(top.description.contains("IA corn in 2010"));
        assert!(top.description.contains("+9.0 deviation"));
    }
}
