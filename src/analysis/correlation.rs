//! Weather-yield correlation analysis.
//!
//! For each crop and each candidate weather feature independently, computes
//! the Pearson coefficient between feature and yield with a two-sided
//! p-value from Student's t with n−2 degrees of freedom. A feature with
//! fewer than two usable points or zero variance has no defined
//! correlation and is reported as `None` rather than raising.

use crate::constants::{round3, round4};
use crate::models::{
    CorrelationResult, Direction, MergedRecord, Strength, WeatherFeature,
};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use tracing::debug;

/// Correlate every candidate feature against yield for one crop's records.
///
/// Rows missing the feature under test are dropped for that feature only.
pub fn feature_correlations(
    records: &[MergedRecord],
    features: &[WeatherFeature],
    significance_level: f64,
) -> BTreeMap<String, Option<CorrelationResult>> {
    let mut results = BTreeMap::new();

    for feature in features {
        let pairs: Vec<(f64, f64)> = records
            .iter()
            .filter_map(|record| {
                feature
                    .value(&record.weather)
                    .map(|value| (value, record.avg_yield))
            })
            .collect();

        let outcome = correlate(&pairs, significance_level);
        if outcome.is_none() {
            debug!(
                "Correlation undefined for {} ({} usable points)",
                feature.name(),
                pairs.len()
            );
        }
        results.insert(feature.name().to_string(), outcome);
    }

    results
}

/// Pearson correlation with significance for one (feature, yield) column
/// pair. `None` when undefined (<2 points or zero variance).
pub fn correlate(pairs: &[(f64, f64)], significance_level: f64) -> Option<CorrelationResult> {
    if pairs.len() < 2 {
        return None;
    }

    let r = pearson(pairs)?;
    let p_value = p_value_for_r(r, pairs.len());

    Some(CorrelationResult {
        r: round3(r),
        p_value: round4(p_value),
        significant: p_value < significance_level,
        direction: if r > 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        },
        strength: Strength::from_r(r),
    })
}

/// Pearson coefficient; `None` when either column has zero variance.
fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len() as f64;
    let sum_x: f64 = pairs.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = pairs.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = pairs.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = pairs.iter().map(|(x, _)| x * x).sum();
    let sum_y2: f64 = pairs.iter().map(|(_, y)| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        None
    } else {
        // Floating-point noise can push |r| marginally past 1.
        Some((numerator / denominator).clamp(-1.0, 1.0))
    }
}

/// Two-sided p-value for a Pearson coefficient via Student's t.
///
/// t = r·sqrt(n−2) / sqrt(1−r²), n−2 degrees of freedom.
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let r_squared = r * r;
    if 1.0 - r_squared <= f64::EPSILON {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r_squared).sqrt();

    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}
