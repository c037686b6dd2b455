//! Growing-season aggregation.
//!
//! Reduces pivoted daily records into per-(state, year) seasonal weather
//! features and per-(state, month) climate normals.
//!
//! Station-count bias is avoided with a two-stage fold for precipitation,
//! heat stress, dry spells, and heavy rain: group by station, reduce to one
//! scalar per station, then average the scalars across stations. Stations
//! with no observation of the relevant element are excluded from that
//! feature's average, never counted as zero.

use crate::config::{PipelineConfig, SeasonConfig};
use crate::constants::{round1, state_fips};
use crate::models::{DailyRecord, MonthlyNormals, WeatherFeatures};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

/// Aggregate daily records into one feature record per (state, year).
///
/// The average temperature is the mean of all daily maxima and the mean of
/// all daily minima over the growing-season window, combined as
/// `(mean_max + mean_min) / 2` — not the mean of daily mean temperatures.
pub fn aggregate_features(
    records: &[DailyRecord],
    config: &PipelineConfig,
) -> Vec<WeatherFeatures> {
    let season = &config.season;

    let mut groups: BTreeMap<(String, i32), Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        if season.in_growing_season(record.month()) {
            groups
                .entry((record.state.clone(), record.year()))
                .or_default()
                .push(record);
        }
    }

    // Summer sub-window grouped separately: heat stress days are counted
    // over June-August only, while the feature is keyed by the same
    // (state, year).
    let mut summer_groups: BTreeMap<(String, i32), Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        if season.in_summer(record.month()) {
            summer_groups
                .entry((record.state.clone(), record.year()))
                .or_default()
                .push(record);
        }
    }

    let mut features = Vec::with_capacity(groups.len());
    for ((state, year), group) in &groups {
        let fips = state_fips(state).unwrap_or_default();
        let mut record = WeatherFeatures::new(state.clone(), fips, *year);

        apply_temperatures(&mut record, group);
        apply_precipitation(&mut record, group, season);
        if let Some(summer) = summer_groups.get(&(state.clone(), *year)) {
            record.heat_stress_days = heat_stress_days(summer, season);
        }

        features.push(record);
    }

    info!("Aggregated {} state-year feature records", features.len());
    features
}

/// Pooled growing-season temperature statistics.
fn apply_temperatures(record: &mut WeatherFeatures, group: &[&DailyRecord]) {
    let tmax: Vec<f64> = group.iter().filter_map(|r| r.max_temp_c).collect();
    let tmin: Vec<f64> = group.iter().filter_map(|r| r.min_temp_c).collect();

    if let (Some(mean_max), Some(mean_min)) = (mean(&tmax), mean(&tmin)) {
        record.growing_season_avg_temp = Some(round1((mean_max + mean_min) / 2.0));
        let max = tmax.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = tmin.iter().copied().fold(f64::INFINITY, f64::min);
        record.growing_season_max_temp = Some(round1(max));
        record.growing_season_min_temp = Some(round1(min));
    }
}

/// Two-stage precipitation features: per-station scalars averaged across
/// stations.
fn apply_precipitation(
    record: &mut WeatherFeatures,
    group: &[&DailyRecord],
    season: &SeasonConfig,
) {
    let by_station = group_by_station(group);

    let mut totals = Vec::new();
    let mut dry_spells = Vec::new();
    let mut heavy_days = Vec::new();

    for days in by_station.values() {
        let mut observed: Vec<(NaiveDate, f64)> = days
            .iter()
            .filter_map(|r| r.precip_mm.map(|p| (r.date, p)))
            .collect();
        if observed.is_empty() {
            continue;
        }
        observed.sort_by_key(|(date, _)| *date);

        totals.push(observed.iter().map(|(_, p)| p).sum::<f64>());
        dry_spells.push(longest_dry_spell(&observed, season.dry_spell_threshold_mm) as f64);
        heavy_days.push(
            observed
                .iter()
                .filter(|(_, p)| *p > season.heavy_rain_threshold_mm)
                .count() as f64,
        );
    }

    if let Some(mean_total) = mean(&totals) {
        record.growing_season_precip_mm = Some(round1(mean_total));
        record.growing_season_precip_std = Some(if totals.len() > 1 {
            round1(sample_std(&totals))
        } else {
            0.0
        });
        record.max_dry_spell_days = mean(&dry_spells).map(round1);
        record.heavy_rain_days = mean(&heavy_days).map(round1);
    }
}

/// Per-station heat stress day counts over the summer window, averaged
/// across stations with at least one summer TMAX observation.
fn heat_stress_days(summer: &[&DailyRecord], season: &SeasonConfig) -> Option<f64> {
    let by_station = group_by_station(summer);

    let counts: Vec<f64> = by_station
        .values()
        .filter_map(|days| {
            let observed: Vec<f64> = days.iter().filter_map(|r| r.max_temp_c).collect();
            if observed.is_empty() {
                return None;
            }
            Some(
                observed
                    .iter()
                    .filter(|t| **t > season.heat_stress_threshold_c)
                    .count() as f64,
            )
        })
        .collect();

    mean(&counts).map(round1)
}

/// Longest run of consecutive observed days with precipitation below the
/// threshold. A station with no qualifying day has spell length 0.
fn longest_dry_spell(observed: &[(NaiveDate, f64)], threshold_mm: f64) -> usize {
    let mut longest = 0usize;
    let mut current = 0usize;
    for (_, precip) in observed {
        if *precip < threshold_mm {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Monthly climate normals pooled per (state, month) over all records.
pub fn monthly_normals(
    records: &[DailyRecord],
) -> BTreeMap<String, BTreeMap<u32, MonthlyNormals>> {
    let mut groups: BTreeMap<(String, u32), Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.state.clone(), record.month()))
            .or_default()
            .push(record);
    }

    let mut normals: BTreeMap<String, BTreeMap<u32, MonthlyNormals>> = BTreeMap::new();
    for ((state, month), group) in groups {
        let tmax: Vec<f64> = group.iter().filter_map(|r| r.max_temp_c).collect();
        let tmin: Vec<f64> = group.iter().filter_map(|r| r.min_temp_c).collect();
        let precip: Vec<f64> = group.iter().filter_map(|r| r.precip_mm).collect();

        let avg_high = mean(&tmax);
        let avg_low = mean(&tmin);
        let entry = MonthlyNormals {
            avg_high: avg_high.map(round1),
            avg_low: avg_low.map(round1),
            // Scale mean daily precipitation to an approximate monthly total.
            avg_precip_mm: mean(&precip).map(|p| round1(p * 30.0)),
            avg_temp: match (avg_high, avg_low) {
                (Some(high), Some(low)) => Some(round1((high + low) / 2.0)),
                _ => None,
            },
        };

        normals.entry(state).or_default().insert(month, entry);
    }

    normals
}

fn group_by_station<'a>(
    group: &[&'a DailyRecord],
) -> BTreeMap<&'a str, Vec<&'a DailyRecord>> {
    let mut by_station: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for record in group {
        by_station
            .entry(record.station_id.as_str())
            .or_default()
            .push(record);
    }
    by_station
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n − 1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    debug_assert!(n > 1);
    let mu = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(
        station: &str,
        state: &str,
        ymd: (i32, u32, u32),
        precip: Option<f64>,
        tmax: Option<f64>,
        tmin: Option<f64>,
    ) -> DailyRecord {
        DailyRecord {
            station_id: station.to_string(),
            state: state.to_string(),
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            precip_mm: precip,
            max_temp_c: tmax,
            min_temp_c: tmin,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_avg_temp_is_mean_of_means() {
        // mean(TMAX) = 30, mean(TMIN) = 10 -> avg 20, not the mean of
        // daily midpoints.
        let records = vec![
            day("S1", "IA", (2020, 5, 1), None, Some(28.0), Some(12.0)),
            day("S1", "IA", (2020, 5, 2), None, Some(32.0), Some(8.0)),
        ];
        let features = aggregate_features(&records, &config());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].growing_season_avg_temp, Some(20.0));
        assert_eq!(features[0].growing_season_max_temp, Some(32.0));
        assert_eq!(features[0].growing_season_min_temp, Some(8.0));
    }

    #[test]
    fn test_window_excludes_other_months() {
        let records = vec![
            day("S1", "IA", (2020, 3, 31), None, Some(50.0), Some(40.0)),
            day("S1", "IA", (2020, 10, 1), None, Some(50.0), Some(40.0)),
            day("S1", "IA", (2020, 4, 1), None, Some(20.0), Some(10.0)),
            day("S1", "IA", (2020, 9, 30), None, Some(24.0), Some(14.0)),
        ];
        let features = aggregate_features(&records, &config());
        // Only April and September rows contribute: mean max 22, mean min 12.
        assert_eq!(features[0].growing_season_avg_temp, Some(17.0));
        assert_eq!(features[0].growing_season_max_temp, Some(24.0));
    }

    #[test]
    fn test_dry_spell_run_length() {
        let precip = [0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 5.0];
        let records: Vec<DailyRecord> = precip
            .iter()
            .enumerate()
            .map(|(i, p)| day("S1", "IA", (2020, 6, 1 + i as u32), Some(*p), None, None))
            .collect();
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].max_dry_spell_days, Some(3.0));
    }

    #[test]
    fn test_dry_spell_zero_qualifying_days() {
        let records = vec![
            day("S1", "IA", (2020, 6, 1), Some(5.0), None, None),
            day("S1", "IA", (2020, 6, 2), Some(6.0), None, None),
        ];
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].max_dry_spell_days, Some(0.0));
    }

    #[test]
    fn test_precipitation_two_stage_fold() {
        // Station totals 60 and 20 -> regional mean 40 regardless of how
        // many days each station reported.
        let records = vec![
            day("S1", "IA", (2020, 6, 1), Some(20.0), None, None),
            day("S1", "IA", (2020, 6, 2), Some(20.0), None, None),
            day("S1", "IA", (2020, 6, 3), Some(20.0), None, None),
            day("S2", "IA", (2020, 6, 1), Some(20.0), None, None),
        ];
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].growing_season_precip_mm, Some(40.0));
        // Sample std of [60, 20] = 28.28...
        assert_eq!(features[0].growing_season_precip_std, Some(28.3));
    }

    #[test]
    fn test_precip_std_zero_for_single_station() {
        let records = vec![day("S1", "IA", (2020, 6, 1), Some(20.0), None, None)];
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].growing_season_precip_std, Some(0.0));
    }

    #[test]
    fn test_heat_stress_summer_window_only() {
        let records = vec![
            // May is growing season but outside the summer window.
            day("S1", "IA", (2020, 5, 20), None, Some(38.0), None),
            day("S1", "IA", (2020, 7, 1), None, Some(36.0), None),
            day("S1", "IA", (2020, 7, 2), None, Some(35.0), None),
            day("S1", "IA", (2020, 7, 3), None, Some(34.0), None),
        ];
        let features = aggregate_features(&records, &config());
        // Only the 36.0 day exceeds 35°C within June-August.
        assert_eq!(features[0].heat_stress_days, Some(1.0));
    }

    #[test]
    fn test_station_without_element_excluded_from_average() {
        // S2 has no precip observations at all; the regional dry spell and
        // precip averages must come from S1 alone.
        let records = vec![
            day("S1", "IA", (2020, 6, 1), Some(0.0), Some(30.0), None),
            day("S1", "IA", (2020, 6, 2), Some(0.0), Some(30.0), None),
            day("S2", "IA", (2020, 6, 1), None, Some(30.0), None),
        ];
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].max_dry_spell_days, Some(2.0));
        assert_eq!(features[0].growing_season_precip_mm, Some(0.0));
    }

    #[test]
    fn test_missing_element_omitted_entirely() {
        let records = vec![day("S1", "IA", (2020, 6, 1), None, Some(30.0), Some(20.0))];
        let features = aggregate_features(&records, &config());
        assert_eq!(features[0].growing_season_precip_mm, None);
        assert_eq!(features[0].max_dry_spell_days, None);
        assert_eq!(features[0].heavy_rain_days, None);
        assert!(features[0].growing_season_avg_temp.is_some());
    }

    #[test]
    fn test_heavy_rain_days() {
        let records = vec![
            day("S1", "IA", (2020, 6, 1), Some(60.0), None, None),
            day("S1", "IA", (2020, 6, 2), Some(50.0), None, None),
            day("S1", "IA", (2020, 6, 3), Some(51.0), None, None),
        ];
        let features = aggregate_features(&records, &config());
        // Strictly greater than 50mm.
        assert_eq!(features[0].heavy_rain_days, Some(2.0));
    }

    #[test]
    fn test_monthly_normals_pooled() {
        let records = vec![
            day("S1", "IA", (2020, 1, 1), Some(2.0), Some(0.0), Some(-10.0)),
            day("S2", "IA", (2020, 1, 2), Some(4.0), Some(4.0), Some(-6.0)),
        ];
        let normals = monthly_normals(&records);
        let january = &normals["IA"][&1];
        assert_eq!(january.avg_high, Some(2.0));
        assert_eq!(january.avg_low, Some(-8.0));
        assert_eq!(january.avg_temp, Some(-3.0));
        assert_eq!(january.avg_precip_mm, Some(90.0));
    }

    #[test]
    fn test_states_grouped_separately() {
        let records = vec![
            day("S1", "IA", (2020, 6, 1), Some(10.0), None, None),
            day("S3", "IL", (2020, 6, 1), Some(30.0), None, None),
        ];
        let features = aggregate_features(&records, &config());
        assert_eq!(features.len(), 2);
        let iowa = features.iter().find(|f| f.state == "IA").unwrap();
        let illinois = features.iter().find(|f| f.state == "IL").unwrap();
        assert_eq!(iowa.growing_season_precip_mm, Some(10.0));
        assert_eq!(illinois.growing_season_precip_mm, Some(30.0));
        assert_eq!(iowa.state_fips, "19");
        assert_eq!(illinois.state_fips, "17");
    }
}
