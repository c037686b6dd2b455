//! Daily observation ingestion.
//!
//! Streams yearly GHCN-Daily CSV files, keeps quality-passing rows for
//! indexed stations, and pivots element rows into one [`DailyRecord`] per
//! (station, date). Duplicate (station, date, element) entries are averaged
//! and values converted from tenths to mm / °C.

use crate::config::PipelineConfig;
use crate::constants::GHCN_VALUE_SCALE;
use crate::error::{AgriclimeError, Result};
use crate::models::{DailyRecord, Element};
use crate::stations::StationIndex;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Statistics from observation ingestion.
#[derive(Debug, Clone, Default)]
pub struct ObservationStats {
    /// Yearly files processed.
    pub files_processed: usize,

    /// Years in the configured range with no observation file.
    pub years_missing: usize,

    /// Raw CSV rows read.
    pub rows_read: usize,

    /// Rows kept after station, element, and quality filtering.
    pub rows_kept: usize,

    /// Rows dropped because a required field would not parse.
    pub rows_invalid: usize,

    /// Pivoted daily records produced.
    pub daily_records: usize,
}

/// Accumulates duplicate element readings for one (station, date).
#[derive(Debug, Default)]
struct PivotCell {
    state: String,
    sums: [f64; 3],
    counts: [u32; 3],
}

impl PivotCell {
    fn add(&mut self, element: Element, value: f64) {
        let slot = element_slot(element);
        self.sums[slot] += value;
        self.counts[slot] += 1;
    }

    fn mean(&self, element: Element) -> Option<f64> {
        let slot = element_slot(element);
        if self.counts[slot] == 0 {
            None
        } else {
            Some(self.sums[slot] / f64::from(self.counts[slot]) / GHCN_VALUE_SCALE)
        }
    }
}

fn element_slot(element: Element) -> usize {
    match element {
        Element::Precip => 0,
        Element::MaxTemp => 1,
        Element::MinTemp => 2,
    }
}

/// Load and pivot all daily observations in the configured year range.
///
/// Records are returned sorted by (station, date) so downstream pooled
/// aggregations see a stable order regardless of map iteration.
pub fn load_daily_records(
    config: &PipelineConfig,
    index: &StationIndex,
    show_progress: bool,
) -> Result<(Vec<DailyRecord>, ObservationStats)> {
    let obs_dir = config.observations_dir();
    if !obs_dir.is_dir() {
        return Err(AgriclimeError::ObservationsDirNotFound { path: obs_dir });
    }

    let files = discover_yearly_files(&obs_dir, config.year_range);
    let mut stats = ObservationStats::default();
    let (start, end) = config.year_range;
    stats.years_missing = (start..=end).count().saturating_sub(files.len());
    if stats.years_missing > 0 {
        warn!(
            "{} years in {}..={} have no observation file",
            stats.years_missing, start, end
        );
    }

    info!(
        "Processing {} observation files from {}",
        files.len(),
        obs_dir.display()
    );

    let progress = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut cells: HashMap<(String, NaiveDate), PivotCell> = HashMap::new();

    for (i, (year, path)) in files.iter().enumerate() {
        if let Some(pb) = &progress {
            pb.set_position(i as u64);
            pb.set_message(format!("{}.csv", year));
        }
        ingest_file(path, index, &mut cells, &mut stats)?;
        stats.files_processed += 1;
    }

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut records: Vec<DailyRecord> = cells
        .into_iter()
        .map(|((station_id, date), cell)| DailyRecord {
            station_id,
            state: cell.state.clone(),
            date,
            precip_mm: cell.mean(Element::Precip),
            max_temp_c: cell.mean(Element::MaxTemp),
            min_temp_c: cell.mean(Element::MinTemp),
        })
        .collect();
    records.sort_by(|a, b| (&a.station_id, a.date).cmp(&(&b.station_id, b.date)));

    stats.daily_records = records.len();
    info!(
        "Pivoted {} daily records from {} kept rows ({} read)",
        stats.daily_records, stats.rows_kept, stats.rows_read
    );

    Ok((records, stats))
}

/// Discover `<year>.csv` files inside the configured range, sorted by year.
fn discover_yearly_files(obs_dir: &Path, year_range: (i32, i32)) -> Vec<(i32, PathBuf)> {
    let mut files: Vec<(i32, PathBuf)> = WalkDir::new(obs_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                return None;
            }
            let year: i32 = path.file_stem()?.to_str()?.parse().ok()?;
            if year < year_range.0 || year > year_range.1 {
                debug!("Skipping {} - outside year range", path.display());
                return None;
            }
            Some((year, path.to_path_buf()))
        })
        .collect();
    files.sort_by_key(|(year, _)| *year);
    files
}

/// Stream one yearly file into the pivot accumulator.
///
/// GHCN daily CSV columns: STATION, DATE, ELEMENT, DATA_VALUE, M_FLAG,
/// Q_FLAG, S_FLAG, OBS_TIME (no header). A non-empty Q_FLAG marks a failed
/// quality check and the row is excluded.
fn ingest_file(
    path: &Path,
    index: &StationIndex,
    cells: &mut HashMap<(String, NaiveDate), PivotCell>,
    stats: &mut ObservationStats,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut file_rows = 0usize;
    let mut file_kept = 0usize;

    for record in reader.records() {
        let record = record?;
        file_rows += 1;

        let Some(station_id) = record.get(0) else {
            stats.rows_invalid += 1;
            continue;
        };
        let Some(state) = index.state_for(station_id) else {
            continue;
        };

        let Some(element) = record.get(2).and_then(Element::from_code) else {
            continue;
        };

        // An absent quality flag means the check passed.
        let quality_ok = record.get(5).is_none_or(|q| q.trim().is_empty());
        if !quality_ok {
            continue;
        }

        let date = record
            .get(1)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok());
        let value = record.get(3).and_then(|v| v.trim().parse::<f64>().ok());
        let (Some(date), Some(value)) = (date, value) else {
            stats.rows_invalid += 1;
            continue;
        };

        let state = state.to_string();
        cells
            .entry((station_id.to_string(), date))
            .or_insert_with(|| PivotCell {
                state,
                ..PivotCell::default()
            })
            .add(element, value);
        file_kept += 1;
    }

    stats.rows_read += file_rows;
    stats.rows_kept += file_kept;
    debug!(
        "{}: kept {} of {} rows",
        path.display(),
        file_kept,
        file_rows
    );

    Ok(())
}
