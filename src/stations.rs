//! Station-to-region resolution.
//!
//! Loads GHCN fixed-width station metadata and builds an O(1) lookup from
//! station id to state abbreviation, filtered to US stations in the target
//! state set. Unparsable lines are skipped and counted, never fatal.

use crate::config::PipelineConfig;
use crate::error::{AgriclimeError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Fixed-width column layout of `ghcnd-stations.txt`.
///
/// ID [0,11), LAT [12,20), LON [21,30), ELEV [31,37), STATE [38,40),
/// NAME [41,71).
const ID_RANGE: std::ops::Range<usize> = 0..11;
const LAT_RANGE: std::ops::Range<usize> = 12..20;
const LON_RANGE: std::ops::Range<usize> = 21..30;
const STATE_RANGE: std::ops::Range<usize> = 38..40;
const NAME_RANGE: std::ops::Range<usize> = 41..71;

/// Metadata for one retained station.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub state: String,
    pub name: String,
}

/// Statistics from loading the station metadata file.
#[derive(Debug, Clone, Default)]
pub struct StationLoadStats {
    /// Lines read from the metadata file.
    pub lines_read: usize,

    /// Stations retained in the index.
    pub stations_loaded: usize,

    /// Lines that could not be parsed (skipped, non-fatal).
    pub lines_skipped: usize,

    /// US stations dropped because their state is outside the target set.
    pub outside_target: usize,
}

/// O(1) station id → state lookup for the target region set.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: HashMap<String, Station>,
}

impl StationIndex {
    /// Load the index from a fixed-width GHCN station metadata file.
    ///
    /// Only stations with the US id prefix and a state in the configured
    /// target set are retained. A line with an unparsable fixed-width field
    /// is skipped and counted in the returned stats.
    pub fn load(path: &Path, config: &PipelineConfig) -> Result<(Self, StationLoadStats)> {
        if !path.exists() {
            return Err(AgriclimeError::StationFileNotFound {
                path: path.to_path_buf(),
            });
        }

        info!("Loading station metadata from {}", path.display());
        let reader = BufReader::new(File::open(path)?);

        let mut index = StationIndex::default();
        let mut stats = StationLoadStats::default();

        for line in reader.lines() {
            let line = line?;
            stats.lines_read += 1;

            let Some(station_id) = field(&line, ID_RANGE) else {
                stats.lines_skipped += 1;
                continue;
            };

            if !station_id.starts_with(crate::constants::US_STATION_PREFIX) {
                continue;
            }

            let parsed = parse_us_line(&line, &station_id);
            let Some(station) = parsed else {
                stats.lines_skipped += 1;
                debug!("Skipping unparsable station line {}", stats.lines_read);
                continue;
            };

            if !config.target_states.contains(&station.state) {
                stats.outside_target += 1;
                continue;
            }

            index.stations.insert(station.id.clone(), station);
            stats.stations_loaded += 1;
        }

        if stats.lines_skipped > 0 {
            warn!(
                "Skipped {} unparsable station lines out of {}",
                stats.lines_skipped, stats.lines_read
            );
        }
        info!(
            "Loaded {} stations in {} target states",
            stats.stations_loaded,
            config.target_states.len()
        );

        Ok((index, stats))
    }

    /// State abbreviation for a station id, if the station is indexed.
    pub fn state_for(&self, station_id: &str) -> Option<&str> {
        self.stations.get(station_id).map(|s| s.state.as_str())
    }

    /// True if the station is in the index.
    pub fn contains(&self, station_id: &str) -> bool {
        self.stations.contains_key(station_id)
    }

    /// Number of indexed stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate over indexed stations.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }
}

/// Extract and trim one fixed-width field, `None` if the line is too short
/// or the range does not fall on a character boundary.
fn field(line: &str, range: std::ops::Range<usize>) -> Option<String> {
    line.get(range).map(|s| s.trim().to_string())
}

/// Parse the remaining fields of a US station line.
fn parse_us_line(line: &str, station_id: &str) -> Option<Station> {
    let latitude: f64 = field(line, LAT_RANGE)?.parse().ok()?;
    let longitude: f64 = field(line, LON_RANGE)?.parse().ok()?;
    let state = field(line, STATE_RANGE)?;
    if state.len() != 2 {
        return None;
    }
    let name = field(line, NAME_RANGE).unwrap_or_default();

    Some(Station {
        id: station_id.to_string(),
        latitude,
        longitude,
        state,
        name,
    })
}
