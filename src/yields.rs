//! Yield table loading.
//!
//! Deserializes the upstream state-yields artifact — nested
//! `{state: {crops: {crop: [{year, avg_yield}]}}}` — into flat
//! [`YieldRecord`] rows for the join.

use crate::error::{AgriclimeError, Result};
use crate::models::YieldRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct StateEntry {
    #[serde(default)]
    crops: BTreeMap<String, Vec<CropYear>>,
}

#[derive(Debug, Deserialize)]
struct CropYear {
    year: i32,
    avg_yield: f64,
}

/// Load and flatten the nested state-yields artifact.
///
/// Rows are returned sorted by (state, crop, year) for stable downstream
/// iteration order.
pub fn load_yield_records(path: &Path) -> Result<Vec<YieldRecord>> {
    if !path.exists() {
        return Err(AgriclimeError::YieldTableNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = BufReader::new(File::open(path)?);
    let states: BTreeMap<String, StateEntry> = serde_json::from_reader(reader)?;

    let mut records = Vec::new();
    for (state, entry) in states {
        for (crop, years) in entry.crops {
            for year_data in years {
                records.push(YieldRecord {
                    state: state.clone(),
                    crop: crop.clone(),
                    year: year_data.year,
                    avg_yield: year_data.avg_yield,
                });
            }
        }
    }
    records.sort_by(|a, b| {
        (&a.state, &a.crop, a.year).cmp(&(&b.state, &b.crop, b.year))
    });

    info!("Loaded {} yield rows from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flattens_nested_shape() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "IA": {{
                    "name": "Iowa",
                    "crops": {{
                        "corn": [
                            {{"year": 2020, "avg_yield": 178.0, "unit": "BU / ACRE"}},
                            {{"year": 2021, "avg_yield": 204.0}}
                        ],
                        "soybeans": [{{"year": 2020, "avg_yield": 54.0}}]
                    }}
                }},
                "IL": {{"crops": {{"corn": [{{"year": 2020, "avg_yield": 192.0}}]}}}}
            }}"#
        )
        .unwrap();

        let records = load_yield_records(file.path()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].state, "IA");
        assert_eq!(records[0].crop, "corn");
        assert_eq!(records[0].year, 2020);
        assert_eq!(records[0].avg_yield, 178.0);
        assert_eq!(records[2].crop, "soybeans");
        assert_eq!(records[3].state, "IL");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load_yield_records(Path::new("/nonexistent/state_yields.json"));
        assert!(matches!(
            result,
            Err(AgriclimeError::YieldTableNotFound { .. })
        ));
    }
}
