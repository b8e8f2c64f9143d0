//! CSV ingest and cleaning.
//!
//! This module turns a viral-load export into clean `VlRecord`s that are safe
//! to filter and fit.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level cleaning** (drop rows missing a subject, time or value, and count them)
//! - **Deterministic behavior** (input order is preserved)
//! - **Separation of concerns**: no filtering or fitting logic here

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{info, warn};

use crate::domain::{ColumnPresence, DatasetStats, VlRecord};
use crate::error::AppError;

pub const COL_PERSON_ID: &str = "personid";
pub const COL_TIME_DAYS: &str = "timedays";
pub const COL_LOG10_VL: &str = "log10vl";
pub const COL_AGE_LO: &str = "agerng1";
pub const COL_AGE_HI: &str = "agerng2";
pub const COL_STUDY_ID: &str = "studyid";
pub const COL_SAMPLE_TYPE: &str = "sampletype";
pub const COL_INFECTION_ID: &str = "infectionid";
pub const COL_GE_SLOPE: &str = "geml_conversion_slope";
pub const COL_GE_INTERCEPT: &str = "geml_conversion_intercept";

/// A malformed CSV record that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: cleaned records + column presence + stats + row accounting.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<VlRecord>,
    pub columns: ColumnPresence,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Rows dropped because `PersonID`, `TimeDays` or `Log10VL` was missing.
    pub rows_dropped: usize,
}

impl Dataset {
    /// Build a dataset from records that are already clean.
    pub fn from_records(records: Vec<VlRecord>, columns: ColumnPresence) -> Result<Self, AppError> {
        let stats = compute_stats(&records)
            .ok_or_else(|| AppError::no_data("No valid rows in dataset."))?;
        let n = records.len();
        Ok(Self {
            records,
            columns,
            stats,
            row_errors: Vec::new(),
            rows_read: n,
            rows_used: n,
            rows_dropped: 0,
        })
    }
}

/// Load and clean a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let dataset = read_dataset(file)?;
    info!(
        "loaded '{}': read={} used={} dropped={} errors={}",
        path.display(),
        dataset.rows_read,
        dataset.rows_used,
        dataset.rows_dropped,
        dataset.row_errors.len()
    );
    Ok(dataset)
}

/// Clean records from any CSV reader.
pub fn read_dataset<R: Read>(input: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;
    let columns = column_presence(&header_map);

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Some(row) => records.push(row),
            None => rows_dropped += 1,
        }
    }

    if !row_errors.is_empty() {
        warn!("skipped {} malformed CSV record(s)", row_errors.len());
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::no_data(
            "No valid rows remain after dropping rows with missing PersonID, TimeDays or Log10VL.",
        ));
    }

    let stats = compute_stats(&records)
        .ok_or_else(|| AppError::no_data("No valid rows remain after cleaning."))?;

    Ok(Dataset {
        records,
        columns,
        stats,
        row_errors,
        rows_read,
        rows_used,
        rows_dropped,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for (key, label) in [
        (COL_PERSON_ID, "PersonID"),
        (COL_TIME_DAYS, "TimeDays"),
        (COL_LOG10_VL, "Log10VL"),
    ] {
        if !header_map.contains_key(key) {
            return Err(AppError::input(format!("Missing required column: `{label}`")));
        }
    }
    Ok(())
}

fn column_presence(header_map: &HashMap<String, usize>) -> ColumnPresence {
    let has = |name: &str| header_map.contains_key(name);
    ColumnPresence {
        age_range: has(COL_AGE_LO) && has(COL_AGE_HI),
        study_id: has(COL_STUDY_ID),
        sample_type: has(COL_SAMPLE_TYPE),
        infection_id: has(COL_INFECTION_ID),
        ge_conversion: has(COL_GE_SLOPE) && has(COL_GE_INTERCEPT),
    }
}

/// Parse one record; `None` means a required value is missing or non-numeric.
fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Option<VlRecord> {
    let person_id = get_optional(record, header_map, COL_PERSON_ID)?.to_string();
    let time_days = parse_opt_f64(get_optional(record, header_map, COL_TIME_DAYS))?;
    let log10_vl = parse_opt_f64(get_optional(record, header_map, COL_LOG10_VL))?;

    Some(VlRecord {
        person_id,
        time_days,
        log10_vl,
        age_lo: parse_opt_f64(get_optional(record, header_map, COL_AGE_LO)),
        age_hi: parse_opt_f64(get_optional(record, header_map, COL_AGE_HI)),
        study_id: get_optional(record, header_map, COL_STUDY_ID).map(str::to_string),
        sample_type: get_optional(record, header_map, COL_SAMPLE_TYPE).map(str::to_string),
        infection_id: get_optional(record, header_map, COL_INFECTION_ID).map(str::to_string),
        ge_slope: parse_opt_f64(get_optional(record, header_map, COL_GE_SLOPE)),
        ge_intercept: parse_opt_f64(get_optional(record, header_map, COL_GE_INTERCEPT)),
    })
}

/// Summary statistics over cleaned records; `None` when there are none.
pub fn compute_stats(records: &[VlRecord]) -> Option<DatasetStats> {
    if records.is_empty() {
        return None;
    }

    let mut time_min = f64::INFINITY;
    let mut time_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    let mut age_min: Option<f64> = None;
    let mut age_max: Option<f64> = None;

    let mut subjects = Distinct::default();
    let mut studies = Distinct::default();
    let mut sample_types = Distinct::default();

    for r in records {
        time_min = time_min.min(r.time_days);
        time_max = time_max.max(r.time_days);
        y_min = y_min.min(r.log10_vl);
        y_max = y_max.max(r.log10_vl);

        if let Some(lo) = r.age_lo {
            age_min = Some(age_min.map_or(lo, |m| m.min(lo)));
        }
        if let Some(hi) = r.age_hi {
            age_max = Some(age_max.map_or(hi, |m| m.max(hi)));
        }

        subjects.push(Some(&r.person_id));
        studies.push(r.study_id.as_ref());
        sample_types.push(r.sample_type.as_ref());
    }

    let age_bounds = match (age_min, age_max) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        _ => None,
    };

    Some(DatasetStats {
        n_records: records.len(),
        age_bounds,
        time_min,
        time_max,
        y_min,
        y_max,
        subjects: subjects.order,
        studies: studies.order,
        sample_types: sample_types.order,
    })
}

/// Distinct values in first-appearance order.
#[derive(Default)]
struct Distinct {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl Distinct {
    fn push(&mut self, value: Option<&String>) {
        if let Some(v) = value {
            if self.seen.insert(v.clone()) {
                self.order.push(v.clone());
            }
        }
    }
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_missing_marker(s))
}

/// Spellings of "missing" commonly found in exported data frames.
fn is_missing_marker(s: &str) -> bool {
    matches!(s, "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None")
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}PersonID,TimeDays,Log10VL,AgeRng1,AgeRng2,StudyID,SampleType,InfectionID\n\
P1,0,3.1,18,39,S1,Nasal,I1\n\
P1,2,5.4,18,39,S1,Nasal,I1\n\
P2,1,NA,40,64,S2,Saliva,\n\
P2,3,4.2,40,64,S2,Saliva,\n\
,4,4.0,40,64,S2,Saliva,\n\
P3,abc,2.0,65,90,S1,Nasal,I3\n";

    #[test]
    fn drops_rows_missing_required_values() {
        let ds = read_dataset(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.rows_read, 6);
        assert_eq!(ds.rows_used, 3);
        assert_eq!(ds.rows_dropped, 3);
        assert!(ds.row_errors.is_empty());

        assert_eq!(ds.records[0].person_id, "P1");
        assert_eq!(ds.records[2].person_id, "P2");
        assert_eq!(ds.records[2].infection_id, None);
    }

    #[test]
    fn header_bom_and_case_are_ignored() {
        let ds = read_dataset(SAMPLE.as_bytes()).unwrap();
        assert!(ds.columns.age_range);
        assert!(ds.columns.study_id);
        assert!(ds.columns.infection_id);
        assert!(!ds.columns.ge_conversion);
    }

    #[test]
    fn stats_cover_cleaned_rows() {
        let ds = read_dataset(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.stats.age_bounds, Some((18.0, 64.0)));
        assert_eq!(ds.stats.subjects, vec!["P1".to_string(), "P2".to_string()]);
        assert_eq!(ds.stats.studies, vec!["S1".to_string(), "S2".to_string()]);
        assert_eq!(ds.stats.time_min, 0.0);
        assert_eq!(ds.stats.time_max, 3.0);
    }

    #[test]
    fn stats_keep_first_appearance_order() {
        let records = vec![
            VlRecord::new("P2", 0.0, 1.0),
            VlRecord::new("P1", 0.0, 1.0),
            VlRecord::new("P2", 1.0, 1.0),
            VlRecord::new("P3", 0.0, 1.0),
            VlRecord::new("P1", 1.0, 1.0),
        ];
        let stats = compute_stats(&records).unwrap();
        assert_eq!(stats.subjects, vec!["P2", "P1", "P3"]);
        assert!(stats.studies.is_empty());
    }

    #[test]
    fn missing_required_column_is_an_input_error() {
        let err = read_dataset("PersonID,TimeDays\nP1,0\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(err.to_string().contains("Log10VL"));
    }

    #[test]
    fn no_usable_rows_is_a_no_data_error() {
        let err = read_dataset("PersonID,TimeDays,Log10VL\nP1,0,\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_DATA);
    }
}
