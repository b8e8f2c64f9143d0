//! Row filters: age window, study and sample type.
//!
//! An age group `[AgeRng1, AgeRng2]` is kept when it intersects the selected
//! window. Study and sample type filters are set memberships. A row with a
//! missing value never passes an active filter.

use std::collections::BTreeSet;

use crate::domain::{ColumnPresence, DatasetStats, FilterSelection, VlRecord};
use crate::error::AppError;
use crate::io::ingest::Dataset;

/// A resolved filter. `None` disables the corresponding check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub age_range: Option<(f64, f64)>,
    pub studies: Option<BTreeSet<String>>,
    pub sample_types: Option<BTreeSet<String>>,
}

impl FilterSpec {
    /// Resolve a user selection against a dataset.
    ///
    /// - the age window defaults to the dataset's age bounds and is clamped to them
    /// - empty study / sample type selections default to every observed value
    /// - filters on absent columns are disabled
    pub fn from_selection(
        selection: &FilterSelection,
        columns: &ColumnPresence,
        stats: &DatasetStats,
    ) -> Result<Self, AppError> {
        let age_range = if columns.age_range {
            resolve_age_window(selection, stats.age_bounds)?
        } else {
            None
        };

        let studies = if columns.study_id {
            Some(resolve_options("study", &selection.studies, &stats.studies)?)
        } else {
            None
        };

        let sample_types = if columns.sample_type {
            Some(resolve_options("sample type", &selection.sample_types, &stats.sample_types)?)
        } else {
            None
        };

        Ok(Self {
            age_range,
            studies,
            sample_types,
        })
    }

    pub fn matches(&self, record: &VlRecord) -> bool {
        if let Some((lo, hi)) = self.age_range {
            let intersects = match (record.age_lo, record.age_hi) {
                (Some(age_lo), Some(age_hi)) => age_hi >= lo && age_lo <= hi,
                _ => false,
            };
            if !intersects {
                return false;
            }
        }
        contains(self.studies.as_ref(), record.study_id.as_deref())
            && contains(self.sample_types.as_ref(), record.sample_type.as_deref())
    }
}

/// Records passing `spec`, in input order.
pub fn apply_filter<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Vec<&'a VlRecord> {
    dataset.records.iter().filter(|r| spec.matches(r)).collect()
}

fn contains(set: Option<&BTreeSet<String>>, value: Option<&str>) -> bool {
    match (set, value) {
        (None, _) => true,
        (Some(set), Some(v)) => set.contains(v),
        (Some(_), None) => false,
    }
}

fn resolve_age_window(
    selection: &FilterSelection,
    bounds: Option<(f64, f64)>,
) -> Result<Option<(f64, f64)>, AppError> {
    let Some((min_age, max_age)) = bounds else {
        // Age columns exist but every value is missing: an active filter would
        // reject everything, so only honor an explicit request.
        return match (selection.age_min, selection.age_max) {
            (None, None) => Ok(None),
            (lo, hi) => Ok(Some((lo.unwrap_or(f64::NEG_INFINITY), hi.unwrap_or(f64::INFINITY)))),
        };
    };

    let lo = selection.age_min.unwrap_or(min_age).clamp(min_age, max_age);
    let hi = selection.age_max.unwrap_or(max_age).clamp(min_age, max_age);
    if lo > hi {
        return Err(AppError::input(format!(
            "Invalid age window: {lo} > {hi} (data covers {min_age}..{max_age})."
        )));
    }
    Ok(Some((lo, hi)))
}

fn resolve_options(
    what: &str,
    requested: &[String],
    observed: &[String],
) -> Result<BTreeSet<String>, AppError> {
    if requested.is_empty() {
        return Ok(observed.iter().cloned().collect());
    }
    let mut out = BTreeSet::new();
    for r in requested {
        let found = observed.iter().find(|o| o.eq_ignore_ascii_case(r.trim()));
        match found {
            Some(o) => {
                out.insert(o.clone());
            }
            None => {
                return Err(AppError::input(format!(
                    "Unknown {what} '{r}'. Available: {}",
                    observed.join(", ")
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, ages: Option<(f64, f64)>, study: Option<&str>, sample: Option<&str>) -> VlRecord {
        let mut r = VlRecord::new(id, 0.0, 3.0);
        r.age_lo = ages.map(|a| a.0);
        r.age_hi = ages.map(|a| a.1);
        r.study_id = study.map(str::to_string);
        r.sample_type = sample.map(str::to_string);
        r
    }

    fn dataset() -> Dataset {
        Dataset::from_records(
            vec![
                record("A", Some((0.0, 17.0)), Some("S1"), Some("Nasal")),
                record("B", Some((18.0, 39.0)), Some("S1"), Some("Saliva")),
                record("C", Some((40.0, 64.0)), Some("S2"), Some("Nasal")),
                record("D", None, Some("S2"), Some("Nasal")),
                record("E", Some((65.0, 90.0)), None, Some("Nasal")),
            ],
            ColumnPresence {
                age_range: true,
                study_id: true,
                sample_type: true,
                ..ColumnPresence::default()
            },
        )
        .unwrap()
    }

    fn ids(rows: &[&VlRecord]) -> Vec<String> {
        rows.iter().map(|r| r.person_id.clone()).collect()
    }

    #[test]
    fn default_selection_excludes_rows_with_missing_values() {
        let ds = dataset();
        let spec = FilterSpec::from_selection(&FilterSelection::default(), &ds.columns, &ds.stats).unwrap();
        assert_eq!(spec.age_range, Some((0.0, 90.0)));
        assert_eq!(ids(&apply_filter(&ds, &spec)), vec!["A", "B", "C"]);
    }

    #[test]
    fn age_window_keeps_intersecting_groups() {
        let ds = dataset();
        let selection = FilterSelection {
            age_min: Some(30.0),
            age_max: Some(45.0),
            ..FilterSelection::default()
        };
        let spec = FilterSpec::from_selection(&selection, &ds.columns, &ds.stats).unwrap();
        assert_eq!(ids(&apply_filter(&ds, &spec)), vec!["B", "C"]);
    }

    #[test]
    fn touching_boundaries_count_as_intersecting() {
        let ds = dataset();
        let selection = FilterSelection {
            age_min: Some(17.0),
            age_max: Some(18.0),
            ..FilterSelection::default()
        };
        let spec = FilterSpec::from_selection(&selection, &ds.columns, &ds.stats).unwrap();
        assert_eq!(ids(&apply_filter(&ds, &spec)), vec!["A", "B"]);
    }

    #[test]
    fn study_and_sample_type_selection() {
        let ds = dataset();
        let selection = FilterSelection {
            studies: vec!["s1".to_string()],
            sample_types: vec!["Nasal".to_string()],
            ..FilterSelection::default()
        };
        let spec = FilterSpec::from_selection(&selection, &ds.columns, &ds.stats).unwrap();
        assert_eq!(ids(&apply_filter(&ds, &spec)), vec!["A"]);
    }

    #[test]
    fn unknown_study_is_rejected() {
        let ds = dataset();
        let selection = FilterSelection {
            studies: vec!["S9".to_string()],
            ..FilterSelection::default()
        };
        let err = FilterSpec::from_selection(&selection, &ds.columns, &ds.stats).unwrap_err();
        assert!(err.to_string().contains("S9"));
    }

    #[test]
    fn inverted_age_window_is_rejected() {
        let ds = dataset();
        let selection = FilterSelection {
            age_min: Some(50.0),
            age_max: Some(20.0),
            ..FilterSelection::default()
        };
        assert!(FilterSpec::from_selection(&selection, &ds.columns, &ds.stats).is_err());
    }

    #[test]
    fn absent_columns_disable_filters() {
        let ds = Dataset::from_records(vec![VlRecord::new("Z", 1.0, 2.0)], ColumnPresence::default()).unwrap();
        let spec = FilterSpec::from_selection(&FilterSelection::default(), &ds.columns, &ds.stats).unwrap();
        assert_eq!(spec, FilterSpec::default());
        assert_eq!(apply_filter(&ds, &spec).len(), 1);
    }
}
