//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during filtering and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of free parameters in the piecewise-linear model.
pub const PARAM_COUNT: usize = 6;

/// Parameter names in solver order.
pub const PARAM_NAMES: [&str; PARAM_COUNT] = ["t1", "t2", "t3", "y0", "s1", "s2"];

/// One observed point of a subject's trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Elapsed time in days (`TimeDays`).
    pub t: f64,
    /// Log10 viral load (`Log10VL`).
    pub y: f64,
}

impl Observation {
    pub fn new(t: f64, y: f64) -> Self {
        Self { t, y }
    }
}

/// Parameters of the piecewise-linear kinetics curve.
///
/// Breakpoints are not required to be ordered; the solver may converge to
/// `t1 > t2` or `t2 > t3`, which callers can detect with [`is_ordered`].
///
/// [`is_ordered`]: KineticParameters::is_ordered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticParameters {
    /// Start of the rise.
    pub t1: f64,
    /// Rise-to-fall transition (peak).
    pub t2: f64,
    /// Fall-to-plateau transition.
    pub t3: f64,
    /// Baseline level.
    pub y0: f64,
    /// Rise slope (per day).
    pub s1: f64,
    /// Fall slope (per day).
    pub s2: f64,
}

impl KineticParameters {
    /// Parameters in solver order `[t1, t2, t3, y0, s1, s2]`.
    pub fn to_array(&self) -> [f64; PARAM_COUNT] {
        [self.t1, self.t2, self.t3, self.y0, self.s1, self.s2]
    }

    pub fn from_array(v: [f64; PARAM_COUNT]) -> Self {
        Self {
            t1: v[0],
            t2: v[1],
            t3: v[2],
            y0: v[3],
            s1: v[4],
            s2: v[5],
        }
    }

    /// `true` when `t1 <= t2 <= t3`.
    pub fn is_ordered(&self) -> bool {
        self.t1 <= self.t2 && self.t2 <= self.t3
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Value of the curve after `t3` (assuming ordered breakpoints).
    pub fn plateau(&self) -> f64 {
        self.y0 + self.s1 * (self.t2 - self.t1) + self.s2 * (self.t3 - self.t2)
    }
}

/// A cleaned input row.
///
/// `person_id`, `time_days` and `log10_vl` are guaranteed present and finite;
/// everything else mirrors optional CSV columns.
#[derive(Debug, Clone, PartialEq)]
pub struct VlRecord {
    pub person_id: String,
    pub time_days: f64,
    pub log10_vl: f64,

    /// Lower bound of the reported age group (`AgeRng1`).
    pub age_lo: Option<f64>,
    /// Upper bound of the reported age group (`AgeRng2`).
    pub age_hi: Option<f64>,

    pub study_id: Option<String>,
    pub sample_type: Option<String>,
    pub infection_id: Option<String>,

    /// GE/ml conversion: `ge = log10_vl * slope + intercept`.
    pub ge_slope: Option<f64>,
    pub ge_intercept: Option<f64>,
}

impl VlRecord {
    /// Minimal record with only the required fields set.
    pub fn new(person_id: impl Into<String>, time_days: f64, log10_vl: f64) -> Self {
        Self {
            person_id: person_id.into(),
            time_days,
            log10_vl,
            age_lo: None,
            age_hi: None,
            study_id: None,
            sample_type: None,
            infection_id: None,
            ge_slope: None,
            ge_intercept: None,
        }
    }

    pub fn observation(&self) -> Observation {
        Observation::new(self.time_days, self.log10_vl)
    }
}

/// Which optional columns were present in the input header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnPresence {
    /// Both `AgeRng1` and `AgeRng2`.
    pub age_range: bool,
    pub study_id: bool,
    pub sample_type: bool,
    pub infection_id: bool,
    /// Both `GEml_conversion_slope` and `GEml_conversion_intercept`.
    pub ge_conversion: bool,
}

/// Summary stats about the cleaned records.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_records: usize,
    /// `(min AgeRng1, max AgeRng2)` over rows where present.
    pub age_bounds: Option<(f64, f64)>,
    pub time_min: f64,
    pub time_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Distinct subjects in first-appearance order.
    pub subjects: Vec<String>,
    /// Distinct study ids in first-appearance order.
    pub studies: Vec<String>,
    /// Distinct sample types in first-appearance order.
    pub sample_types: Vec<String>,
}

/// User-facing filter selection (from CLI flags or the TUI).
///
/// Unset fields mean "everything": the full age range and every observed
/// study / sample type. The selection is resolved against a dataset by
/// `cohort::FilterSpec::from_selection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub age_min: Option<f64>,
    pub age_max: Option<f64>,
    pub studies: Vec<String>,
    pub sample_types: Vec<String>,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    /// Residual evaluations spent by the solver.
    pub evaluations: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub selection: FilterSelection,
    /// Maximum number of subjects drawn in the overlay plot.
    pub max_subjects: usize,
    /// Rows shown in the filtered-data preview.
    pub preview_rows: usize,

    /// Subject to fit (`fit` subcommand / TUI fit panel).
    pub subject: Option<String>,
    /// Treat a failed fit as an error exit.
    pub strict: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_svg: Option<PathBuf>,
    pub dark_mode: bool,
    pub export_curve: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub subject: String,
    pub params: KineticParameters,
    pub fit: FitQuality,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time_days: Vec<f64>,
    pub y: Vec<f64>,
}
