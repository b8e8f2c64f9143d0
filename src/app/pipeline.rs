//! Shared explore/fit workflow used by both CLI and TUI front-ends.
//!
//! dataset -> filter spec -> filtered rows -> overlay | subject fit
//!
//! The CLI and the TUI then only deal with presentation (printing vs widgets).

use log::{info, warn};

use crate::cohort::{FilterSpec, Overlay, apply_filter, overlay_trajectories, subject_observations};
use crate::domain::{FilterSelection, Observation, VlRecord};
use crate::error::AppError;
use crate::fit::{FitError, FitOutcome, fit};
use crate::io::ingest::Dataset;

/// Filtered view of a dataset.
#[derive(Debug, Clone)]
pub struct Exploration<'a> {
    pub spec: FilterSpec,
    pub rows: Vec<&'a VlRecord>,
    pub overlay: Overlay,
}

/// Resolve `selection`, filter `dataset` and build the overlay.
pub fn explore<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
    max_subjects: usize,
) -> Result<Exploration<'a>, AppError> {
    let spec = FilterSpec::from_selection(selection, &dataset.columns, &dataset.stats)?;
    explore_with_spec(dataset, spec, max_subjects)
}

/// Like [`explore`] for an already resolved filter (the TUI edits specs directly).
pub fn explore_with_spec(dataset: &Dataset, spec: FilterSpec, max_subjects: usize) -> Result<Exploration<'_>, AppError> {
    let rows = apply_filter(dataset, &spec);
    if rows.is_empty() {
        return Err(AppError::no_data("No rows match the current filters."));
    }
    let overlay = overlay_trajectories(&rows, &dataset.columns, max_subjects);
    info!(
        "filtered {} of {} rows; overlay has {} trajectories",
        rows.len(),
        dataset.records.len(),
        overlay.trajectories.len()
    );
    Ok(Exploration { spec, rows, overlay })
}

/// A single-subject fit; a failed fit is a value, not an error.
#[derive(Debug, Clone)]
pub struct SubjectFit {
    pub subject: String,
    pub observations: Vec<Observation>,
    pub result: Result<FitOutcome, FitError>,
}

impl SubjectFit {
    pub fn params(&self) -> Option<&crate::domain::KineticParameters> {
        self.result.as_ref().ok().map(|o| &o.params)
    }
}

/// Fit one subject among `rows`.
pub fn fit_subject(rows: &[&VlRecord], subject: &str) -> Result<SubjectFit, AppError> {
    let observations = subject_observations(rows, subject);
    if observations.is_empty() {
        return Err(AppError::input(format!(
            "Subject '{subject}' has no rows after filtering."
        )));
    }

    let result = fit(&observations);
    match &result {
        Ok(outcome) => info!(
            "fit subject {subject}: n={} sse={:.4} evaluations={}",
            outcome.quality.n, outcome.quality.sse, outcome.quality.evaluations
        ),
        Err(err) => warn!("fit subject {subject} failed: {err}"),
    }

    Ok(SubjectFit {
        subject: subject.to_string(),
        observations,
        result,
    })
}
