//! Read/write curve JSON files.
//!
//! Curve JSON is the portable representation of a fitted subject curve:
//! - subject id + kinetic parameters
//! - fit diagnostics (SSE, RMSE, evaluations)
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;
use log::info;

use crate::domain::{CurveFile, CurveGrid, Observation};
use crate::error::AppError;
use crate::fit::FitOutcome;
use crate::models::{evaluate, linspace};

/// Points in the exported curve grid.
pub const CURVE_GRID_POINTS: usize = 200;

/// Build the curve file for a fitted subject over its observed time span.
pub fn build_curve_file(subject: &str, outcome: &FitOutcome, observations: &[Observation]) -> CurveFile {
    let (lo, hi) = observations
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| (lo.min(o.t), hi.max(o.t)));
    let (lo, hi) = if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (outcome.params.t1, outcome.params.t3)
    };

    let time_days = linspace(lo, hi, CURVE_GRID_POINTS);
    let y = evaluate(&time_days, &outcome.params);

    CurveFile {
        tool: "vkx".to_string(),
        generated_at: Utc::now(),
        subject: subject.to_string(),
        params: outcome.params,
        fit: outcome.quality,
        grid: CurveGrid { time_days, y },
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::input(format!("Failed to write curve JSON: {e}")))?;

    info!("wrote curve for subject {} to '{}'", curve.subject, path.display());
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid curve JSON: {e}")))?;
    if curve.grid.time_days.len() != curve.grid.y.len() {
        return Err(AppError::input("Invalid curve JSON: grid lengths differ."));
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, KineticParameters};

    fn outcome() -> FitOutcome {
        FitOutcome {
            params: KineticParameters { t1: 1.0, t2: 3.0, t3: 6.0, y0: 3.0, s1: 1.0, s2: -0.5 },
            quality: FitQuality { sse: 0.1, rmse: 0.1, n: 9, evaluations: 42 },
        }
    }

    #[test]
    fn curve_grid_spans_observed_times() {
        let obs = [Observation::new(0.0, 3.0), Observation::new(8.0, 3.5)];
        let curve = build_curve_file("P7", &outcome(), &obs);
        assert_eq!(curve.grid.time_days.len(), CURVE_GRID_POINTS);
        assert_eq!(curve.grid.time_days[0], 0.0);
        assert_eq!(*curve.grid.time_days.last().unwrap(), 8.0);
        assert_eq!(curve.grid.y[0], 3.0);
    }

    #[test]
    fn curve_json_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.json");
        let obs = [Observation::new(0.0, 3.0), Observation::new(8.0, 3.5)];
        let curve = build_curve_file("P7", &outcome(), &obs);

        write_curve_json(&path, &curve).unwrap();
        let back = read_curve_json(&path).unwrap();
        assert_eq!(back.subject, "P7");
        assert_eq!(back.params, curve.params);
        assert_eq!(back.fit.evaluations, 42);
    }
}
