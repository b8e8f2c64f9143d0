//! Reporting utilities: residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{KineticParameters, Observation};
use crate::error::AppError;
use crate::models::evaluate_at;

/// One observation with its fitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResidual {
    pub obs: Observation,
    pub fitted: f64,
    pub residual: f64,
}

/// Fitted values and residuals (`observed - fitted`) per observation.
pub fn compute_residuals(observations: &[Observation], params: &KineticParameters) -> Result<Vec<FitResidual>, AppError> {
    let mut out = Vec::with_capacity(observations.len());
    for o in observations {
        let fitted = evaluate_at(o.t, params);
        if !fitted.is_finite() {
            return Err(AppError::internal("Non-finite model prediction during residual computation."));
        }
        out.push(FitResidual {
            obs: *o,
            fitted,
            residual: o.y - fitted,
        });
    }
    Ok(out)
}

/// The largest absolute residual, if any.
pub fn worst_residual(residuals: &[FitResidual]) -> Option<&FitResidual> {
    residuals
        .iter()
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()))
}
