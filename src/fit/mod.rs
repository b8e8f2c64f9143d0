//! Single-subject curve fitting.
//!
//! Responsibilities:
//!
//! - derive a deterministic starting point from the data (`guess`)
//! - run Levenberg–Marquardt against the piecewise-linear model (`fitter`)
//! - turn every failure mode into a `FitError` instead of a panic

pub mod fitter;
pub mod guess;

pub use fitter::*;
pub use guess::*;
