//! Initial parameter guess for the piecewise-linear fit.
//!
//! Breakpoints are seeded from percentiles of the observed times, assuming the
//! usual shape of an acute infection: an early baseline, a rise through the
//! first half of sampling, a decline, then a late plateau. Slopes start at a
//! fixed `+1` / `-1` log10 unit per day.

use std::cmp::Ordering;

use crate::domain::{KineticParameters, Observation};
use crate::math::percentile_sorted;

/// Percentile of observed times used to seed `t1`.
pub const T1_PERCENTILE: f64 = 10.0;
/// Percentile of observed times used to seed `t2`.
pub const T2_PERCENTILE: f64 = 40.0;
/// Percentile of observed times used to seed `t3`.
pub const T3_PERCENTILE: f64 = 80.0;
/// Starting rise slope.
pub const S1_GUESS: f64 = 1.0;
/// Starting fall slope.
pub const S2_GUESS: f64 = -1.0;

/// Deterministic, data-driven starting point for the solver.
///
/// Returns `None` for an empty slice.
pub fn initial_guess(observations: &[Observation]) -> Option<KineticParameters> {
    if observations.is_empty() {
        return None;
    }

    let mut times: Vec<f64> = observations.iter().map(|o| o.t).collect();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let y0 = observations
        .iter()
        .map(|o| o.y)
        .fold(f64::INFINITY, f64::min);

    Some(KineticParameters {
        t1: percentile_sorted(&times, T1_PERCENTILE),
        t2: percentile_sorted(&times, T2_PERCENTILE),
        t3: percentile_sorted(&times, T3_PERCENTILE),
        y0,
        s1: S1_GUESS,
        s2: S2_GUESS,
    })
}
