//! Piecewise-linear viral kinetics model.
//!
//! The curve has three regimes joined at breakpoints `t1`, `t2`, `t3`:
//!
//! - flat baseline `y0` for `t < t1`
//! - linear change with slope `s1` on `[t1, t2]` (rise)
//! - linear change with slope `s2` on `[t2, t3]` (fall)
//! - flat again for `t > t3`, holding the value reached at `t3`
//!
//! Every term is clamped with `min`, so for ordered breakpoints
//! (`t1 <= t2 <= t3`) the curve is continuous everywhere. Out-of-order
//! breakpoints are accepted and evaluated by the same formula; the result may
//! then step at `t1` or `t2`.

use crate::domain::KineticParameters;

/// Evaluate the model at a single time point.
pub fn evaluate_at(t: f64, params: &KineticParameters) -> f64 {
    let mut y = params.y0;
    if t >= params.t1 {
        y += params.s1 * (t.min(params.t2) - params.t1);
    }
    if t >= params.t2 {
        y += params.s2 * (t.min(params.t3) - params.t2);
    }
    y
}

/// Evaluate the model elementwise; the output has the same length and order as `times`.
pub fn evaluate(times: &[f64], params: &KineticParameters) -> Vec<f64> {
    times.iter().map(|&t| evaluate_at(t, params)).collect()
}

/// Partial derivatives of the model at `t` with respect to
/// `[t1, t2, t3, y0, s1, s2]`.
///
/// At a breakpoint the right-hand derivative is used, matching the `>=`
/// comparisons in [`evaluate_at`].
pub fn gradient_at(t: f64, params: &KineticParameters) -> [f64; 6] {
    let KineticParameters { t1, t2, t3, s1, s2, .. } = *params;
    let past_t1 = t >= t1;
    let past_t2 = t >= t2;

    let d_t1 = if past_t1 { -s1 } else { 0.0 };
    let d_t2 = {
        let rise = if past_t1 && t > t2 { s1 } else { 0.0 };
        let fall = if past_t2 { -s2 } else { 0.0 };
        rise + fall
    };
    let d_t3 = if past_t2 && t > t3 { s2 } else { 0.0 };
    let d_y0 = 1.0;
    let d_s1 = if past_t1 { t.min(t2) - t1 } else { 0.0 };
    let d_s2 = if past_t2 { t.min(t3) - t2 } else { 0.0 };

    [d_t1, d_t2, d_t3, d_y0, d_s1, d_s2]
}

/// `n` evenly spaced points on `[lo, hi]` (inclusive).
///
/// `n == 1` yields `[lo]`; `n == 0` yields an empty grid.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
                .collect()
        }
    }
}
