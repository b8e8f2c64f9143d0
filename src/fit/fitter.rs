//! Nonlinear least-squares fit of the piecewise-linear model to one subject.
//!
//! Given observations `(t_i, y_i)` we minimize
//!
//! ```text
//! Σ (evaluate(t_i; θ) - y_i)^2,   θ = [t1, t2, t3, y0, s1, s2]
//! ```
//!
//! with Levenberg–Marquardt, starting from [`initial_guess`]. The problem is
//! unconstrained: the solver may return out-of-order breakpoints.
//!
//! The fit is a pure function of its input. The starting point is
//! deterministic and the solver has no randomness, so repeated calls with the
//! same observations return identical results.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::debug;
use nalgebra::{DVector, Dyn, OMatrix, Owned, U6, Vector6};
use thiserror::Error;

use crate::domain::{FitQuality, KineticParameters, Observation, PARAM_COUNT};
use crate::fit::guess::initial_guess;
use crate::math::min_max;
use crate::models::{evaluate_at, gradient_at};

/// Solver patience: the evaluation budget is `patience * (PARAM_COUNT + 1)`.
pub const SOLVER_PATIENCE: usize = 200;

/// Why a fit produced no parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Input contract violation: nothing to fit.
    #[error("no observations supplied")]
    EmptyInput,

    /// Input contract violation: the loader must drop missing values.
    #[error("observation {index} is not finite (t={t}, y={y})")]
    NonFiniteObservation { index: usize, t: f64, y: f64 },

    #[error("insufficient data: {n} observation(s), at least {required} required")]
    InsufficientData { n: usize, required: usize },

    #[error("degenerate data: every observation is at t={t}")]
    DegenerateTimes { t: f64 },

    #[error("solver did not converge after {evaluations} evaluations")]
    NotConverged { evaluations: usize },

    #[error("solver failed: {0}")]
    Numerical(String),
}

impl FitError {
    /// `true` for caller mistakes, as opposed to data that simply cannot be fitted.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, FitError::EmptyInput | FitError::NonFiniteObservation { .. })
    }
}

/// A successful fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOutcome {
    pub params: KineticParameters,
    pub quality: FitQuality,
}

/// Fit the piecewise-linear model to one subject's observations.
pub fn fit(observations: &[Observation]) -> Result<FitOutcome, FitError> {
    validate(observations)?;

    let guess = initial_guess(observations).ok_or(FitError::EmptyInput)?;
    debug!("piecewise fit: n={} initial guess {guess:?}", observations.len());

    let times: Vec<f64> = observations.iter().map(|o| o.t).collect();
    let values: Vec<f64> = observations.iter().map(|o| o.y).collect();

    let problem = PiecewiseProblem {
        times: &times,
        values: &values,
        params: Vector6::from(guess.to_array()),
    };

    let (solved, report) = LevenbergMarquardt::new()
        .with_patience(SOLVER_PATIENCE)
        .minimize(problem);

    debug!(
        "piecewise fit: termination={:?} evaluations={}",
        report.termination, report.number_of_evaluations
    );

    if !report.termination.was_successful() {
        return Err(match report.termination {
            TerminationReason::LostPatience => FitError::NotConverged {
                evaluations: report.number_of_evaluations,
            },
            other => FitError::Numerical(format!("{other:?}")),
        });
    }

    let mut v = [0.0; PARAM_COUNT];
    v.copy_from_slice(solved.params.as_slice());
    let params = KineticParameters::from_array(v);
    if !params.is_finite() {
        return Err(FitError::Numerical("non-finite fitted parameters".to_string()));
    }

    let sse: f64 = times
        .iter()
        .zip(values.iter())
        .map(|(&t, &y)| {
            let r = evaluate_at(t, &params) - y;
            r * r
        })
        .sum();
    if !sse.is_finite() {
        return Err(FitError::Numerical("non-finite residuals".to_string()));
    }

    let n = observations.len();
    Ok(FitOutcome {
        params,
        quality: FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            n,
            evaluations: report.number_of_evaluations,
        },
    })
}

fn validate(observations: &[Observation]) -> Result<(), FitError> {
    if observations.is_empty() {
        return Err(FitError::EmptyInput);
    }
    if let Some((index, o)) = observations
        .iter()
        .enumerate()
        .find(|(_, o)| !(o.t.is_finite() && o.y.is_finite()))
    {
        return Err(FitError::NonFiniteObservation { index, t: o.t, y: o.y });
    }
    if observations.len() < PARAM_COUNT {
        return Err(FitError::InsufficientData {
            n: observations.len(),
            required: PARAM_COUNT,
        });
    }

    let times: Vec<f64> = observations.iter().map(|o| o.t).collect();
    match min_max(&times) {
        Some((lo, hi)) if hi > lo => Ok(()),
        _ => Err(FitError::DegenerateTimes { t: times[0] }),
    }
}

struct PiecewiseProblem<'a> {
    times: &'a [f64],
    values: &'a [f64],
    params: Vector6<f64>,
}

impl PiecewiseProblem<'_> {
    fn current(&self) -> KineticParameters {
        let mut v = [0.0; PARAM_COUNT];
        v.copy_from_slice(self.params.as_slice());
        KineticParameters::from_array(v)
    }
}

impl LeastSquaresProblem<f64, Dyn, U6> for PiecewiseProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U6>;
    type ParameterStorage = Owned<f64, U6>;

    fn set_params(&mut self, x: &Vector6<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> Vector6<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let p = self.current();
        let r = DVector::from_iterator(
            self.times.len(),
            self.times
                .iter()
                .zip(self.values.iter())
                .map(|(&t, &y)| evaluate_at(t, &p) - y),
        );
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U6>> {
        let p = self.current();
        let mut jac = OMatrix::<f64, Dyn, U6>::zeros_generic(Dyn(self.times.len()), U6);
        for (row, &t) in self.times.iter().enumerate() {
            for (col, d) in gradient_at(t, &p).into_iter().enumerate() {
                jac[(row, col)] = d;
            }
        }
        Some(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{mean, sum_squared_residuals};
    use crate::models::evaluate;

    fn rise_fall_plateau() -> Vec<Observation> {
        [3.0, 4.0, 5.0, 6.5, 5.5, 4.0, 3.0, 3.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &y)| Observation::new(i as f64, y))
            .collect()
    }

    #[test]
    fn fits_rise_fall_plateau_better_than_flat_mean() {
        let obs = rise_fall_plateau();
        let outcome = fit(&obs).unwrap();
        let p = outcome.params;

        assert!(p.t1 < p.t2 && p.t2 < p.t3, "breakpoints out of order: {p:?}");
        assert!(p.t1 >= 0.0 && p.t3 <= 8.0, "breakpoints outside observed range: {p:?}");

        let times: Vec<f64> = obs.iter().map(|o| o.t).collect();
        let ys: Vec<f64> = obs.iter().map(|o| o.y).collect();
        let fitted_sse = sum_squared_residuals(&evaluate(&times, &p), &ys);
        let m = mean(&ys).unwrap();
        let flat_sse = sum_squared_residuals(&vec![m; ys.len()], &ys);

        assert!(fitted_sse < flat_sse, "fitted={fitted_sse} flat={flat_sse}");
        assert!((outcome.quality.sse - fitted_sse).abs() < 1e-12);
        assert_eq!(outcome.quality.n, 9);
    }

    #[test]
    fn recovers_noise_free_curve() {
        let truth = KineticParameters { t1: 1.5, t2: 6.5, t3: 12.5, y0: 2.0, s1: 1.2, s2: -0.6 };
        let obs: Vec<Observation> = (0..=16)
            .map(|i| {
                let t = i as f64;
                Observation::new(t, evaluate_at(t, &truth))
            })
            .collect();

        let outcome = fit(&obs).unwrap();
        assert!(outcome.quality.sse < 1e-6, "sse={}", outcome.quality.sse);
    }

    #[test]
    fn fit_is_deterministic() {
        let obs = rise_fall_plateau();
        assert_eq!(fit(&obs), fit(&obs));

        let too_few = &obs[..3];
        assert_eq!(fit(too_few), fit(too_few));
    }

    #[test]
    fn single_point_is_a_fit_failure() {
        let err = fit(&[Observation::new(0.0, 5.0)]).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { n: 1, required: 6 });
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn fewer_than_six_points_is_a_fit_failure() {
        let obs = rise_fall_plateau();
        for n in 1..6 {
            assert!(matches!(fit(&obs[..n]), Err(FitError::InsufficientData { .. })));
        }
    }

    #[test]
    fn identical_times_are_a_fit_failure() {
        let obs: Vec<Observation> = (1..=6).map(|i| Observation::new(5.0, i as f64)).collect();
        assert_eq!(fit(&obs), Err(FitError::DegenerateTimes { t: 5.0 }));
    }

    #[test]
    fn empty_input_is_a_contract_violation() {
        let err = fit(&[]).unwrap_err();
        assert_eq!(err, FitError::EmptyInput);
        assert!(err.is_contract_violation());
    }

    #[test]
    fn non_finite_input_is_a_contract_violation() {
        let mut obs = rise_fall_plateau();
        obs[4].y = f64::NAN;
        let err = fit(&obs).unwrap_err();
        assert!(matches!(err, FitError::NonFiniteObservation { index: 4, .. }));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn duplicate_timestamps_are_accepted() {
        let mut obs = rise_fall_plateau();
        obs.push(Observation::new(3.0, 6.3));
        obs.push(Observation::new(5.0, 4.2));
        obs.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap());
        assert!(fit(&obs).is_ok());
    }

    #[test]
    fn concurrent_fits_agree() {
        let obs = rise_fall_plateau();
        let expected = fit(&obs);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| fit(&obs))).collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }
}
