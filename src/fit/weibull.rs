//! Weibull parameter estimation.
//!
//! Two estimators share the curve `N_min + (N_max − N_min)(1 − exp(−(t/δ)^p))`:
//!
//! - [`heuristic`]: closed-form guess from data extremes (`δ = 0.8 × max(t)`, fixed `p`).
//!   This is a curve-shape heuristic, not a statistical fit.
//! - [`refine_least_squares`]: starts from the heuristic and minimizes the squared
//!   residuals over `(δ, p)` with damped Gauss-Newton (Levenberg-Marquardt). The
//!   plateaus `N_max` / `N_min` stay at the observed extremes so both estimators
//!   report the same parameter set.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;
use crate::models::{WEIBULL_DELTA_FRACTION, fill_weibull_jacobian_row, weibull_value};

const MAX_ITERS: usize = 100;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e12;
const REL_TOL: f64 = 1e-12;
/// Shape is kept inside a range where the curve stays numerically sane.
const P_MIN: f64 = 0.05;
const P_MAX: f64 = 50.0;

/// Weibull curve parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeibullParams {
    pub delta: f64,
    pub p: f64,
    pub n_max: f64,
    pub n_min: f64,
}

impl WeibullParams {
    pub fn value(&self, t: f64) -> f64 {
        weibull_value(t, self.delta, self.p, self.n_max, self.n_min)
    }

    /// Sum of squared residuals over `(t, y)` pairs.
    pub fn sse(&self, times: &[f64], ys: &[f64]) -> f64 {
        times
            .iter()
            .zip(ys)
            .map(|(&t, &y)| {
                let r = y - self.value(t);
                r * r
            })
            .sum()
    }
}

/// Heuristic parameters from the data extremes.
///
/// Returns `None` when `δ` would not be a positive finite number (all times ≤ 0)
/// or the shape is not positive.
pub fn heuristic(times: &[f64], ys: &[f64], shape: f64) -> Option<WeibullParams> {
    if times.is_empty() || ys.is_empty() || !(shape.is_finite() && shape > 0.0) {
        return None;
    }
    let t_max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let delta = WEIBULL_DELTA_FRACTION * t_max;
    if !(delta.is_finite() && delta > 0.0) {
        return None;
    }
    let n_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n_min = ys.iter().copied().fold(f64::INFINITY, f64::min);

    Some(WeibullParams {
        delta,
        p: shape,
        n_max,
        n_min,
    })
}

/// Refine `(δ, p)` by Levenberg-Marquardt, starting from `start`.
///
/// Only steps that reduce the SSE are accepted, so the result is never worse
/// than `start`.
pub fn refine_least_squares(times: &[f64], ys: &[f64], start: WeibullParams) -> WeibullParams {
    let n = times.len().min(ys.len());
    let mut best = start;
    let mut best_sse = best.sse(times, ys);
    if n < 2 || !best_sse.is_finite() || best.n_max == best.n_min {
        return best;
    }

    let mut lambda = LAMBDA_INIT;
    let mut jac_row = [0.0; 2];

    for _ in 0..MAX_ITERS {
        // Jacobian + residuals at the current estimate.
        let mut jac = DMatrix::<f64>::zeros(n + 2, 2);
        let mut rhs = DVector::<f64>::zeros(n + 2);
        let mut col_scale = [0.0_f64; 2];
        for i in 0..n {
            fill_weibull_jacobian_row(times[i], best.delta, best.p, best.n_max, best.n_min, &mut jac_row);
            for j in 0..2 {
                let v = if jac_row[j].is_finite() { jac_row[j] } else { 0.0 };
                jac[(i, j)] = v;
                col_scale[j] += v * v;
            }
            rhs[i] = ys[i] - best.value(times[i]);
        }

        // Marquardt damping rows: sqrt(λ · diag(JᵀJ)).
        for j in 0..2 {
            jac[(n + j, j)] = (lambda * col_scale[j].max(1e-12)).sqrt();
        }

        let Some(step) = solve_least_squares(&jac, &rhs) else {
            break;
        };

        let candidate = WeibullParams {
            delta: best.delta + step[0],
            p: (best.p + step[1]).clamp(P_MIN, P_MAX),
            ..best
        };

        let accepted = candidate.delta.is_finite() && candidate.delta > 0.0 && {
            let sse = candidate.sse(times, ys);
            if sse.is_finite() && sse < best_sse {
                let improvement = (best_sse - sse) / best_sse.max(f64::MIN_POSITIVE);
                best = candidate;
                best_sse = sse;
                if improvement < REL_TOL {
                    return best;
                }
                true
            } else {
                false
            }
        };

        if accepted {
            lambda = (lambda / 10.0).max(1e-12);
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }
    }

    best
}
