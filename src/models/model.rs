//! Model evaluation for the analytic kinds (linear, Weibull).
//!
//! The fitters rely on two primitive operations:
//! - predict `microbe(t)` given fitted parameters (for fitted rows and residuals)
//! - build a Jacobian row for the Weibull curve (for Gauss-Newton steps)
//!
//! Data-driven kinds (KNN, simulated baselines) have no closed-form predictor;
//! their fitted values are produced in `fit::simulated`.

use crate::domain::ModelParams;

/// Default Weibull shape `p` for the heuristic fit.
pub const DEFAULT_WEIBULL_SHAPE: f64 = 1.2;

/// Heuristic scale: `delta = 0.8 × max(time)`.
pub const WEIBULL_DELTA_FRACTION: f64 = 0.8;

/// Weibull survival fraction `S(t) = exp(−(t/δ)^p)`.
///
/// Negative times are evaluated as `t = 0` (`S = 1`).
pub fn weibull_survival(t: f64, delta: f64, p: f64) -> f64 {
    let x = t.max(0.0) / delta;
    (-x.powf(p)).exp()
}

/// Weibull curve value: `N_min + (N_max − N_min)(1 − S(t))`.
pub fn weibull_value(t: f64, delta: f64, p: f64, n_max: f64, n_min: f64) -> f64 {
    n_min + (n_max - n_min) * (1.0 - weibull_survival(t, delta, p))
}

/// Predict `microbe(t)`. `None` for kinds without an analytic predictor.
pub fn predict(params: &ModelParams, t: f64) -> Option<f64> {
    match *params {
        ModelParams::Linear { slope, intercept } => Some(intercept + slope * t),
        ModelParams::Weibull { delta, p, n_max, n_min } => Some(weibull_value(t, delta, p, n_max, n_min)),
        ModelParams::Knn { .. } | ModelParams::Simulated { .. } => None,
    }
}

/// Fill the Jacobian row `[∂f/∂δ, ∂f/∂p]` of the Weibull curve at `t`.
///
/// With `u = (t/δ)^p` and `A = N_max − N_min`:
/// - `∂f/∂δ = −A·e^{−u}·p·u/δ`
/// - `∂f/∂p = A·e^{−u}·u·ln(t/δ)`
///
/// Both vanish at `t ≤ 0`.
pub fn fill_weibull_jacobian_row(t: f64, delta: f64, p: f64, n_max: f64, n_min: f64, out: &mut [f64; 2]) {
    if t <= 0.0 {
        *out = [0.0, 0.0];
        return;
    }
    let ratio = t / delta;
    let u = ratio.powf(p);
    let a = n_max - n_min;
    let decay = (-u).exp();
    out[0] = -a * decay * p * u / delta;
    out[1] = a * decay * u * ratio.ln();
}
