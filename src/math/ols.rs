//! Least squares solvers.
//!
//! Two flavors are used by the fitters:
//!
//! - a closed-form simple regression `y = intercept + slope * x` for the linear model
//! - a general SVD solve of `min ||X β - y||²` for the Gauss-Newton steps of the
//!   Weibull least-squares refinement
//!
//! Nalgebra's `QR::solve` is intended for square systems, so the general solver
//! goes through SVD, which also copes with rank-deficient Jacobians (e.g. a
//! shape parameter that barely moves the curve).

use nalgebra::{DMatrix, DVector};

use crate::math::moments::mean;

/// Closed-form ordinary least squares line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit `y = intercept + slope * x`.
///
/// Uses centered sums: `slope = Σ(x−x̄)(y−ȳ) / Σ(x−x̄)²`, `intercept = ȳ − slope·x̄`.
///
/// Returns `None` for fewer than two points or when every `x` is identical,
/// where the slope is undefined.
pub fn simple_linear_regression(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    if x.iter().all(|&v| v == x[0]) {
        return None;
    }

    let x_bar = mean(x)?;
    let y_bar = mean(y)?;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_bar;
        sxx += dx * dx;
        sxy += dx * (yi - y_bar);
    }
    if sxx == 0.0 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;
    if slope.is_finite() && intercept.is_finite() {
        Some(LineFit { slope, intercept })
    } else {
        None
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn simple_regression_recovers_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.5];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 3.0).collect();
        let fit = simple_linear_regression(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
    }

    #[test]
    fn simple_regression_rejects_degenerate_inputs() {
        assert!(simple_linear_regression(&[1.0], &[2.0]).is_none());
        assert!(simple_linear_regression(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(simple_linear_regression(&[0.1, 0.1, 0.1], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn large_time_offsets_are_not_degenerate() {
        let x = [1_000_000.0, 1_000_001.0, 1_000_002.0];
        let y = [5.0, 7.0, 9.0];
        let fit = simple_linear_regression(&x, &y).unwrap();
        assert_eq!(fit.slope, 2.0);
        assert!((fit.intercept + 1_999_995.0).abs() < 1e-6);
    }
}
