//! Goodness-of-fit metrics.

use crate::domain::FitMetrics;

/// RMSE, MAE and R² of `fitted` against `observed` (pairs zipped in order).
///
/// R² uses the group's own mean. When every observed value is identical the
/// total sum of squares is zero and R² is defined as exactly `1`.
pub fn group_metrics(observed: &[f64], fitted: &[f64]) -> FitMetrics {
    let n = observed.len().min(fitted.len());
    if n == 0 {
        return FitMetrics {
            rmse: f64::NAN,
            mae: f64::NAN,
            r2: f64::NAN,
        };
    }
    let nf = n as f64;
    let observed = &observed[..n];
    let fitted = &fitted[..n];

    let mut ss_res = 0.0;
    let mut abs_sum = 0.0;
    for (&y, &f) in observed.iter().zip(fitted) {
        let r = y - f;
        ss_res += r * r;
        abs_sum += r.abs();
    }

    let constant = observed.iter().all(|&y| y == observed[0]);
    let r2 = if constant {
        1.0
    } else {
        let mean = observed.iter().sum::<f64>() / nf;
        let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    };

    FitMetrics {
        rmse: (ss_res / nf).sqrt(),
        mae: abs_sum / nf,
        r2,
    }
}

/// Arithmetic mean of each metric across groups. `None` when there are no groups.
pub fn aggregate(metrics: &[FitMetrics]) -> Option<FitMetrics> {
    if metrics.is_empty() {
        return None;
    }
    let n = metrics.len() as f64;
    let sum = metrics.iter().fold(FitMetrics::default(), |acc, m| FitMetrics {
        rmse: acc.rmse + m.rmse,
        mae: acc.mae + m.mae,
        r2: acc.r2 + m.r2,
    });
    Some(FitMetrics {
        rmse: sum.rmse / n,
        mae: sum.mae / n,
        r2: sum.r2 / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit_has_zero_error() {
        let y = [1.0, 2.0, 4.0];
        let m = group_metrics(&y, &y);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn constant_observations_define_r2_as_one() {
        let y = [0.1, 0.1, 0.1];
        let f = [0.3, 0.0, 0.1];
        let m = group_metrics(&y, &f);
        assert_eq!(m.r2, 1.0);
        assert!(m.rmse > 0.0);
    }

    #[test]
    fn known_residuals() {
        let y = [1.0, 2.0, 3.0];
        let f = [2.0, 2.0, 2.0];
        let m = group_metrics(&y, &f);
        assert!((m.rmse - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
        // ss_res = 2, ss_tot = 2.
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn aggregate_is_arithmetic_mean() {
        let a = FitMetrics { rmse: 1.0, mae: 2.0, r2: 0.5 };
        let b = FitMetrics { rmse: 3.0, mae: 4.0, r2: 1.0 };
        let m = aggregate(&[a, b]).unwrap();
        assert_eq!(m, FitMetrics { rmse: 2.0, mae: 3.0, r2: 0.75 });
        assert!(aggregate(&[]).is_none());
    }
}
