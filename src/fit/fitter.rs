//! Per-temperature model fitting.
//!
//! Given a row set and a model kind we:
//! - partition rows by exact temperature
//! - fit each group on its valid subset (finite `time` and `microbe`) in parallel
//! - predict `microbe_fitted` for every row of each fitted group
//! - average the per-group metrics into the run-level metrics
//!
//! Groups with fewer than two valid rows, or whose data make the model
//! degenerate (identical times, non-positive Weibull scale), are skipped and
//! reported rather than failing the whole run.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data::group::{TemperatureGroup, group_by_temperature};
use crate::domain::{FitConfig, FitResult, GroupFit, ModelKind, ModelParams, Row, SkippedGroup};
use crate::error::PipelineError;
use crate::fit::metrics::{aggregate, group_metrics};
use crate::fit::simulated::{KNN_K, group_seed, knn_predict, noise_bound, simulate};
use crate::fit::weibull::{heuristic, refine_least_squares};
use crate::math::simple_linear_regression;
use crate::models::{DEFAULT_WEIBULL_SHAPE, predict};

/// Minimum valid rows for a group to be fit.
const MIN_VALID_ROWS: usize = 2;

/// Options that affect how each group is fit.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub model: ModelKind,
    /// Weibull shape `p` for the heuristic (start value for `weibull-ls`).
    pub weibull_shape: f64,
    /// Seed for simulated baselines.
    pub seed: u64,
}

impl FitOptions {
    pub fn new(model: ModelKind) -> Self {
        Self {
            model,
            weibull_shape: DEFAULT_WEIBULL_SHAPE,
            seed: 42,
        }
    }
}

impl From<&FitConfig> for FitOptions {
    fn from(config: &FitConfig) -> Self {
        Self {
            model: config.model,
            weibull_shape: config.weibull_shape,
            seed: config.seed,
        }
    }
}

/// Runs fits with at most one fit in flight.
///
/// A second call while a fit is running is rejected with [`PipelineError::Busy`]
/// instead of queueing.
#[derive(Debug, Default)]
pub struct Fitter {
    in_flight: AtomicBool,
}

/// Marks a fit as in flight until dropped.
#[derive(Debug)]
pub struct FitGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Fitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the fitter. Fails with `Busy` if another fit holds it.
    pub fn try_begin(&self) -> Result<FitGuard<'_>, PipelineError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(FitGuard {
            flag: &self.in_flight,
        })
    }

    /// Fit `opts.model` to every temperature group of `rows`.
    pub fn fit(&self, rows: &[Row], opts: &FitOptions) -> Result<FitResult, PipelineError> {
        let _guard = self.try_begin()?;
        fit_rows(rows, opts)
    }
}

enum GroupOutcome {
    Fitted { fit: GroupFit, rows: Vec<Row> },
    Insufficient(SkippedGroup),
    Degenerate(SkippedGroup),
}

/// Fit without the in-flight guard.
pub fn fit_rows(rows: &[Row], opts: &FitOptions) -> Result<FitResult, PipelineError> {
    let uses_shape = matches!(opts.model, ModelKind::Weibull | ModelKind::WeibullLs);
    if uses_shape && !(opts.weibull_shape.is_finite() && opts.weibull_shape > 0.0) {
        return Err(PipelineError::InvalidOption(format!(
            "Weibull shape must be a positive number, got {}.",
            opts.weibull_shape
        )));
    }

    let groups = group_by_temperature(rows);

    // Groups are independent; rayon's collect keeps the ascending order.
    let outcomes: Vec<GroupOutcome> = groups
        .par_iter()
        .map(|group| fit_group(group, opts))
        .collect::<Result<_, _>>()?;

    let mut fits = Vec::new();
    let mut fitted_data = Vec::new();
    let mut skipped = Vec::new();
    let mut any_degenerate = false;

    for outcome in outcomes {
        match outcome {
            GroupOutcome::Fitted { fit, rows } => {
                debug!(
                    temperature = fit.temperature,
                    n_valid = fit.n_valid,
                    r2 = fit.metrics.r2,
                    "fitted group"
                );
                fits.push(fit);
                fitted_data.extend(rows);
            }
            GroupOutcome::Insufficient(s) => {
                warn!(temperature = s.temperature, reason = %s.reason, "skipped group");
                skipped.push(s);
            }
            GroupOutcome::Degenerate(s) => {
                warn!(temperature = s.temperature, reason = %s.reason, "skipped degenerate group");
                any_degenerate = true;
                skipped.push(s);
            }
        }
    }

    let per_group: Vec<_> = fits.iter().map(|f| f.metrics).collect();
    let Some(metrics) = aggregate(&per_group) else {
        return Err(if any_degenerate {
            PipelineError::DegenerateFit(format!(
                "every temperature group with enough data is degenerate for the {} model.",
                opts.model.label()
            ))
        } else {
            PipelineError::InsufficientData(format!(
                "no temperature group has at least {MIN_VALID_ROWS} rows with numeric time and microbe ({} group(s) found).",
                groups.len()
            ))
        });
    };

    info!(
        model = opts.model.label(),
        groups = fits.len(),
        skipped = skipped.len(),
        rmse = metrics.rmse,
        r2 = metrics.r2,
        "fit complete"
    );

    Ok(FitResult {
        model: opts.model,
        label: opts.model.label().to_string(),
        groups: fits,
        metrics,
        fitted_data,
        skipped,
    })
}

fn fit_group(group: &TemperatureGroup, opts: &FitOptions) -> Result<GroupOutcome, PipelineError> {
    let temperature = group.temperature;
    let (times, ys): (Vec<f64>, Vec<f64>) = group
        .rows
        .iter()
        .filter_map(|r| Some((r.time()?, r.microbe()?)))
        .unzip();
    let n_valid = times.len();

    if n_valid < MIN_VALID_ROWS {
        return Ok(GroupOutcome::Insufficient(SkippedGroup {
            temperature,
            reason: format!("only {n_valid} valid row(s); need {MIN_VALID_ROWS}."),
        }));
    }

    let degenerate = |reason: &str| {
        GroupOutcome::Degenerate(SkippedGroup {
            temperature,
            reason: reason.to_string(),
        })
    };

    let (params, fitted): (ModelParams, Vec<f64>) = match opts.model {
        ModelKind::Linear => {
            let Some(line) = simple_linear_regression(&times, &ys) else {
                return Ok(degenerate("all times are identical; slope is undefined."));
            };
            let params = ModelParams::Linear {
                slope: line.slope,
                intercept: line.intercept,
            };
            let fitted = predict_rows(&params, &group.rows);
            (params, fitted)
        }
        ModelKind::Weibull | ModelKind::WeibullLs => {
            let Some(mut w) = heuristic(&times, &ys, opts.weibull_shape) else {
                return Ok(degenerate("Weibull scale is not positive (max time <= 0)."));
            };
            if opts.model == ModelKind::WeibullLs {
                w = refine_least_squares(&times, &ys, w);
            }
            let params = ModelParams::Weibull {
                delta: w.delta,
                p: w.p,
                n_max: w.n_max,
                n_min: w.n_min,
            };
            let fitted = predict_rows(&params, &group.rows);
            (params, fitted)
        }
        ModelKind::Knn => {
            let train: Vec<(f64, f64)> = times.iter().copied().zip(ys.iter().copied()).collect();
            let k = KNN_K.min(n_valid);
            let fitted = group
                .rows
                .iter()
                .map(|r| r.time().map_or(f64::NAN, |t| knn_predict(&train, t, k)))
                .collect();
            (ModelParams::Knn { k }, fitted)
        }
        ModelKind::Ann | ModelKind::Svr | ModelKind::Gpr | ModelKind::Tree => {
            let bound = noise_bound(opts.model);
            let seed = group_seed(opts.seed, opts.model, temperature);
            let fitted = simulate(&group.rows, bound, seed)?;
            (
                ModelParams::Simulated {
                    noise_bound: bound,
                    seed,
                },
                fitted,
            )
        }
    };

    // Metrics over the valid subset only.
    let (observed, predicted): (Vec<f64>, Vec<f64>) = group
        .rows
        .iter()
        .zip(&fitted)
        .filter(|(r, _)| r.is_valid_for_fit())
        .filter_map(|(r, &f)| Some((r.microbe()?, f)))
        .unzip();
    let metrics = group_metrics(&observed, &predicted);

    let mut rows: Vec<Row> = group
        .rows
        .iter()
        .zip(&fitted)
        .map(|(r, &f)| r.with_fitted(f))
        .collect();
    rows.sort_by(compare_time);

    Ok(GroupOutcome::Fitted {
        fit: GroupFit {
            temperature,
            params,
            metrics,
            n_rows: group.rows.len(),
            n_valid,
        },
        rows,
    })
}

/// Analytic prediction for every row; rows without a finite `time` get `NaN`.
fn predict_rows(params: &ModelParams, rows: &[Row]) -> Vec<f64> {
    rows.iter()
        .map(|r| r.time().and_then(|t| predict(params, t)).unwrap_or(f64::NAN))
        .collect()
}

/// Ascending by time; rows without a finite time sort last (stable).
fn compare_time(a: &Row, b: &Row) -> CmpOrdering {
    match (a.time(), b.time()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MICROBE_FITTED;
    use crate::io::ingest::parse;

    fn rows(text: &str) -> Vec<Row> {
        parse(text).unwrap().rows
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let mut text = String::from("time,temperature,microbe\n");
        for x in 0..8 {
            let x = f64::from(x) * 0.75;
            text.push_str(&format!("{x},25,{}\n", 2.0 * x + 3.0));
        }
        let fit = Fitter::new().fit(&rows(&text), &FitOptions::new(ModelKind::Linear)).unwrap();

        assert_eq!(fit.groups.len(), 1);
        let ModelParams::Linear { slope, intercept } = fit.groups[0].params else {
            panic!("expected linear params");
        };
        assert!((slope - 2.0).abs() < 1e-6);
        assert!((intercept - 3.0).abs() < 1e-6);
        assert!((fit.metrics.r2 - 1.0).abs() < 1e-6);
        assert!(fit.metrics.rmse < 1e-6);
        assert!(fit.metrics.mae < 1e-6);
        assert_eq!(fit.label, "linear");
    }

    #[test]
    fn identical_counts_give_r2_of_one() {
        let text = "time,temperature,microbe\n0,20,0.1\n1,20,0.1\n2,20,0.1\n";
        let fit = fit_rows(&rows(text), &FitOptions::new(ModelKind::Linear)).unwrap();
        assert_eq!(fit.groups[0].metrics.r2, 1.0);
        assert_eq!(fit.metrics.r2, 1.0);
    }

    #[test]
    fn insufficient_data_is_an_error_not_a_panic() {
        let text = "time,temperature,microbe\n0,20,5\n0,30,4\n1,40,x\n2,40,3\n3,,9\n";
        let err = fit_rows(&rows(text), &FitOptions::new(ModelKind::Linear)).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)), "{err}");

        let err = fit_rows(&[], &FitOptions::new(ModelKind::Weibull)).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn degenerate_groups_are_skipped() {
        let text = "time,temperature,microbe\n5,20,1\n5,20,2\n0,30,10\n1,30,8\n2,30,6\n";
        let fit = fit_rows(&rows(text), &FitOptions::new(ModelKind::Linear)).unwrap();
        assert_eq!(fit.groups.len(), 1);
        assert_eq!(fit.groups[0].temperature, 30.0);
        assert_eq!(fit.skipped.len(), 1);
        assert_eq!(fit.skipped[0].temperature, 20.0);
        assert_eq!(fit.fitted_data.len(), 3);

        let only_degenerate = "time,temperature,microbe\n5,20,1\n5,20,2\n";
        let err = fit_rows(&rows(only_degenerate), &FitOptions::new(ModelKind::Linear)).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateFit(_)));
    }

    #[test]
    fn non_positive_weibull_shape_is_rejected_up_front() {
        let text = "time,temperature,microbe\n0,20,100\n1,20,80\n2,20,70\n";
        let mut opts = FitOptions::new(ModelKind::Weibull);
        opts.weibull_shape = 0.0;
        let err = fit_rows(&rows(text), &opts).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOption(_)), "{err}");
        assert_eq!(err.exit_code(), 2);

        // The shape only matters to the Weibull kinds.
        opts.model = ModelKind::Linear;
        assert!(fit_rows(&rows(text), &opts).is_ok());
    }

    #[test]
    fn large_time_offsets_still_fit() {
        let text = "time,temperature,microbe\n1000000,20,5\n1000001,20,7\n1000002,20,9\n";
        let fit = fit_rows(&rows(text), &FitOptions::new(ModelKind::Linear)).unwrap();
        let ModelParams::Linear { slope, .. } = fit.groups[0].params else {
            panic!("expected linear params");
        };
        assert_eq!(slope, 2.0);
        assert!(fit.skipped.is_empty());
        assert!(fit.metrics.rmse < 1e-6);
    }

    #[test]
    fn two_temperatures_end_to_end() {
        let text = "time,temperature,microbe\n\
                    2,30,50\n0,30,90\n1,30,75\n\
                    0,20,100\n1,20,80\n2,20,70\n";
        let input = rows(text);
        let fit = fit_rows(&input, &FitOptions::new(ModelKind::Linear)).unwrap();

        assert_eq!(fit.parameters().count(), 2);
        assert_eq!(fit.fitted_data.len(), input.len());

        let mean_r2 = (fit.groups[0].metrics.r2 + fit.groups[1].metrics.r2) / 2.0;
        assert!((fit.metrics.r2 - mean_r2).abs() < 1e-12);

        // Ascending temperature, then ascending time.
        let order: Vec<(f64, f64)> = fit
            .fitted_data
            .iter()
            .map(|r| (r.temperature().unwrap(), r.time().unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![(20.0, 0.0), (20.0, 1.0), (20.0, 2.0), (30.0, 0.0), (30.0, 1.0), (30.0, 2.0)]
        );
        assert!(fit.fitted_data.iter().all(|r| r.microbe_fitted().is_some()));
    }

    #[test]
    fn every_group_row_gets_a_prediction() {
        // The second row has no usable count but still receives a fitted value.
        let text = "time,temperature,microbe\n0,20,100\n1,20,\n2,20,60\n4,20,20\n";
        let fit = fit_rows(&rows(text), &FitOptions::new(ModelKind::Weibull)).unwrap();

        assert_eq!(fit.groups[0].n_rows, 4);
        assert_eq!(fit.groups[0].n_valid, 3);
        assert!(fit.fitted_data.iter().all(|r| r.microbe_fitted().is_some()));

        let ModelParams::Weibull { delta, p, n_max, n_min } = fit.groups[0].params else {
            panic!("expected Weibull params");
        };
        assert!((delta - 3.2).abs() < 1e-12);
        assert_eq!(p, DEFAULT_WEIBULL_SHAPE);
        assert_eq!((n_max, n_min), (100.0, 20.0));
    }

    #[test]
    fn weibull_least_squares_is_no_worse_than_heuristic() {
        let text = "time,temperature,microbe\n0,20,5\n1,20,9\n2,20,30\n3,20,55\n4,20,70\n6,20,78\n8,20,80\n";
        let input = rows(text);
        let heuristic = fit_rows(&input, &FitOptions::new(ModelKind::Weibull)).unwrap();
        let refined = fit_rows(&input, &FitOptions::new(ModelKind::WeibullLs)).unwrap();
        assert!(refined.metrics.rmse <= heuristic.metrics.rmse + 1e-12);
        assert_eq!(refined.label, "weibull-ls");
    }

    #[test]
    fn simulated_and_knn_models_fit_every_group() {
        let text = "time,temperature,microbe\n0,20,100\n1,20,80\n2,20,70\n0,30,90\n1,30,60\n";
        let input = rows(text);
        for kind in [ModelKind::Ann, ModelKind::Svr, ModelKind::Gpr, ModelKind::Tree, ModelKind::Knn] {
            let fit = fit_rows(&input, &FitOptions::new(kind)).unwrap();
            assert_eq!(fit.groups.len(), 2, "{kind:?}");
            assert_eq!(fit.fitted_data.len(), 5);
            assert!(fit.metrics.rmse.is_finite());

            let again = fit_rows(&input, &FitOptions::new(kind)).unwrap();
            assert_eq!(fit, again, "{kind:?} should be deterministic");
        }
    }

    #[test]
    fn rows_without_temperature_are_out_of_fit_scope() {
        let text = "time,temperature,microbe\n0,20,10\n1,20,8\n2,,6\n";
        let fit = fit_rows(&rows(text), &FitOptions::new(ModelKind::Linear)).unwrap();
        assert_eq!(fit.fitted_data.len(), 2);
        let json = serde_json::to_value(&fit.fitted_data[0]).unwrap();
        assert!(json.get(MICROBE_FITTED).is_some());
    }

    #[test]
    fn concurrent_fit_is_rejected() {
        let fitter = Fitter::new();
        let text = "time,temperature,microbe\n0,20,10\n1,20,8\n";
        let input = rows(text);

        let guard = fitter.try_begin().unwrap();
        assert!(fitter.is_busy());
        let err = fitter.fit(&input, &FitOptions::new(ModelKind::Linear)).unwrap_err();
        assert!(matches!(err, PipelineError::Busy));

        drop(guard);
        assert!(!fitter.is_busy());
        assert!(fitter.fit(&input, &FitOptions::new(ModelKind::Linear)).is_ok());
        assert!(!fitter.is_busy());
    }
}
