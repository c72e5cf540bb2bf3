//! Data-driven fitted values: KNN regression and simulated baselines.
//!
//! The simulated kinds (ANN, SVR, GPR, decision tree) do not estimate anything:
//! each fitted value is the observed count times `1 + ε`, with `ε` drawn from a
//! normal distribution clipped to a per-kind bound. They exist as labeled
//! placeholders for comparison and carry no statistical meaning. Draws are
//! seeded so repeated runs produce identical output.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{ModelKind, Row};
use crate::error::PipelineError;

/// Neighbours used by the KNN model (capped by the number of valid rows).
pub const KNN_K: usize = 3;

/// Maximum relative noise for a simulated kind (`0` for non-simulated kinds).
pub fn noise_bound(kind: ModelKind) -> f64 {
    match kind {
        ModelKind::Ann => 0.04,
        ModelKind::Svr => 0.06,
        ModelKind::Gpr => 0.03,
        ModelKind::Tree => 0.08,
        _ => 0.0,
    }
}

/// Per-group seed derived from the run seed, the model kind and the temperature.
pub fn group_seed(seed: u64, kind: ModelKind, temperature: f64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    kind.hash(&mut hasher);
    (temperature + 0.0).to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Noisy copies of the observed counts. Rows without a finite `microbe` get `NaN`.
pub fn simulate(rows: &[Row], bound: f64, seed: u64) -> Result<Vec<f64>, PipelineError> {
    let normal = Normal::new(0.0, bound / 2.0)
        .map_err(|e| PipelineError::DegenerateFit(format!("noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);

    Ok(rows
        .iter()
        .map(|row| match row.microbe() {
            Some(y) => {
                let eps = normal.sample(&mut rng).clamp(-bound, bound);
                y * (1.0 + eps)
            }
            None => f64::NAN,
        })
        .collect())
}

/// Mean `y` of the `k` training points nearest to `t` (ties broken by position).
pub fn knn_predict(train: &[(f64, f64)], t: f64, k: usize) -> f64 {
    if train.is_empty() || k == 0 || !t.is_finite() {
        return f64::NAN;
    }
    let mut order: Vec<(f64, usize)> = train
        .iter()
        .enumerate()
        .map(|(i, &(ti, _))| ((ti - t).abs(), i))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let k = k.min(order.len());
    order.iter().take(k).map(|&(_, i)| train[i].1).sum::<f64>() / k as f64
}
