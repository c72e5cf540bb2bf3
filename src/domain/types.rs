//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - sent to the chat relay as context
//! - exported to JSON/CSV

use std::path::PathBuf;

use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Canonical column names for the three semantic fields (plus the fitted output).
pub const TIME: &str = "time";
pub const TEMPERATURE: &str = "temperature";
pub const MICROBE: &str = "microbe";
pub const MICROBE_FITTED: &str = "microbe_fitted";

/// A single parsed CSV cell.
///
/// Empty cells are kept as `Text("")` rather than being treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// The numeric value, if this cell holds a finite number.
    pub fn as_finite(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One data record: an ordered mapping from column name to value.
///
/// Recognized headers have already been renamed to `time` / `temperature` /
/// `microbe` by the ingestor; other columns pass through untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
    microbe_fitted: Option<f64>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Later duplicates are ignored by lookups.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Finite numeric value of a column (absent, text and non-finite yield `None`).
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_finite)
    }

    pub fn time(&self) -> Option<f64> {
        self.number(TIME)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.number(TEMPERATURE)
    }

    pub fn microbe(&self) -> Option<f64> {
        self.number(MICROBE)
    }

    pub fn microbe_fitted(&self) -> Option<f64> {
        self.microbe_fitted
    }

    /// `true` iff `time` and `microbe` are both finite numbers.
    pub fn is_valid_for_fit(&self) -> bool {
        self.time().is_some() && self.microbe().is_some()
    }

    /// Copy of this row carrying a fitted value. Non-finite predictions are stored as `None`.
    pub fn with_fitted(&self, fitted: f64) -> Row {
        let mut out = self.clone();
        out.microbe_fitted = fitted.is_finite().then_some(fitted);
        out
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.microbe_fitted.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        if let Some(fitted) = self.microbe_fitted {
            map.serialize_entry(MICROBE_FITTED, &fitted)?;
        }
        map.end()
    }
}

/// Which model to fit per temperature group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Ordinary least squares line.
    Linear,
    /// Weibull survival curve with heuristic parameters.
    Weibull,
    /// Weibull survival curve refined by damped Gauss-Newton.
    WeibullLs,
    /// Simulated neural-network baseline.
    Ann,
    /// Simulated support-vector-regression baseline.
    Svr,
    /// Simulated Gaussian-process baseline.
    Gpr,
    /// k-nearest-neighbour regression on time.
    Knn,
    /// Simulated decision-tree baseline.
    Tree,
}

impl ModelKind {
    pub const ALL: [ModelKind; 8] = [
        ModelKind::Linear,
        ModelKind::Weibull,
        ModelKind::WeibullLs,
        ModelKind::Ann,
        ModelKind::Svr,
        ModelKind::Gpr,
        ModelKind::Knn,
        ModelKind::Tree,
    ];

    /// Short code used on the wire and in report files.
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Weibull => "weibull",
            ModelKind::WeibullLs => "weibull-ls",
            ModelKind::Ann => "ann",
            ModelKind::Svr => "svr",
            ModelKind::Gpr => "gpr",
            ModelKind::Knn => "knn",
            ModelKind::Tree => "tree",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear (OLS)",
            ModelKind::Weibull => "Weibull (heuristic)",
            ModelKind::WeibullLs => "Weibull (least squares)",
            ModelKind::Ann => "ANN (simulated)",
            ModelKind::Svr => "SVR (simulated)",
            ModelKind::Gpr => "GPR (simulated)",
            ModelKind::Knn => "KNN",
            ModelKind::Tree => "Decision tree (simulated)",
        }
    }

    /// Simulated kinds add bounded noise to the observed signal instead of estimating anything.
    pub fn is_simulated(self) -> bool {
        matches!(
            self,
            ModelKind::Ann | ModelKind::Svr | ModelKind::Gpr | ModelKind::Tree
        )
    }
}

/// Fitted parameters for one temperature group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelParams {
    Linear {
        slope: f64,
        intercept: f64,
    },
    Weibull {
        /// Scale (time to reach `1 - 1/e` of the transition).
        delta: f64,
        /// Shape.
        p: f64,
        n_max: f64,
        n_min: f64,
    },
    Knn {
        k: usize,
    },
    Simulated {
        noise_bound: f64,
        seed: u64,
    },
}

/// Goodness-of-fit metrics.
///
/// Non-finite values (overflowing residuals) are written as `null` and read back as `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitMetrics {
    #[serde(with = "nullable_f64")]
    pub rmse: f64,
    #[serde(with = "nullable_f64")]
    pub mae: f64,
    #[serde(with = "nullable_f64")]
    pub r2: f64,
}

mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Fit output for a single temperature group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFit {
    pub temperature: f64,
    pub params: ModelParams,
    pub metrics: FitMetrics,
    /// Rows in the group (valid or not).
    pub n_rows: usize,
    /// Rows with finite `time` and `microbe`.
    pub n_valid: usize,
}

/// A temperature group that did not contribute to the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub temperature: f64,
    pub reason: String,
}

/// Result of fitting one model across all temperature groups.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model: ModelKind,
    pub label: String,
    /// Per-temperature fits, ascending by temperature.
    pub groups: Vec<GroupFit>,
    /// Arithmetic mean of the per-group metrics.
    pub metrics: FitMetrics,
    /// Rows of every fitted group, ascending by temperature then time.
    pub fitted_data: Vec<Row>,
    pub skipped: Vec<SkippedGroup>,
}

impl FitResult {
    /// `(temperature, params)` pairs in ascending temperature order.
    pub fn parameters(&self) -> impl Iterator<Item = (f64, &ModelParams)> {
        self.groups.iter().map(|g| (g.temperature, &g.params))
    }
}

/// Format a temperature as a mapping key (`20`, `22.5`; `-0` is folded into `0`).
pub fn temperature_key(t: f64) -> String {
    format!("{}", t + 0.0)
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub model: ModelKind,
    /// Weibull shape `p` used by the heuristic (and as the least-squares start).
    pub weibull_shape: f64,
    /// Seed for simulated baselines.
    pub seed: u64,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// A saved fit report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub model: ModelKind,
    pub label: String,
    pub groups: Vec<GroupFit>,
    pub metrics: FitMetrics,
    pub skipped: Vec<SkippedGroup>,
    pub fitted_rows: usize,
}
