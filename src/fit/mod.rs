//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one model kind per temperature group (parallel)
//! - estimate Weibull parameters (heuristic or least squares)
//! - produce data-driven fitted values (KNN, simulated baselines)
//! - compute and aggregate goodness-of-fit metrics

pub mod fitter;
pub mod metrics;
pub mod simulated;
pub mod weibull;

pub use fitter::*;
pub use metrics::*;
