//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parsed CSV rows (`Row`, `Value`) and the canonical column names
//! - model kinds (`ModelKind`) and run configuration (`FitConfig`)
//! - saved report files (`FitReportFile`)
//! - fit outputs (`FitResult`, `GroupFit`, `ModelParams`, `FitMetrics`)

pub mod types;

pub use types::*;
