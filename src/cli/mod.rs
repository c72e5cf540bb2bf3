//! Command-line parsing for the microbial growth fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch and from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FitConfig, ModelKind};
use crate::models::DEFAULT_WEIBULL_SHAPE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mfit", version, about = "Per-temperature microbial growth curve fitter")]
pub struct Cli {
    /// Log debug events to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model per temperature group, print diagnostics, and optionally export.
    Fit(FitArgs),
    /// Print per-column statistics of a CSV (optionally including fitted values).
    Summary(SummaryArgs),
    /// Print a previously exported fit report.
    Show(ShowArgs),
    /// Ask the chat assistant about a dataset and its fit.
    Chat(ChatArgs),
    /// Check that the chat relay is reachable.
    Health,
}

/// Model selection shared by commands that fit.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Model to fit per temperature group.
    #[arg(short, long, value_enum, default_value_t = ModelKind::Linear)]
    pub model: ModelKind,

    /// Weibull shape `p` (also the starting point for weibull-ls).
    #[arg(long, default_value_t = DEFAULT_WEIBULL_SHAPE, value_parser = parse_positive)]
    pub weibull_shape: f64,

    /// Seed for the simulated baselines (ann, svr, gpr, tree).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn parse_positive(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("must be a positive number, got {raw}"))
    }
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Input CSV with time, temperature and microbe columns.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Export fitted rows (input columns plus microbe_fitted) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fit report (parameters and metrics) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

impl FitArgs {
    pub fn to_config(&self) -> FitConfig {
        FitConfig {
            csv_path: self.csv.clone(),
            model: self.model.model,
            weibull_shape: self.model.weibull_shape,
            seed: self.model.seed,
            export_csv: self.export.clone(),
            export_json: self.export_json.clone(),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Fit first and summarize the fitted rows.
    #[arg(long)]
    pub fitted: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Fit report produced by `mfit fit --export-json`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Ask a single question and exit instead of reading questions from stdin.
    #[arg(long)]
    pub message: Option<String>,
}
