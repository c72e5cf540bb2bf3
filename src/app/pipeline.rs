//! Shared "fit pipeline" logic used by the `fit`, `summary` and `chat` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV load -> summary -> per-temperature fit -> optional exports

use std::path::Path;

use tracing::info;

use crate::data::summary::{Summary, summarize};
use crate::domain::{FitConfig, FitResult};
use crate::error::PipelineError;
use crate::fit::{FitOptions, Fitter};
use crate::io::ingest::{IngestedData, load_csv};

/// All computed outputs of a single `mfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    /// Statistics of the raw input rows.
    pub summary: Summary,
    pub fit: FitResult,
}

/// Load, summarize and fit, then write any requested exports.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, PipelineError> {
    let ingest = load_csv(&config.csv_path)?;
    let run = run_fit_with_data(config, ingest)?;

    let source = source_name(&config.csv_path);
    if let Some(path) = &config.export_csv {
        crate::io::export::write_fitted_csv(path, &run.fit)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::fit_file::write_fit_json(path, &run.fit, &source)?;
    }

    Ok(run)
}

/// Run the pipeline on already-ingested data (no file access).
pub fn run_fit_with_data(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, PipelineError> {
    let summary = summarize(&ingest.rows);
    let fit = Fitter::new().fit(&ingest.rows, &FitOptions::from(config))?;

    info!(
        model = fit.label.as_str(),
        rows = ingest.rows_used(),
        fitted = fit.fitted_data.len(),
        "pipeline complete"
    );

    Ok(RunOutput { ingest, summary, fit })
}

/// File name used to tag reports (falls back to the full path).
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
