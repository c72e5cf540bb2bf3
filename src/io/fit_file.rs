//! Read/write fit report JSON files.
//!
//! A fit report is the portable record of a run:
//! - model kind and per-temperature parameters
//! - per-group and mean metrics
//! - skipped groups with reasons
//!
//! The schema is defined by `domain::FitReportFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::domain::{FitReportFile, FitResult};
use crate::error::PipelineError;

pub const TOOL_NAME: &str = "mfit";

/// Build the report for `fit`, tagging it with the input's name.
pub fn build_report(fit: &FitResult, source: &str) -> FitReportFile {
    FitReportFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        source: source.to_string(),
        model: fit.model,
        label: fit.label.clone(),
        groups: fit.groups.clone(),
        metrics: fit.metrics,
        skipped: fit.skipped.clone(),
        fitted_rows: fit.fitted_data.len(),
    }
}

/// Write a fit report JSON file.
pub fn write_fit_json(path: &Path, fit: &FitResult, source: &str) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &build_report(fit, source))?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), "wrote fit report");
    Ok(())
}

/// Read a fit report JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitReportFile, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitMetrics, GroupFit, ModelKind, ModelParams, SkippedGroup};

    #[test]
    fn report_survives_a_file_round_trip() {
        let metrics = FitMetrics {
            rmse: 0.5,
            mae: 0.25,
            r2: 0.9,
        };
        let fit = FitResult {
            model: ModelKind::Weibull,
            label: "weibull".into(),
            groups: vec![GroupFit {
                temperature: 25.0,
                params: ModelParams::Weibull {
                    delta: 8.0,
                    p: 1.2,
                    n_max: 100.0,
                    n_min: 2.0,
                },
                metrics,
                n_rows: 6,
                n_valid: 5,
            }],
            metrics,
            fitted_data: Vec::new(),
            skipped: vec![SkippedGroup {
                temperature: 4.0,
                reason: "only 1 valid row(s); need 2.".into(),
            }],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&path, &fit, "growth.csv").unwrap();

        let report = read_fit_json(&path).unwrap();
        assert_eq!(report.tool, TOOL_NAME);
        assert_eq!(report.source, "growth.csv");
        assert_eq!(report.model, ModelKind::Weibull);
        assert_eq!(report.groups, fit.groups);
        assert_eq!(report.skipped, fit.skipped);
        assert_eq!(report.metrics, metrics);
    }

    #[test]
    fn report_with_overflowing_metrics_reads_back() {
        let fit = FitResult {
            model: ModelKind::Linear,
            label: "linear".into(),
            groups: Vec::new(),
            metrics: FitMetrics {
                rmse: f64::INFINITY,
                mae: f64::INFINITY,
                r2: f64::NAN,
            },
            fitted_data: Vec::new(),
            skipped: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&path, &fit, "huge.csv").unwrap();

        let report = read_fit_json(&path).unwrap();
        assert!(report.metrics.rmse.is_nan());
        assert!(report.metrics.r2.is_nan());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_final_write_is_reported() {
        let fit = FitResult {
            model: ModelKind::Linear,
            label: "linear".into(),
            groups: Vec::new(),
            metrics: FitMetrics::default(),
            fitted_data: Vec::new(),
            skipped: Vec::new(),
        };
        // The report fits in the write buffer, so only the flush hits the full device.
        let err = write_fit_json(Path::new("/dev/full"), &fit, "growth.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }), "{err}");
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_fit_json(&path), Err(PipelineError::Json(_))));
        assert!(matches!(
            read_fit_json(&dir.path().join("absent.json")),
            Err(PipelineError::Io { .. })
        ));
    }
}
