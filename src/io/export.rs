//! Export fitted rows to CSV.
//!
//! One line per fitted row: every input column (first-seen order across rows)
//! followed by `microbe_fitted`. Missing cells and absent predictions are empty.

use std::path::Path;

use tracing::info;

use crate::domain::{FitResult, MICROBE_FITTED, Row};
use crate::error::PipelineError;

/// Write `fit.fitted_data` to a CSV file.
pub fn write_fitted_csv(path: &Path, fit: &FitResult) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::io(path, e.into()))?;

    let columns = column_order(&fit.fitted_data);
    let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
    header.push(MICROBE_FITTED);
    writer
        .write_record(&header)
        .map_err(|e| PipelineError::io(path, e.into()))?;

    for row in &fit.fitted_data {
        let mut record: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(ToString::to_string).unwrap_or_default())
            .collect();
        record.push(row.microbe_fitted().map(|v| v.to_string()).unwrap_or_default());
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::io(path, e.into()))?;
    }

    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    info!(path = %path.display(), rows = fit.fitted_data.len(), "wrote fitted CSV");
    Ok(())
}

fn column_order(rows: &[Row]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in rows {
        for (name, _) in row.fields() {
            if !out.iter().any(|c| c == name) {
                out.push(name.to_string());
            }
        }
    }
    out
}
