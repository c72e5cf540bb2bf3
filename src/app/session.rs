//! Interactive session state: the loaded dataset and its latest fit.
//!
//! Both are replaced wholesale. Loading new data discards the previous fit,
//! and a failed fit leaves no stale result behind.

use tracing::info;

use crate::data::summary::{Summary, summarize};
use crate::domain::FitResult;
use crate::error::PipelineError;
use crate::fit::{FitOptions, Fitter};
use crate::io::ingest::IngestedData;

#[derive(Debug, Default)]
pub struct Session {
    ingest: Option<IngestedData>,
    fit: Option<FitResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dataset. Any previous fit is cleared.
    pub fn load(&mut self, ingest: IngestedData) {
        info!(rows = ingest.rows_used(), "session data loaded");
        self.ingest = Some(ingest);
        self.fit = None;
    }

    /// Fit the loaded rows. On error the previous fit is cleared and the error returned.
    pub fn run_fit(&mut self, fitter: &Fitter, opts: &FitOptions) -> Result<&FitResult, PipelineError> {
        self.fit = None;
        let ingest = self.ingest.as_ref().ok_or_else(|| {
            PipelineError::InsufficientData("no data loaded.".to_string())
        })?;
        let fit = fitter.fit(&ingest.rows, opts)?;
        Ok(self.fit.insert(fit))
    }

    pub fn reset(&mut self) {
        self.ingest = None;
        self.fit = None;
    }

    pub fn ingest(&self) -> Option<&IngestedData> {
        self.ingest.as_ref()
    }

    pub fn fit(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    /// Summary of the fitted rows when a fit exists, otherwise of the raw rows.
    pub fn summary(&self) -> Option<Summary> {
        match (&self.fit, &self.ingest) {
            (Some(fit), _) => Some(summarize(&fit.fitted_data)),
            (None, Some(ingest)) => Some(summarize(&ingest.rows)),
            (None, None) => None,
        }
    }
}
