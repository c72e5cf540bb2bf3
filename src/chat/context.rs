//! Wire payloads sent to the chat relay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::summary::Summary;
use crate::domain::{FitMetrics, FitResult, ModelParams, Row, temperature_key};

/// One question plus whatever dataset context the caller has on hand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub text: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_result: Option<FitSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

impl ChatRequest {
    /// A bare question without dataset context.
    pub fn question(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
            data: None,
            fit_result: None,
            summary: None,
        }
    }

    /// Attach the first `limit` rows. An empty slice or zero limit attaches nothing.
    pub fn with_rows(mut self, rows: &[Row], limit: usize) -> Self {
        let sample: Vec<Row> = rows.iter().take(limit).cloned().collect();
        self.data = (!sample.is_empty()).then_some(sample);
        self
    }

    pub fn with_fit(mut self, fit: &FitResult) -> Self {
        self.fit_result = Some(FitSummary::from(fit));
        self
    }

    pub fn with_summary(mut self, summary: &Summary) -> Self {
        self.summary = Some(summary.clone());
        self
    }
}

/// Compact view of a fit: parameters keyed by temperature, plus the mean metrics.
///
/// Fitted rows are left out; the dataset sample already carries the raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub model: String,
    pub parameters: BTreeMap<String, ModelParams>,
    pub metrics: FitMetrics,
}

impl From<&FitResult> for FitSummary {
    fn from(fit: &FitResult) -> Self {
        Self {
            model: fit.label.clone(),
            parameters: fit
                .parameters()
                .map(|(t, p)| (temperature_key(t), p.clone()))
                .collect(),
            metrics: fit.metrics,
        }
    }
}
