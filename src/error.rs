//! Error types.
//!
//! The library reports typed [`PipelineError`]s. The binary converts them into an
//! [`AppError`] carrying the process exit code:
//!
//! - `2`: unreadable or malformed input (CSV format, I/O, invalid options)
//! - `3`: not enough data to fit
//! - `4`: fit/runtime failures (degenerate fit, relay errors, concurrent fit)

use thiserror::Error;

/// Errors surfaced by the ingest -> fit pipeline and the chat client.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The CSV is too short or its header has no recognizable columns.
    #[error("CSV format error: {0}")]
    Format(String),

    /// A fit option is outside its valid range.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// No temperature group has at least two rows with finite `time` and `microbe`.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Every group with enough data was numerically degenerate.
    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    /// A fit is already running on this fitter.
    #[error("A fit is already in progress.")]
    Busy,

    /// The chat relay could not be reached or answered with an error.
    #[error("Chat relay error: {0}")]
    Network(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Format(_) | PipelineError::InvalidOption(_) | PipelineError::Io { .. } => 2,
            PipelineError::InsufficientData(_) => 3,
            PipelineError::DegenerateFit(_)
            | PipelineError::Busy
            | PipelineError::Network(_)
            | PipelineError::Json(_) => 4,
        }
    }
}

/// Error returned from the binary entry point.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
