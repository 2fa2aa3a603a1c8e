//! Error types shared by every pipeline stage.

use thiserror::Error;

/// Errors raised while building models and reports.
#[derive(Error, Debug)]
pub enum TextlensError {
    /// Invalid parameter combination, detected before any numerical work.
    #[error("{0}")]
    Configuration(String),

    /// Nothing usable left after filtering.
    #[error("{0}")]
    EmptyInput(String),

    /// The decomposition or factorization failed or got a degenerate matrix.
    #[error("{0}")]
    NumericalFit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification printed by the CLI on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    EmptyInput,
    NumericalFit,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::EmptyInput => "empty-input",
            Self::NumericalFit => "numerical-fit",
            Self::Io => "io",
        }
    }
}

impl TextlensError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn fit(msg: impl Into<String>) -> Self {
        Self::NumericalFit(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::EmptyInput(_) => ErrorKind::EmptyInput,
            Self::NumericalFit(_) => ErrorKind::NumericalFit,
            Self::Io(_) | Self::Csv(_) | Self::Json(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, TextlensError>;
