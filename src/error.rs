use thiserror::Error;

use crate::domain::signal::SourceKind;

/// Failures raised by the confluence pipeline.
///
/// Per-source variants (`DataInsufficient`, `Computation`) are absorbed by the
/// engine into run warnings. The remaining variants abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfluenceError {
    #[error("{origin}: need at least {required} bars, have {available}")]
    DataInsufficient {
        origin: SourceKind,
        required: usize,
        available: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{origin}: computation failed: {detail}")]
    Computation { origin: SourceKind, detail: String },

    #[error("market metrics unavailable: {0}")]
    MissingMarketMetrics(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ConfluenceError {
    /// True for failures that only remove one source's contribution.
    pub fn is_per_source(&self) -> bool {
        matches!(
            self,
            ConfluenceError::DataInsufficient { .. } | ConfluenceError::Computation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfluenceError>;
