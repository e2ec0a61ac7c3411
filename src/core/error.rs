use thiserror::Error;

use crate::engine::EngineError;

/// Outcome recorded per statement of a successfully executed batch prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The statement ran; the engine does not report affected row counts.
    SuccessNoInfo,
    Count(u64),
}

#[derive(Error, Debug)]
pub enum FgdbError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("unknown column {0}")]
    UnknownColumn(String),
    #[error("Table '{0}' not found")]
    TableNotFound(String),
    #[error("Native engine error: {0}")]
    Native(#[from] EngineError),
    #[error("batch execution failed at statement {index}: {message}")]
    Batch {
        /// 1-based position of the failing statement.
        index: usize,
        message: String,
        /// Outcomes of the statements that ran before the failure.
        update_counts: Vec<BatchOutcome>,
    },
    #[error("Transaction error: {0}")]
    Transaction(String),
    #[error("Geometry decode error: {0}")]
    GeometryDecode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{0} is closed")]
    Closed(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FgdbError {
    /// True when the underlying engine reported a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Native(e) => e.is_not_found(),
            Self::TableNotFound(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FgdbError>;
