use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-level failures. Upstream and persistence failures never surface
/// here; they are absorbed where they happen.
#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded. Please try again later.")]
    Throttled { retry_after_secs: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidInput,
    Throttled,
    QuotaExceeded,
    InternalError,
}

impl TrendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrendError::InvalidInput(_) => ErrorKind::InvalidInput,
            TrendError::Throttled { .. } => ErrorKind::Throttled,
            TrendError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Caller-facing message. Internal details stay in the logs unless
    /// `expose_internal` is set.
    pub fn public_message(&self, expose_internal: bool) -> String {
        match self {
            TrendError::Internal(e) if expose_internal => format!("Internal server error: {e:#}"),
            TrendError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_body(&self, expose_internal: bool) -> ErrorBody {
        ErrorBody {
            ok: false,
            error: self.public_message(expose_internal),
            kind: self.kind(),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    pub kind: ErrorKind,
}
