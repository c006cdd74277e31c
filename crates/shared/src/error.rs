use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PREDICTION_FAILED_FALLBACK: &str = "AI request failed";
pub const PREDICTION_CRASH_PREFIX: &str = "AI request crashed: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Upload,
    PredictionHttp,
    PredictionTransport,
}

/// Every failure the upload flow can land in. `Display` is the text shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error("{0}")]
    Upload(String),
    #[error("{message}")]
    PredictionHttp { status: u16, message: String },
    #[error("AI request crashed: {0}")]
    PredictionTransport(String),
}

impl FlowError {
    pub fn http(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| PREDICTION_FAILED_FALLBACK.to_string());
        Self::PredictionHttp { status, message }
    }

    pub fn transport(description: impl Into<String>) -> Self {
        Self::PredictionTransport(description.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Upload(_) => ErrorKind::Upload,
            FlowError::PredictionHttp { .. } => ErrorKind::PredictionHttp,
            FlowError::PredictionTransport(_) => ErrorKind::PredictionTransport,
        }
    }
}
