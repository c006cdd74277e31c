use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a persisted scan record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub String);

impl ScanId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    #[default]
    Idle,
    Uploading,
    Running,
    Ready,
    Error,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Idle => "idle",
            ProcessState::Uploading => "uploading",
            ProcessState::Running => "running",
            ProcessState::Ready => "ready",
            ProcessState::Error => "error",
        }
    }

    pub fn is_processing(self) -> bool {
        matches!(self, ProcessState::Uploading | ProcessState::Running)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Uploaded,
    Done,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Uploaded => "uploaded",
            ScanStatus::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "done" => ScanStatus::Done,
            _ => ScanStatus::Uploaded,
        }
    }
}
