use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ScanStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub image_url: String,
}

/// Successful inference response. Extra fields the service echoes back
/// (`ok`, `imageUrl`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probs: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Body of a non-2xx inference response. The service reports `detail`
/// for its own HTTP exceptions; gateways in front of it use `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl PredictErrorBody {
    pub fn message(self) -> Option<String> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Some(error);
        }
        match self.detail {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceHealth {
    pub ok: bool,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub model_loaded: bool,
}

/// Columns written to a scan record once a prediction lands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanPredictionUpdate {
    pub prediction_label: String,
    pub prediction_score: f64,
    pub prediction_json: Option<BTreeMap<String, f64>>,
    pub status: ScanStatus,
}

impl ScanPredictionUpdate {
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            prediction_label: result.label.clone(),
            prediction_score: result.confidence,
            prediction_json: result.probs.clone(),
            status: ScanStatus::Done,
        }
    }
}
