use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::FlowError,
    protocol::{InferenceHealth, PredictErrorBody, PredictRequest, PredictionResult},
};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_PREDICT_URL: &str = "https://tbs-4ix3.onrender.com/predict";

#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Issues exactly one inference request for `image_url`. There is no
    /// retry, timeout or cancellation: the call runs until the service
    /// answers or the transport fails.
    async fn predict(&self, image_url: &str) -> std::result::Result<PredictionResult, FlowError>;
}

pub struct HttpPredictionClient {
    http: Client,
    predict_url: Url,
}

impl HttpPredictionClient {
    pub fn new(predict_url: &str) -> Result<Self> {
        let predict_url = Url::parse(predict_url)
            .with_context(|| format!("invalid prediction endpoint '{predict_url}'"))?;
        Ok(Self {
            http: Client::new(),
            predict_url,
        })
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    /// Sibling `health` route of the prediction endpoint.
    pub fn health_url(&self) -> Result<Url> {
        self.predict_url
            .join("health")
            .context("failed to derive health url from prediction endpoint")
    }

    pub async fn health(&self) -> Result<InferenceHealth> {
        let url = self.health_url()?;
        let health = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()?
            .json::<InferenceHealth>()
            .await
            .context("malformed health response")?;
        Ok(health)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(&self, image_url: &str) -> std::result::Result<PredictionResult, FlowError> {
        debug!(endpoint = %self.predict_url, image_url, "predict: sending request");
        let response = self
            .http
            .post(self.predict_url.clone())
            .json(&PredictRequest {
                image_url: image_url.to_string(),
            })
            .send()
            .await
            .map_err(|err| FlowError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FlowError::transport(err.to_string()))?;

        if !status.is_success() {
            let error_body: PredictErrorBody = serde_json::from_slice(&body)
                .map_err(|err| FlowError::transport(err.to_string()))?;
            info!(status = status.as_u16(), "predict: service rejected request");
            return Err(FlowError::http(status.as_u16(), error_body.message()));
        }

        let result: PredictionResult =
            serde_json::from_slice(&body).map_err(|err| FlowError::transport(err.to_string()))?;
        info!(
            label = %result.label,
            confidence = result.confidence,
            "predict: received prediction"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/predict_tests.rs"]
mod tests;
