//! HTTP transport: POST the prediction request as JSON to a remote
//! predictor endpoint.

use serde_json::Value;

use super::{reject_error_reply, PredictionRequest, PredictorError};

pub struct HttpPredictor {
    url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpPredictor {
    /// Build a client with the timeout baked in. One client per
    /// process — reqwest pools connections internally.
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<Value, PredictorError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PredictorError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    PredictorError::Unavailable(format!("cannot reach {}", self.url))
                } else {
                    PredictorError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Unavailable(format!(
                "predictor returned {status}: {body}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| PredictorError::Unavailable(format!("unparseable response: {e}")))?;

        if !raw.is_object() {
            return Err(PredictorError::Unavailable(
                "expected a JSON object response".into(),
            ));
        }

        reject_error_reply(raw)
    }
}
