//! Prediction invoker — one typed request, two transports.
//!
//! The external predictor is reachable either as an HTTP endpoint or
//! as a spawned local process reading JSON on stdin. Both transports
//! share the request shape, the single-attempt/no-retry policy, and
//! one configurable timeout bound. The response is an untrusted JSON
//! mapping; interpreting it is the result normalizer's job.

pub mod http;
pub mod subprocess;

pub use http::HttpPredictor;
pub use subprocess::SubprocessPredictor;

use serde::Serialize;
use serde_json::Value;

use crate::config::PredictorConfig;
use crate::screening::VitalsInput;

/// Numeric feature vector sent to the predictor. Key names are the
/// predictor's training contract and must not change.
#[derive(Debug, Clone, Serialize)]
pub struct Features {
    pub age: f64,
    pub gender: f64,
    pub weight: f64,
    pub height: f64,
    #[serde(rename = "smokingStatus")]
    pub smoking_status: f64,
    #[serde(rename = "alcoholConsumption")]
    pub alcohol_consumption: f64,
    pub cholesterol: f64,
    pub bp: f64,
    pub sugar: f64,
    #[serde(rename = "chestPainType")]
    pub chest_pain: f64,
}

impl From<&VitalsInput> for Features {
    fn from(vitals: &VitalsInput) -> Self {
        Features {
            age: vitals.age,
            gender: vitals.gender.as_code(),
            weight: vitals.weight_kg,
            height: vitals.height_cm,
            smoking_status: flag(vitals.smoker),
            alcohol_consumption: flag(vitals.alcohol),
            cholesterol: vitals.cholesterol,
            bp: vitals.systolic_bp,
            sugar: flag(vitals.fasting_blood_sugar_high),
            chest_pain: flag(vitals.chest_pain),
        }
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// An image attachment forwarded to the predictor, base64-encoded.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub content_type: String,
    pub data: String,
}

/// The request both transports serialize and send.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub features: Features,
    pub images: Vec<ImagePayload>,
}

/// External-dependency failure. Single attempt, fail-fast — there is
/// no retry path.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Predictor timed out after {0}s")]
    Timeout(u64),
    #[error("Predictor unavailable: {0}")]
    Unavailable(String),
}

/// Transport-agnostic predictor handle held in the API context.
pub enum PredictorClient {
    Http(HttpPredictor),
    Subprocess(SubprocessPredictor),
    Mock(MockPredictor),
}

impl PredictorClient {
    /// Build the transport the configuration selects.
    pub fn from_config(config: &PredictorConfig) -> Self {
        match config {
            PredictorConfig::Http { url, timeout_secs } => {
                PredictorClient::Http(HttpPredictor::new(url, *timeout_secs))
            }
            PredictorConfig::Subprocess {
                command,
                timeout_secs,
            } => PredictorClient::Subprocess(SubprocessPredictor::new(command, *timeout_secs)),
        }
    }

    /// One attempt against the external predictor, bounded by the
    /// configured timeout. Returns the raw, untrusted JSON mapping.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<Value, PredictorError> {
        match self {
            PredictorClient::Http(client) => client.predict(request).await,
            PredictorClient::Subprocess(client) => client.predict(request).await,
            PredictorClient::Mock(mock) => mock.predict(),
        }
    }
}

/// A predictor reply carrying an `error` key is a failure, not a
/// result — both real transports reject it the same way.
pub(crate) fn reject_error_reply(raw: Value) -> Result<Value, PredictorError> {
    if let Some(message) = raw.get("error").and_then(Value::as_str) {
        return Err(PredictorError::Unavailable(format!(
            "predictor reported: {message}"
        )));
    }
    Ok(raw)
}

/// Canned predictor for tests — returns a fixed response or failure.
pub struct MockPredictor {
    outcome: MockOutcome,
}

enum MockOutcome {
    Respond(Value),
    Timeout(u64),
    Unavailable(String),
}

impl MockPredictor {
    pub fn respond(value: Value) -> Self {
        Self {
            outcome: MockOutcome::Respond(value),
        }
    }

    pub fn timeout(secs: u64) -> Self {
        Self {
            outcome: MockOutcome::Timeout(secs),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            outcome: MockOutcome::Unavailable(reason.to_string()),
        }
    }

    fn predict(&self) -> Result<Value, PredictorError> {
        match &self.outcome {
            MockOutcome::Respond(value) => Ok(value.clone()),
            MockOutcome::Timeout(secs) => Err(PredictorError::Timeout(*secs)),
            MockOutcome::Unavailable(reason) => Err(PredictorError::Unavailable(reason.clone())),
        }
    }
}
