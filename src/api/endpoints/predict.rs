//! Prediction endpoint — the full screening round trip.
//!
//! `POST /api/predict` — normalize the submitted vitals, decode the
//! image attachments, invoke the external predictor once, normalize
//! its response, and persist the report. Nothing is persisted when the
//! predictor fails.

use axum::extract::State;
use axum::Extension;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::report as report_repo;
use crate::models::{NewImage, Report};
use crate::predictor::{Features, ImagePayload, PredictionRequest};
use crate::screening::{self, RawVitals, ResultBasis, RiskLevel, ValidationError};

/// Maximum image attachments per prediction.
const MAX_IMAGES: usize = 3;
/// Maximum decoded image size in bytes (4 MB).
const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub vitals: RawVitals,
    #[serde(rename = "reportName")]
    pub report_name: Option<String>,
    /// Base64 data URLs (e.g. `data:image/jpeg;base64,/9j/...`).
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub report_id: Uuid,
    pub risk: RiskLevel,
    pub probability: f64,
    pub basis: ResultBasis,
    pub recommendation: String,
    pub report_name: String,
}

/// `POST /api/predict` — run one screening and store the report.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let vitals = payload.vitals.normalize()?;
    let attachments = decode_attachments(&payload.images)?;

    let request = PredictionRequest {
        features: Features::from(&vitals),
        images: attachments
            .iter()
            .map(|image| ImagePayload {
                content_type: image.content_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.data),
            })
            .collect(),
    };

    // External call runs without the DB lock held.
    let raw = ctx.predictor.predict(&request).await?;
    let result = screening::normalize(&raw);

    let report = Report::new(
        user.user_id,
        payload.report_name,
        vitals,
        result,
        attachments.iter().map(NewImage::metadata).collect(),
    );

    {
        let conn = ctx.db.lock().await;
        report_repo::insert_report(&conn, &report, &attachments)?;
    }

    tracing::info!(
        report_id = %report.id,
        risk = %report.result.risk,
        basis = ?report.result.basis,
        images = attachments.len(),
        "stored screening report"
    );

    Ok(Json(PredictResponse {
        report_id: report.id,
        risk: report.result.risk,
        probability: report.result.probability,
        basis: report.result.basis,
        recommendation: report.result.recommendation.clone(),
        report_name: report.report_name.clone(),
    }))
}

fn decode_attachments(images: &[String]) -> Result<Vec<NewImage>, ApiError> {
    if images.len() > MAX_IMAGES {
        return Err(invalid_images(format!(
            "at most {MAX_IMAGES} images per prediction, got {}",
            images.len()
        )));
    }

    let mut attachments = Vec::with_capacity(images.len());
    for (idx, data_url) in images.iter().enumerate() {
        let bytes = decode_data_url(data_url)
            .map_err(|reason| invalid_images(format!("image {}: {reason}", idx + 1)))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(invalid_images(format!(
                "image {} exceeds 4 MB size limit ({} bytes)",
                idx + 1,
                bytes.len()
            )));
        }
        let content_type = detect_content_type(&bytes).ok_or_else(|| {
            invalid_images(format!("image {}: expected JPEG or PNG", idx + 1))
        })?;
        attachments.push(NewImage::new(content_type.to_string(), bytes));
    }
    Ok(attachments)
}

fn invalid_images(reason: String) -> ApiError {
    ApiError::Validation(ValidationError::Invalid {
        field: "images",
        reason,
    })
}

fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| format!("base64 decode failed: {e}"))
}

/// Detect the content type from magic bytes.
fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        Some("image/jpeg")
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        Some("image/png")
    } else {
        None
    }
}
