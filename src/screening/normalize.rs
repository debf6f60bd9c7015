//! Result normalization — untrusted predictor output to one canonical
//! screening result.
//!
//! The external predictor has grown several response shapes over time
//! (fusion model, tabular-only model, legacy per-modality
//! probabilities). This module reconciles all of them behind a single
//! priority order so the rest of the system sees exactly one result
//! type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::risk::RiskLevel;

/// Which part of the predictor's response the probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultBasis {
    FusionImageTabular,
    TabularOnly,
    Unknown,
}

impl ResultBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultBasis::FusionImageTabular => "fusion_image_tabular",
            ResultBasis::TabularOnly => "tabular_only",
            ResultBasis::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fusion_image_tabular" => Some(ResultBasis::FusionImageTabular),
            "tabular_only" => Some(ResultBasis::TabularOnly),
            "unknown" => Some(ResultBasis::Unknown),
            _ => None,
        }
    }
}

/// Canonical prediction result, derived deterministically from the
/// raw predictor response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub risk: RiskLevel,
    /// Clamped to [0,1] and rounded to 2 decimal places. Risk
    /// classification happens before rounding.
    pub probability: f64,
    pub basis: ResultBasis,
    pub recommendation: String,
    /// Per-modality probabilities when the response carried them,
    /// rounded for display.
    pub text_probability: Option<f64>,
    pub image_probability: Option<f64>,
}

/// Normalize a raw predictor response.
///
/// Total function: any JSON value (including non-objects) produces a
/// result. Unrecognized keys are ignored; missing keys degrade to the
/// next rule; the empty response is Low risk at probability 0.
pub fn normalize(raw: &Value) -> ScreeningResult {
    let (probability, basis) = select_probability(raw);
    let probability = probability.clamp(0.0, 1.0);

    // An explicit label from the predictor wins when it parses into
    // the taxonomy; otherwise classify locally from the unrounded
    // probability. See DESIGN.md for the authority decision.
    let risk = external_risk(raw).unwrap_or_else(|| RiskLevel::classify(probability));

    ScreeningResult {
        risk,
        probability: round2(probability),
        basis,
        recommendation: risk.recommendation().to_string(),
        text_probability: number_field(raw, "text_prob").map(|p| round2(p.clamp(0.0, 1.0))),
        image_probability: number_field(raw, "image_prob").map(|p| round2(p.clamp(0.0, 1.0))),
    }
}

/// Probability selection, first applicable rule wins.
fn select_probability(raw: &Value) -> (f64, ResultBasis) {
    if let Some(p) = raw
        .pointer("/fusion_model/disease_prob")
        .and_then(Value::as_f64)
    {
        return (p, ResultBasis::FusionImageTabular);
    }
    if let Some(p) = raw
        .pointer("/tabular_model/probabilities/1")
        .and_then(Value::as_f64)
    {
        return (p, ResultBasis::TabularOnly);
    }
    if let Some(p) = number_field(raw, "final_prob") {
        // The response declares a combined probability without
        // declaring its inputs.
        return (p, ResultBasis::Unknown);
    }
    match (
        number_field(raw, "text_prob"),
        number_field(raw, "image_prob"),
    ) {
        (Some(text), Some(image)) => ((text + image) / 2.0, ResultBasis::FusionImageTabular),
        (Some(text), None) => (text, ResultBasis::TabularOnly),
        _ => (0.0, ResultBasis::Unknown),
    }
}

fn external_risk(raw: &Value) -> Option<RiskLevel> {
    let label = raw
        .get("risk")
        .or_else(|| raw.get("final_risk"))?
        .as_str()?;
    match RiskLevel::parse(label) {
        Some(level) => Some(level),
        None => {
            tracing::warn!(label, "ignoring unparseable risk label from predictor");
            None
        }
    }
}

/// Read a top-level field as a number, treating wrong-typed values as
/// absent.
fn number_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

fn round2(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}
