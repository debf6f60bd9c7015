//! Field normalization — heterogeneous form input to a validated
//! `VitalsInput`.
//!
//! The mobile client submits vitals as whatever the form control
//! produced: numbers, numeric strings, yes/no strings, "120/80" blood
//! pressure. Normalization fails on the first missing or invalid
//! field, naming it, so the client can highlight the control.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-correctable input error. Always names the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// The form field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) => field,
            ValidationError::Invalid { field, .. } => field,
        }
    }
}

/// Patient gender as the predictor encodes it (male = 1, female = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Accepts the full word or the single-letter form, any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Numeric code used in the predictor feature vector.
    pub fn as_code(self) -> f64 {
        match self {
            Gender::Male => 1.0,
            Gender::Female => 0.0,
        }
    }
}

/// A single raw form value — the client may send any of these shapes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Raw vitals exactly as submitted. Field names follow the mobile
/// client's form payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVitals {
    pub age: Option<FieldValue>,
    pub gender: Option<FieldValue>,
    pub weight: Option<FieldValue>,
    pub height: Option<FieldValue>,
    pub smoking_status: Option<FieldValue>,
    pub alcohol_consumption: Option<FieldValue>,
    pub cholesterol_level: Option<FieldValue>,
    pub blood_pressure: Option<FieldValue>,
    pub fasting_blood_sugar: Option<FieldValue>,
    pub chest_pain_type: Option<FieldValue>,
}

/// Fully normalized vitals. Constructed once per prediction request,
/// immutable afterward. All numeric fields are finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsInput {
    pub age: f64,
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub smoker: bool,
    pub alcohol: bool,
    pub cholesterol: f64,
    pub systolic_bp: f64,
    pub fasting_blood_sugar_high: bool,
    pub chest_pain: bool,
}

impl RawVitals {
    /// Normalize into a `VitalsInput`, failing on the first missing or
    /// invalid field in declaration order.
    pub fn normalize(&self) -> Result<VitalsInput, ValidationError> {
        Ok(VitalsInput {
            age: require_number("age", &self.age)?,
            gender: require_gender("gender", &self.gender)?,
            weight_kg: require_number("weight", &self.weight)?,
            height_cm: require_number("height", &self.height)?,
            smoker: require_bool("smokingStatus", &self.smoking_status)?,
            alcohol: require_bool("alcoholConsumption", &self.alcohol_consumption)?,
            cholesterol: require_number("cholesterolLevel", &self.cholesterol_level)?,
            systolic_bp: require_systolic("bloodPressure", &self.blood_pressure)?,
            fasting_blood_sugar_high: require_bool("fastingBloodSugar", &self.fasting_blood_sugar)?,
            chest_pain: require_bool("chestPainType", &self.chest_pain_type)?,
        })
    }
}

fn require_number(
    field: &'static str,
    value: &Option<FieldValue>,
) -> Result<f64, ValidationError> {
    let value = value.as_ref().ok_or(ValidationError::Missing(field))?;
    let n = match value {
        FieldValue::Number(n) => *n,
        FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| ValidationError::Invalid {
            field,
            reason: format!("expected a number, got \"{s}\""),
        })?,
        FieldValue::Bool(_) => {
            return Err(ValidationError::Invalid {
                field,
                reason: "expected a number".into(),
            })
        }
    };
    if !n.is_finite() {
        return Err(ValidationError::Invalid {
            field,
            reason: "must be a finite number".into(),
        });
    }
    Ok(n)
}

/// Affirmative forms accepted for boolean-like fields. Anything else
/// that is present counts as false — "no" and junk are
/// indistinguishable, matching the upstream form contract.
fn require_bool(
    field: &'static str,
    value: &Option<FieldValue>,
) -> Result<bool, ValidationError> {
    let value = value.as_ref().ok_or(ValidationError::Missing(field))?;
    Ok(match value {
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => *n == 1.0,
        FieldValue::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1"
        ),
    })
}

fn require_gender(
    field: &'static str,
    value: &Option<FieldValue>,
) -> Result<Gender, ValidationError> {
    let value = value.as_ref().ok_or(ValidationError::Missing(field))?;
    let text = match value {
        FieldValue::Text(s) => s,
        _ => {
            return Err(ValidationError::Invalid {
                field,
                reason: "expected \"male\" or \"female\"".into(),
            })
        }
    };
    Gender::parse(text).ok_or_else(|| ValidationError::Invalid {
        field,
        reason: format!("expected \"male\" or \"female\", got \"{text}\""),
    })
}

/// Systolic extraction: the substring before "/" when present, else
/// the whole value. Non-numeric input yields 0.0 — a latent upstream
/// behavior deliberately preserved (see DESIGN.md).
fn require_systolic(
    field: &'static str,
    value: &Option<FieldValue>,
) -> Result<f64, ValidationError> {
    let value = value.as_ref().ok_or(ValidationError::Missing(field))?;
    let n = match value {
        FieldValue::Number(n) => *n,
        FieldValue::Text(s) => {
            let systolic_part = match s.find('/') {
                Some(idx) => &s[..idx],
                None => s.as_str(),
            };
            systolic_part.trim().parse::<f64>().unwrap_or(0.0)
        }
        FieldValue::Bool(_) => 0.0,
    };
    Ok(if n.is_finite() { n } else { 0.0 })
}
