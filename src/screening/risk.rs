//! Risk classification — fixed probability thresholds and the
//! recommendation text attached to each bucket.

use serde::{Deserialize, Serialize};

/// Probability at or above which a result is classified High.
pub const HIGH_THRESHOLD: f64 = 0.70;
/// Probability at or above which a result is classified Medium.
pub const MEDIUM_THRESHOLD: f64 = 0.40;

/// Ordinal risk bucket derived from a disease probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a probability into a risk bucket.
    ///
    /// Lower bounds are closed: exactly 0.40 is Medium, exactly 0.70
    /// is High. Callers pass the unrounded probability — rounding is a
    /// display concern only.
    pub fn classify(probability: f64) -> Self {
        if probability >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if probability >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Parse a risk label from an external predictor.
    ///
    /// Case-insensitive. The legacy subprocess predictor emits
    /// "Moderate" for the middle bucket; it maps to Medium.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    /// Canonical recommendation text for this bucket.
    pub fn recommendation(self) -> &'static str {
        match self {
            RiskLevel::Low => "Maintain a healthy lifestyle.",
            RiskLevel::Medium => "Adopt a healthy lifestyle and schedule routine checkups.",
            RiskLevel::High => "Consult a cardiologist immediately.",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_band() {
        assert_eq!(RiskLevel::classify(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(0.25), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(0.3999), RiskLevel::Low);
    }

    #[test]
    fn medium_band() {
        assert_eq!(RiskLevel::classify(0.40), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(0.55), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(0.6999), RiskLevel::Medium);
    }

    #[test]
    fn high_band() {
        assert_eq!(RiskLevel::classify(0.70), RiskLevel::High);
        assert_eq!(RiskLevel::classify(0.85), RiskLevel::High);
        assert_eq!(RiskLevel::classify(1.0), RiskLevel::High);
    }

    #[test]
    fn boundaries_are_closed_below() {
        // 0.40 and 0.70 belong to the upper bucket.
        assert_eq!(RiskLevel::classify(MEDIUM_THRESHOLD), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(HIGH_THRESHOLD), RiskLevel::High);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RiskLevel::parse("high"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("HIGH"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse(" Low "), Some(RiskLevel::Low));
    }

    #[test]
    fn parse_maps_legacy_moderate_to_medium() {
        assert_eq!(RiskLevel::parse("Moderate"), Some(RiskLevel::Medium));
    }

    #[test]
    fn parse_rejects_unknown_labels() {
        assert_eq!(RiskLevel::parse("severe"), None);
        assert_eq!(RiskLevel::parse(""), None);
    }

    #[test]
    fn each_bucket_has_distinct_recommendation() {
        let texts = [
            RiskLevel::Low.recommendation(),
            RiskLevel::Medium.recommendation(),
            RiskLevel::High.recommendation(),
        ];
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
    }

    #[test]
    fn serializes_as_capitalized_label() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"High\"");
    }
}
