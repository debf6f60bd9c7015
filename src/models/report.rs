//! Report records — the immutable unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::screening::{ScreeningResult, VitalsInput};

/// Fallback name when the client leaves the report name blank.
pub const DEFAULT_REPORT_NAME: &str = "Untitled Report";

/// A persisted screening report. Owned by exactly one user; created on
/// save, never mutated, deleted wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: String,
    pub report_name: String,
    pub vitals: VitalsInput,
    pub result: ScreeningResult,
    /// Attachment metadata. Blob bytes stay in the database and are
    /// served through the image endpoint.
    pub images: Vec<ReportImage>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        user_id: String,
        report_name: Option<String>,
        vitals: VitalsInput,
        result: ScreeningResult,
        images: Vec<ReportImage>,
    ) -> Self {
        let report_name = report_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());

        Self {
            id: Uuid::new_v4(),
            user_id,
            report_name,
            vitals,
            result,
            images,
            created_at: Utc::now(),
        }
    }
}

/// Stored image attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportImage {
    pub id: Uuid,
    pub content_type: String,
    pub byte_len: i64,
}

/// A decoded image attachment ready for insertion.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub id: Uuid,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl NewImage {
    pub fn new(content_type: String, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type,
            data,
        }
    }

    pub fn metadata(&self) -> ReportImage {
        ReportImage {
            id: self.id,
            content_type: self.content_type.clone(),
            byte_len: self.data.len() as i64,
        }
    }
}
