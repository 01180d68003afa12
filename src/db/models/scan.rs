use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A barcode the user confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    pub session_id: String,
    pub code: String,
    pub confidence: f64,
    pub confirmed_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(session_id: impl Into<String>, code: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            code: code.into(),
            confidence,
            confirmed_at: Utc::now(),
        }
    }
}
