use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{ClassificationSource, GreenScore, ProductClassification};

/// A green score as computed at one point in time, optionally attributed to a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: String,
    pub product_name: String,
    pub category: String,
    pub vendor: Option<String>,
    pub score: u8,
    pub source: ClassificationSource,
    pub classification: ProductClassification,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScoreRecord {
    pub product_name: String,
    pub category: String,
    pub vendor: Option<String>,
    pub score: u8,
    pub source: ClassificationSource,
    pub classification: ProductClassification,
}

impl NewScoreRecord {
    pub fn from_score(score: &GreenScore, vendor: Option<String>) -> Self {
        Self {
            product_name: score.product_name.clone(),
            category: score.category.clone(),
            vendor,
            score: score.score,
            source: score.source,
            classification: score.classification,
        }
    }

    pub(crate) fn into_record(self) -> ScoreRecord {
        ScoreRecord {
            id: Uuid::new_v4().to_string(),
            product_name: self.product_name,
            category: self.category,
            vendor: self.vendor,
            score: self.score,
            source: self.source,
            classification: self.classification,
            computed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorAverage {
    pub vendor: String,
    /// Mean score rounded to the nearest integer.
    pub average_score: u8,
    pub products_scored: u32,
}
