pub mod classifier;
pub mod config;
pub mod factors;
pub mod remote;
pub mod scorer;

pub use classifier::{
    default_classification, ClassificationSource, Classified, FallbackClassifier,
    ProductClassifier, StaticTableClassifier,
};
pub use config::ClassifierSettings;
pub use factors::{Dimension, ProductClassification};
pub use remote::RemoteClassifier;
pub use scorer::{GreenScore, GreenScorer};

use serde::{Deserialize, Serialize};

/// Points contributed by each dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub raw_materials: u8,
    pub production_process: u8,
    pub packaging: u8,
    pub transportation: u8,
    pub shelf_life: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.raw_materials
            + self.production_process
            + self.packaging
            + self.transportation
            + self.shelf_life
    }

    pub fn get(&self, dimension: Dimension) -> u8 {
        match dimension {
            Dimension::RawMaterials => self.raw_materials,
            Dimension::ProductionProcess => self.production_process,
            Dimension::Packaging => self.packaging,
            Dimension::Transportation => self.transportation,
            Dimension::ShelfLife => self.shelf_life,
        }
    }
}

pub fn score_breakdown(classification: &ProductClassification) -> ScoreBreakdown {
    ScoreBreakdown {
        raw_materials: classification.points(Dimension::RawMaterials),
        production_process: classification.points(Dimension::ProductionProcess),
        packaging: classification.points(Dimension::Packaging),
        transportation: classification.points(Dimension::Transportation),
        shelf_life: classification.points(Dimension::ShelfLife),
    }
}

/// Green score in [0, 100]. Absent dimensions contribute nothing; the table maxima sum
/// to exactly 100, so no clamping is needed.
pub fn compute_score(classification: &ProductClassification) -> u8 {
    score_breakdown(classification).total()
}
