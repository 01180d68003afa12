use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use super::classifier::{
    ClassificationSource, FallbackClassifier, ProductClassifier, StaticTableClassifier,
};
use super::config::ClassifierSettings;
use super::factors::ProductClassification;
use super::remote::RemoteClassifier;
use super::{score_breakdown, ScoreBreakdown};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenScore {
    pub product_name: String,
    pub category: String,
    pub score: u8,
    pub classification: ProductClassification,
    pub source: ClassificationSource,
    pub breakdown: ScoreBreakdown,
}

/// Computes green scores, classifying through a primary classifier with the static
/// table as the guaranteed fallback.
#[derive(Clone)]
pub struct GreenScorer {
    classifier: Arc<FallbackClassifier<Arc<dyn ProductClassifier>>>,
}

impl GreenScorer {
    pub fn new(primary: Arc<dyn ProductClassifier>, fallback: StaticTableClassifier) -> Self {
        Self {
            classifier: Arc::new(FallbackClassifier::new(primary, fallback)),
        }
    }

    /// Static table only.
    pub fn offline() -> Self {
        Self::new(
            Arc::new(StaticTableClassifier::builtin()),
            StaticTableClassifier::builtin(),
        )
    }

    pub fn from_settings(settings: &ClassifierSettings) -> Self {
        if !settings.enabled {
            info!("Remote classifier disabled; scoring from the static table");
            return Self::offline();
        }

        match RemoteClassifier::new(settings) {
            Ok(remote) => Self::new(Arc::new(remote), StaticTableClassifier::builtin()),
            Err(err) => {
                warn!("Remote classifier unavailable ({err}); scoring from the static table");
                Self::offline()
            }
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.primary_name()
    }

    /// Always resolves: classifier failures degrade to the fallback table.
    pub async fn score_product(&self, product_name: &str, category: &str) -> GreenScore {
        let classified = self.classifier.resolve(product_name, category).await;
        let breakdown = score_breakdown(&classified.classification);

        GreenScore {
            product_name: product_name.to_string(),
            category: category.to_string(),
            score: breakdown.total(),
            classification: classified.classification,
            source: classified.source,
            breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::ClassificationError;
    use crate::scoring::classifier::Classified;

    struct Unreachable;

    #[async_trait]
    impl ProductClassifier for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn classify(
            &self,
            _product_name: &str,
            _category: &str,
        ) -> Result<Classified, ClassificationError> {
            Err(ClassificationError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn failing_classifier_scores_mawa_cake_at_82() {
        let scorer = GreenScorer::new(Arc::new(Unreachable), StaticTableClassifier::builtin());
        let first = scorer.score_product("mawa cake", "Sweets").await;
        let second = scorer.score_product("Mawa Cake", "Bakery").await;

        assert_eq!(first.score, 82);
        assert_eq!(second.score, 82);
        assert_eq!(first.source, ClassificationSource::KnownProduct);
        assert_eq!(first.breakdown.shelf_life, 12);
    }

    #[tokio::test]
    async fn unknown_products_use_the_default_profile() {
        let scorer = GreenScorer::offline();
        let score = scorer.score_product("granola", "Breakfast").await;
        assert_eq!(score.source, ClassificationSource::Default);
        assert_eq!(score.score, 60);
    }

    #[tokio::test]
    async fn disabled_settings_never_build_a_remote_classifier() {
        let settings = ClassifierSettings {
            enabled: false,
            ..ClassifierSettings::default()
        };
        let scorer = GreenScorer::from_settings(&settings);
        assert_eq!(scorer.classifier_name(), "static-table");
        assert_eq!(scorer.score_product("jowar", "Grains").await.score, 87);
    }
}
