use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;

use super::factors::{
    Packaging, ProductClassification, ProductionProcess, RawMaterials, ShelfLife, Transportation,
};

/// Where a classification came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationSource {
    Remote,
    KnownProduct,
    Default,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Remote => "remote",
            ClassificationSource::KnownProduct => "knownProduct",
            ClassificationSource::Default => "default",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "remote" => Some(ClassificationSource::Remote),
            "knownProduct" => Some(ClassificationSource::KnownProduct),
            "default" => Some(ClassificationSource::Default),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub classification: ProductClassification,
    pub source: ClassificationSource,
}

#[async_trait]
pub trait ProductClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(
        &self,
        product_name: &str,
        category: &str,
    ) -> Result<Classified, ClassificationError>;
}

#[async_trait]
impl<T: ProductClassifier + ?Sized> ProductClassifier for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn classify(
        &self,
        product_name: &str,
        category: &str,
    ) -> Result<Classified, ClassificationError> {
        (**self).classify(product_name, category).await
    }
}

/// Profile used when a product is neither classified remotely nor known locally.
pub fn default_classification() -> ProductClassification {
    ProductClassification::new(
        RawMaterials::Conventional,
        ProductionProcess::SemiAutomated,
        Packaging::Mixed,
        Transportation::Regional,
        ShelfLife::Medium,
    )
}

/// Known products keyed by lowercase name, plus one global default.
#[derive(Debug, Clone)]
pub struct StaticTableClassifier {
    known: HashMap<String, ProductClassification>,
    default: ProductClassification,
}

impl StaticTableClassifier {
    pub fn new(default: ProductClassification) -> Self {
        Self {
            known: HashMap::new(),
            default,
        }
    }

    pub fn builtin() -> Self {
        Self::new(default_classification())
            .with_product(
                "mawa cake",
                ProductClassification::new(
                    RawMaterials::Conventional,
                    ProductionProcess::Traditional,
                    Packaging::Minimal,
                    Transportation::Local,
                    ShelfLife::Short,
                ),
            )
            .with_product(
                "bread",
                ProductClassification::new(
                    RawMaterials::Conventional,
                    ProductionProcess::SemiAutomated,
                    Packaging::Minimal,
                    Transportation::Local,
                    ShelfLife::VeryShort,
                ),
            )
            .with_product(
                "jowar",
                ProductClassification::new(
                    RawMaterials::Organic,
                    ProductionProcess::Traditional,
                    Packaging::Minimal,
                    Transportation::Regional,
                    ShelfLife::Long,
                ),
            )
    }

    pub fn with_product(mut self, name: &str, classification: ProductClassification) -> Self {
        self.known.insert(name.to_lowercase(), classification);
        self
    }

    /// Exact match on the lowercased name; anything else gets the default.
    pub fn lookup(&self, product_name: &str) -> Classified {
        match self.known.get(&product_name.to_lowercase()) {
            Some(classification) => Classified {
                classification: *classification,
                source: ClassificationSource::KnownProduct,
            },
            None => Classified {
                classification: self.default,
                source: ClassificationSource::Default,
            },
        }
    }
}

impl Default for StaticTableClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl ProductClassifier for StaticTableClassifier {
    fn name(&self) -> &'static str {
        "static-table"
    }

    async fn classify(
        &self,
        product_name: &str,
        _category: &str,
    ) -> Result<Classified, ClassificationError> {
        Ok(self.lookup(product_name))
    }
}

/// Tries `primary` once; any failure is logged and answered from the static table.
pub struct FallbackClassifier<P> {
    primary: P,
    fallback: StaticTableClassifier,
}

impl<P: ProductClassifier> FallbackClassifier<P> {
    pub fn new(primary: P, fallback: StaticTableClassifier) -> Self {
        Self { primary, fallback }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub async fn resolve(&self, product_name: &str, category: &str) -> Classified {
        match self.primary.classify(product_name, category).await {
            Ok(classified) => classified,
            Err(err) => {
                warn!(
                    "{} classifier failed for '{}': {err}; using fallback table",
                    self.primary.name(),
                    product_name
                );
                self.fallback.lookup(product_name)
            }
        }
    }
}

#[async_trait]
impl<P: ProductClassifier> ProductClassifier for FallbackClassifier<P> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn classify(
        &self,
        product_name: &str,
        category: &str,
    ) -> Result<Classified, ClassificationError> {
        Ok(self.resolve(product_name, category).await)
    }
}
