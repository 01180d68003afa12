//! Environmental factor tables.
//!
//! Five independent dimensions, each a fixed label → points table. The point values
//! are constants; nothing mutates them at runtime.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    RawMaterials,
    ProductionProcess,
    Packaging,
    Transportation,
    ShelfLife,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::RawMaterials,
        Dimension::ProductionProcess,
        Dimension::Packaging,
        Dimension::Transportation,
        Dimension::ShelfLife,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::RawMaterials => "rawMaterials",
            Dimension::ProductionProcess => "productionProcess",
            Dimension::Packaging => "packaging",
            Dimension::Transportation => "transportation",
            Dimension::ShelfLife => "shelfLife",
        }
    }

    pub fn max_points(self) -> u8 {
        match self {
            Dimension::RawMaterials => RawMaterials::Organic.points(),
            Dimension::ProductionProcess => ProductionProcess::Traditional.points(),
            Dimension::Packaging => Packaging::Minimal.points(),
            Dimension::Transportation => Transportation::Local.points(),
            Dimension::ShelfLife => ShelfLife::VeryShort.points(),
        }
    }
}

/// A categorical label within one dimension.
pub trait FactorLabel: Copy + FromStr + 'static {
    const DIMENSION: Dimension;
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;
    fn points(self) -> u8;

    /// Case-insensitive lookup by camelCase name.
    fn parse_label(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RawMaterials {
    Organic,
    Sustainable,
    Mixed,
    Conventional,
    Synthetic,
}

impl FactorLabel for RawMaterials {
    const DIMENSION: Dimension = Dimension::RawMaterials;
    const ALL: &'static [Self] = &[
        RawMaterials::Organic,
        RawMaterials::Sustainable,
        RawMaterials::Mixed,
        RawMaterials::Conventional,
        RawMaterials::Synthetic,
    ];

    fn as_str(self) -> &'static str {
        match self {
            RawMaterials::Organic => "organic",
            RawMaterials::Sustainable => "sustainable",
            RawMaterials::Mixed => "mixed",
            RawMaterials::Conventional => "conventional",
            RawMaterials::Synthetic => "synthetic",
        }
    }

    fn points(self) -> u8 {
        match self {
            RawMaterials::Organic => 25,
            RawMaterials::Sustainable => 20,
            RawMaterials::Mixed => 15,
            RawMaterials::Conventional => 10,
            RawMaterials::Synthetic => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProductionProcess {
    Traditional,
    SemiAutomated,
    FullyAutomated,
    Industrialized,
}

impl FactorLabel for ProductionProcess {
    const DIMENSION: Dimension = Dimension::ProductionProcess;
    const ALL: &'static [Self] = &[
        ProductionProcess::Traditional,
        ProductionProcess::SemiAutomated,
        ProductionProcess::FullyAutomated,
        ProductionProcess::Industrialized,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ProductionProcess::Traditional => "traditional",
            ProductionProcess::SemiAutomated => "semiAutomated",
            ProductionProcess::FullyAutomated => "fullyAutomated",
            ProductionProcess::Industrialized => "industrialized",
        }
    }

    fn points(self) -> u8 {
        match self {
            ProductionProcess::Traditional => 25,
            ProductionProcess::SemiAutomated => 20,
            ProductionProcess::FullyAutomated => 15,
            ProductionProcess::Industrialized => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Packaging {
    Minimal,
    Recyclable,
    Mixed,
    Plastic,
}

impl FactorLabel for Packaging {
    const DIMENSION: Dimension = Dimension::Packaging;
    const ALL: &'static [Self] = &[
        Packaging::Minimal,
        Packaging::Recyclable,
        Packaging::Mixed,
        Packaging::Plastic,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Packaging::Minimal => "minimal",
            Packaging::Recyclable => "recyclable",
            Packaging::Mixed => "mixed",
            Packaging::Plastic => "plastic",
        }
    }

    fn points(self) -> u8 {
        match self {
            Packaging::Minimal => 20,
            Packaging::Recyclable => 15,
            Packaging::Mixed => 10,
            Packaging::Plastic => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Transportation {
    Local,
    Regional,
    National,
    International,
}

impl FactorLabel for Transportation {
    const DIMENSION: Dimension = Dimension::Transportation;
    const ALL: &'static [Self] = &[
        Transportation::Local,
        Transportation::Regional,
        Transportation::National,
        Transportation::International,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Transportation::Local => "local",
            Transportation::Regional => "regional",
            Transportation::National => "national",
            Transportation::International => "international",
        }
    }

    fn points(self) -> u8 {
        match self {
            Transportation::Local => 15,
            Transportation::Regional => 12,
            Transportation::National => 8,
            Transportation::International => 5,
        }
    }
}

/// veryShort: 1-3 days, short: 4-7 days, medium: 1-4 weeks, long: over a month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ShelfLife {
    VeryShort,
    Short,
    Medium,
    Long,
}

impl FactorLabel for ShelfLife {
    const DIMENSION: Dimension = Dimension::ShelfLife;
    const ALL: &'static [Self] = &[
        ShelfLife::VeryShort,
        ShelfLife::Short,
        ShelfLife::Medium,
        ShelfLife::Long,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ShelfLife::VeryShort => "veryShort",
            ShelfLife::Short => "short",
            ShelfLife::Medium => "medium",
            ShelfLife::Long => "long",
        }
    }

    fn points(self) -> u8 {
        match self {
            ShelfLife::VeryShort => 15,
            ShelfLife::Short => 12,
            ShelfLife::Medium => 8,
            ShelfLife::Long => 5,
        }
    }
}

macro_rules! label_from_str {
    ($($label:ty),+) => {
        $(
            impl FromStr for $label {
                type Err = String;

                fn from_str(value: &str) -> Result<Self, Self::Err> {
                    <$label as FactorLabel>::parse_label(value).ok_or_else(|| {
                        format!("unknown {:?} label '{}'", <$label as FactorLabel>::DIMENSION, value)
                    })
                }
            }
        )+
    };
}

label_from_str!(RawMaterials, ProductionProcess, Packaging, Transportation, ShelfLife);

/// One label per dimension. A `None` dimension contributes 0 points.
///
/// Deserialization is lenient per field: unknown labels or non-string values become
/// `None` instead of failing the whole classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductClassification {
    #[serde(default, deserialize_with = "lenient_label")]
    pub raw_materials: Option<RawMaterials>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub production_process: Option<ProductionProcess>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub packaging: Option<Packaging>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub transportation: Option<Transportation>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub shelf_life: Option<ShelfLife>,
}

impl ProductClassification {
    pub fn new(
        raw_materials: RawMaterials,
        production_process: ProductionProcess,
        packaging: Packaging,
        transportation: Transportation,
        shelf_life: ShelfLife,
    ) -> Self {
        Self {
            raw_materials: Some(raw_materials),
            production_process: Some(production_process),
            packaging: Some(packaging),
            transportation: Some(transportation),
            shelf_life: Some(shelf_life),
        }
    }

    /// Number of dimensions with a recognized label.
    pub fn recognized_dimensions(&self) -> usize {
        [
            self.raw_materials.is_some(),
            self.production_process.is_some(),
            self.packaging.is_some(),
            self.transportation.is_some(),
            self.shelf_life.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn label(&self, dimension: Dimension) -> Option<&'static str> {
        match dimension {
            Dimension::RawMaterials => self.raw_materials.map(FactorLabel::as_str),
            Dimension::ProductionProcess => self.production_process.map(FactorLabel::as_str),
            Dimension::Packaging => self.packaging.map(FactorLabel::as_str),
            Dimension::Transportation => self.transportation.map(FactorLabel::as_str),
            Dimension::ShelfLife => self.shelf_life.map(FactorLabel::as_str),
        }
    }

    pub fn points(&self, dimension: Dimension) -> u8 {
        match dimension {
            Dimension::RawMaterials => self.raw_materials.map_or(0, FactorLabel::points),
            Dimension::ProductionProcess => self.production_process.map_or(0, FactorLabel::points),
            Dimension::Packaging => self.packaging.map_or(0, FactorLabel::points),
            Dimension::Transportation => self.transportation.map_or(0, FactorLabel::points),
            Dimension::ShelfLife => self.shelf_life.map_or(0, FactorLabel::points),
        }
    }
}

fn lenient_label<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FactorLabel,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(value)) => T::parse_label(&value),
        _ => None,
    })
}
