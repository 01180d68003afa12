use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_label, parse_source, to_u8},
    models::{NewScoreRecord, ScoreRecord, VendorAverage},
};
use crate::scoring::{Dimension, ProductClassification};

const SCORE_COLUMNS: &str = "id, product_name, category, vendor, score, source, raw_materials, \
     production_process, packaging, transportation, shelf_life, computed_at";

fn row_to_score(row: &Row) -> Result<ScoreRecord> {
    let computed_at: String = row.get("computed_at")?;
    let source: String = row.get("source")?;

    let classification = ProductClassification {
        raw_materials: parse_optional_label(row.get("raw_materials")?, "raw_materials")?,
        production_process: parse_optional_label(
            row.get("production_process")?,
            "production_process",
        )?,
        packaging: parse_optional_label(row.get("packaging")?, "packaging")?,
        transportation: parse_optional_label(row.get("transportation")?, "transportation")?,
        shelf_life: parse_optional_label(row.get("shelf_life")?, "shelf_life")?,
    };

    Ok(ScoreRecord {
        id: row.get("id")?,
        product_name: row.get("product_name")?,
        category: row.get("category")?,
        vendor: row.get("vendor")?,
        score: to_u8(row.get("score")?, "score")?,
        source: parse_source(&source)?,
        classification,
        computed_at: parse_datetime(&computed_at, "computed_at")?,
    })
}

impl Database {
    pub async fn insert_score_record(&self, input: NewScoreRecord) -> Result<ScoreRecord> {
        let record = input.into_record();
        self.execute(move |conn| {
            let labels = &record.classification;
            conn.execute(
                &format!(
                    "INSERT INTO score_records ({SCORE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    record.id,
                    record.product_name,
                    record.category,
                    record.vendor,
                    record.score,
                    record.source.as_str(),
                    labels.label(Dimension::RawMaterials),
                    labels.label(Dimension::ProductionProcess),
                    labels.label(Dimension::Packaging),
                    labels.label(Dimension::Transportation),
                    labels.label(Dimension::ShelfLife),
                    record.computed_at.to_rfc3339(),
                ],
            )
            .context("failed to insert score record")?;
            Ok(record)
        })
        .await
    }

    /// Every score recorded for a product name, compared case-insensitively, newest first.
    pub async fn scores_for_product(&self, product_name: &str) -> Result<Vec<ScoreRecord>> {
        let product_name = product_name.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCORE_COLUMNS}
                 FROM score_records
                 WHERE product_name = ?1 COLLATE NOCASE
                 ORDER BY computed_at DESC, rowid DESC"
            ))?;

            let mut rows = stmt.query(params![product_name])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_score(row)?);
            }
            Ok(records)
        })
        .await
    }

    /// Mean recorded score per vendor, rounded to the nearest point. Unattributed scores
    /// are excluded.
    pub async fn vendor_score_averages(&self) -> Result<Vec<VendorAverage>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT vendor, AVG(score), COUNT(*)
                 FROM score_records
                 WHERE vendor IS NOT NULL
                 GROUP BY vendor
                 ORDER BY vendor ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut averages = Vec::new();
            while let Some(row) = rows.next()? {
                let average: f64 = row.get(1)?;
                let count: i64 = row.get(2)?;
                averages.push(VendorAverage {
                    vendor: row.get(0)?,
                    average_score: average.round().clamp(0.0, 100.0) as u8,
                    products_scored: u32::try_from(count).unwrap_or(u32::MAX),
                });
            }
            Ok(averages)
        })
        .await
    }
}
