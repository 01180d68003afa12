use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64},
    models::ScanRecord,
};

fn row_to_scan(row: &Row) -> Result<ScanRecord> {
    let confirmed_at: String = row.get("confirmed_at")?;

    Ok(ScanRecord {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        code: row.get("code")?,
        confidence: row.get("confidence")?,
        confirmed_at: parse_datetime(&confirmed_at, "confirmed_at")?,
    })
}

impl Database {
    pub async fn insert_scan(&self, scan: &ScanRecord) -> Result<()> {
        let record = scan.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO scans (id, session_id, code, confidence, confirmed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.session_id,
                    record.code,
                    record.confidence,
                    record.confirmed_at.to_rfc3339(),
                ],
            )
            .context("failed to insert scan")?;
            Ok(())
        })
        .await
    }

    /// Most recently confirmed first.
    pub async fn list_recent_scans(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, code, confidence, confirmed_at
                 FROM scans
                 ORDER BY confirmed_at DESC, rowid DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![to_i64(limit)?])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                scans.push(row_to_scan(row)?);
            }
            Ok(scans)
        })
        .await
    }

    pub async fn scans_for_code(&self, code: &str) -> Result<Vec<ScanRecord>> {
        let code = code.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, code, confidence, confirmed_at
                 FROM scans
                 WHERE code = ?1
                 ORDER BY confirmed_at DESC, rowid DESC",
            )?;

            let mut rows = stmt.query(params![code])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                scans.push(row_to_scan(row)?);
            }
            Ok(scans)
        })
        .await
    }
}
