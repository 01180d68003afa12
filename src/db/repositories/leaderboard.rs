use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_movement, to_u8},
};
use crate::leaderboard::LeaderboardEntry;

fn row_to_entry(row: &Row) -> Result<LeaderboardEntry> {
    let rank: i64 = row.get("rank")?;
    let movement: String = row.get("movement")?;

    Ok(LeaderboardEntry {
        rank: u32::try_from(rank).context("leaderboard rank out of range")?,
        name: row.get("vendor")?,
        score: to_u8(row.get("score")?, "score")?,
        movement: parse_movement(&movement)?,
    })
}

impl Database {
    /// The board stored by the last `replace_leaderboard`, best rank first.
    pub async fn previous_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT vendor, rank, score, movement FROM leaderboard_snapshot
                 ORDER BY rank ASC, vendor ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }
            Ok(entries)
        })
        .await
    }

    pub async fn replace_leaderboard(&self, board: &[LeaderboardEntry]) -> Result<()> {
        let board = board.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open leaderboard transaction")?;
            tx.execute("DELETE FROM leaderboard_snapshot", [])
                .context("failed to clear leaderboard snapshot")?;

            let recorded_at = Utc::now().to_rfc3339();
            {
                let mut insert = tx.prepare(
                    "INSERT INTO leaderboard_snapshot (vendor, rank, score, movement, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in &board {
                    insert
                        .execute(params![
                            entry.name,
                            entry.rank,
                            entry.score,
                            entry.movement.as_str(),
                            recorded_at,
                        ])
                        .with_context(|| format!("failed to store rank of {}", entry.name))?;
                }
            }

            tx.commit().context("failed to commit leaderboard snapshot")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::leaderboard::Movement;

    fn entry(rank: u32, name: &str, score: u8, movement: Movement) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            name: name.into(),
            score,
            movement,
        }
    }

    #[tokio::test]
    async fn snapshot_replaces_the_previous_board() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("greentrace.sqlite3")).unwrap();
        assert!(db.previous_leaderboard().await.unwrap().is_empty());

        db.replace_leaderboard(&[
            entry(1, "Green Co", 90, Movement::New),
            entry(2, "EcoVendors Ltd", 80, Movement::New),
        ])
        .await
        .unwrap();
        db.replace_leaderboard(&[
            entry(1, "EcoVendors Ltd", 95, Movement::Up),
            entry(2, "Green Co", 90, Movement::Down),
        ])
        .await
        .unwrap();

        let stored = db.previous_leaderboard().await.unwrap();
        assert_eq!(
            stored,
            [
                entry(1, "EcoVendors Ltd", 95, Movement::Up),
                entry(2, "Green Co", 90, Movement::Down),
            ]
        );
    }
}
