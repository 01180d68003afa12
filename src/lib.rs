pub mod db;
pub mod error;
pub mod leaderboard;
pub mod scanner;
pub mod scoring;
pub mod settings;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::info;

use db::{Database, NewScoreRecord, ScanRecord, ScoreRecord};
use leaderboard::{rank_entries, LeaderboardEntry, ScoreEntry};
use scanner::{CaptureDevice, ScannerController};
use scoring::{GreenScore, GreenScorer};
use settings::SettingsStore;

pub use error::{ClassificationError, ScanError};
pub use utils::logging::init_logging;

pub const DATA_DIR_ENV: &str = "GREENTRACE_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".greentrace";
const DATABASE_FILE_NAME: &str = "greentrace.sqlite3";

/// `GREENTRACE_DATA_DIR`, or `./.greentrace` when unset.
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Wires settings, history storage, the scanner surface and the scorer together.
pub struct App {
    data_dir: PathBuf,
    db: Database,
    settings: SettingsStore,
    scanner: ScannerController,
    scorer: GreenScorer,
}

impl App {
    pub fn open(data_dir: &Path, device: Arc<dyn CaptureDevice>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::in_dir(data_dir)?;
        let db = Database::new(data_dir.join(DATABASE_FILE_NAME))?;
        let scanner = ScannerController::new(device, settings.capture(), settings.scan_policy());
        let scorer = GreenScorer::from_settings(&settings.classifier());

        info!(
            "GreenTrace ready in {} (classifier: {})",
            data_dir.display(),
            scorer.classifier_name()
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db,
            settings,
            scanner,
            scorer,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn scanner(&self) -> &ScannerController {
        &self.scanner
    }

    pub fn scorer(&self) -> &GreenScorer {
        &self.scorer
    }

    /// Confirms the pending candidate, if any, and records it in scan history.
    pub async fn confirm_scan(&self) -> Result<Option<ScanRecord>> {
        let snapshot = self.scanner.snapshot().await;
        let Some(candidate) = snapshot.candidate else {
            return Ok(None);
        };
        let Some(code) = self.scanner.confirm().await else {
            return Ok(None);
        };

        let session_id = snapshot.session_id.unwrap_or_default();
        let record = ScanRecord::new(session_id, code, candidate.confidence);
        self.db.insert_scan(&record).await?;
        Ok(Some(record))
    }

    pub async fn score_and_record(
        &self,
        product_name: &str,
        category: &str,
        vendor: Option<&str>,
    ) -> Result<(GreenScore, ScoreRecord)> {
        let score = self.scorer.score_product(product_name, category).await;
        let vendor = vendor
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let record = self
            .db
            .insert_score_record(NewScoreRecord::from_score(&score, vendor))
            .await?;
        Ok((score, record))
    }

    /// Vendors ranked by average recorded score. Movement is relative to the board
    /// returned by the previous call against the same data directory.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let entries = self
            .db
            .vendor_score_averages()
            .await?
            .into_iter()
            .map(|average| ScoreEntry {
                name: average.vendor,
                score: average.average_score,
            })
            .collect();

        let previous = self.db.previous_leaderboard().await?;
        let board = rank_entries(entries, Some(&previous));
        self.db.replace_leaderboard(&board).await?;
        Ok(board)
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.db.list_recent_scans(limit).await
    }

    pub async fn product_history(&self, product_name: &str) -> Result<Vec<ScoreRecord>> {
        self.db.scores_for_product(product_name).await
    }

    /// Releases the capture device.
    pub async fn shutdown(&self) {
        self.scanner.close().await;
    }
}
