use std::{
    path::Path,
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Opens the history file and brings its schema up to date.
fn open_history(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create history directory {}", parent.display())
        })?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open history database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("History database stays in rollback journal mode: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set history busy timeout")?;

    run_migrations(&mut conn).context("failed to migrate history schema")?;
    Ok(conn)
}

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish pending writes and exit.
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("History worker panicked while shutting down");
            }
        }
    }
}

/// Scan and score history store. A single worker thread owns the SQLite connection;
/// callers submit closures and await the reply.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = open_history(path)?;

        let (jobs, queue) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("greentrace-history".into())
            .spawn(move || {
                for job in queue {
                    job(&mut conn);
                }
                info!("History worker stopped");
            })
            .context("failed to start history worker")?;

        info!("History database ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: Some(jobs),
                thread: Some(thread),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("history worker already stopped"))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // The caller may have given up waiting; the write itself still happened.
            let _ = reply_tx.send(task(conn));
        });

        jobs.send(job)
            .map_err(|_| anyhow!("history worker is no longer accepting work"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("history worker dropped a request"))?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn opens_in_wal_mode_with_current_schema() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("nested").join("history.sqlite3")).unwrap();

        let (mode, version) = db
            .execute(|conn| {
                let mode: String = conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
                let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
                Ok((mode, version))
            })
            .await
            .unwrap();

        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(version, crate::db::migrations::CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn task_errors_reach_the_caller_and_the_worker_survives() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();

        let failed = db
            .execute(|conn| {
                conn.execute_batch("SELECT * FROM missing_table")?;
                Ok(())
            })
            .await;
        assert!(failed.is_err());

        let count: i64 = db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
