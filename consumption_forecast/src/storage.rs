//! Durable table of monitoring snapshots

use crate::error::{ForecastError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One monitoring cycle's summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Cycle timestamp, unique per row
    pub timestamp: String,
    pub model_name: String,
    pub model_version: String,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub r2: Option<f64>,
    pub drift_score: f64,
    pub drift_report_path: String,
    pub perf_report_path: Option<String>,
}

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS performance_metrics (
    timestamp TEXT PRIMARY KEY,
    model_name TEXT NOT NULL,
    model_version TEXT NOT NULL,
    mae REAL,
    rmse REAL,
    r2 REAL,
    drift_score REAL NOT NULL,
    drift_report_path TEXT NOT NULL,
    perf_report_path TEXT
)";

const SELECT_COLUMNS: &str = "SELECT timestamp, model_name, model_version, mae, rmse, r2, \
     drift_score, drift_report_path, perf_report_path FROM performance_metrics";

/// Append-only SQLite store of [`MetricsSnapshot`] rows
#[derive(Debug)]
pub struct MetricsStore {
    conn: Mutex<Connection>,
}

impl MetricsStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ForecastError::StorageError(format!(
                    "Cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Store kept in memory, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a snapshot
    ///
    /// A second snapshot with the same timestamp is rejected.
    pub fn insert(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO performance_metrics (timestamp, model_name, model_version, mae, rmse, \
             r2, drift_score, drift_report_path, perf_report_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                snapshot.timestamp,
                snapshot.model_name,
                snapshot.model_version,
                snapshot.mae,
                snapshot.rmse,
                snapshot.r2,
                snapshot.drift_score,
                snapshot.drift_report_path,
                snapshot.perf_report_path,
            ],
        )
        .map_err(|e| {
            ForecastError::StorageError(format!(
                "Cannot store metrics for {}: {}",
                snapshot.timestamp, e
            ))
        })?;

        info!(timestamp = %snapshot.timestamp, "stored metrics snapshot");
        Ok(())
    }

    /// Newest snapshots first
    pub fn latest(&self, limit: usize) -> Result<Vec<MetricsSnapshot>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} ORDER BY timestamp DESC LIMIT ?1", SELECT_COLUMNS))?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_snapshot)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Snapshot stored under `timestamp`, if any
    pub fn get(&self, timestamp: &str) -> Result<Option<MetricsSnapshot>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} WHERE timestamp = ?1", SELECT_COLUMNS))?;
        Ok(stmt
            .query_row(params![timestamp], Self::row_to_snapshot)
            .optional()?)
    }

    /// Number of stored snapshots
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM performance_metrics", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricsSnapshot> {
        Ok(MetricsSnapshot {
            timestamp: row.get(0)?,
            model_name: row.get(1)?,
            model_version: row.get(2)?,
            mae: row.get(3)?,
            rmse: row.get(4)?,
            r2: row.get(5)?,
            drift_score: row.get(6)?,
            drift_report_path: row.get(7)?,
            perf_report_path: row.get(8)?,
        })
    }
}
