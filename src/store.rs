use crate::app_dirs::AppDirs;
use crate::error::{Result, WorkoutError};
use crate::mode::WorkoutMode;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

pub type RecordId = Uuid;

/// A persisted workout. Immutable once written; removed only on request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub mode: WorkoutMode,
    pub target_value: u32,
    pub completed_reps: u32,
    pub duration_secs: f64,
    pub average_form_score: Option<f64>,
}

impl WorkoutRecord {
    /// A new record with a fresh id, stamped now. Timestamps are kept at
    /// microsecond precision, which is what the store holds.
    pub fn new(
        mode: WorkoutMode,
        target_value: u32,
        completed_reps: u32,
        duration_secs: f64,
        average_form_score: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now().trunc_subsecs(6),
            mode,
            target_value,
            completed_reps,
            duration_secs,
            average_form_score,
        }
    }
}

/// Write side of the history, as used by the summary step
pub trait RecordSink {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()>;
}

const PAGE_SIZE: usize = 64;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS workouts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        recorded_at_us INTEGER NOT NULL,
        mode TEXT NOT NULL,
        target_value INTEGER NOT NULL,
        completed_reps INTEGER NOT NULL,
        duration_secs REAL NOT NULL,
        average_form_score REAL
    );
    CREATE INDEX IF NOT EXISTS idx_workouts_recorded_at ON workouts(recorded_at_us);
"#;

const COLUMNS: &str =
    "seq, id, recorded_at_us, mode, target_value, completed_reps, duration_secs, average_form_score";

/// SQLite-backed workout history
#[derive(Debug)]
pub struct WorkoutStore {
    conn: Connection,
}

impl WorkoutStore {
    /// Open the store at the default location, creating it if needed
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| "pushup_workouts.db".into());
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened workout store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a new record
    pub fn append(&self, record: &WorkoutRecord) -> Result<RecordId> {
        self.conn.execute(
            r#"
            INSERT INTO workouts
            (id, recorded_at_us, mode, target_value, completed_reps, duration_secs, average_form_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id.to_string(),
                record.timestamp.timestamp_micros(),
                record.mode.as_str(),
                record.target_value,
                record.completed_reps,
                record.duration_secs,
                record.average_form_score,
            ],
        )?;
        info!(id = %record.id, mode = %record.mode, reps = record.completed_reps, "workout saved");
        Ok(record.id)
    }

    /// Remove one record. Unknown ids are ignored.
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM workouts WHERE id = ?1", [id.to_string()])?;
        if removed > 0 {
            info!(%id, "workout deleted");
        } else {
            debug!(%id, "delete of unknown workout ignored");
        }
        Ok(())
    }

    pub fn get(&self, id: RecordId) -> Result<Option<WorkoutRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM workouts WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], read_row)
            .optional()?;
        row.map(|(_, record)| record).transpose()
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM workouts", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Newest-first history. Rows are fetched a page at a time as the
    /// iterator advances; call again to start over.
    pub fn list(&self) -> History<'_> {
        History {
            conn: &self.conn,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Remove every record (for resets and tests)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM workouts", [])?;
        Ok(())
    }
}

impl RecordSink for WorkoutStore {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()> {
        WorkoutStore::append(self, record).map(|_| ())
    }
}

/// Lazy newest-first iteration over the history
pub struct History<'a> {
    conn: &'a Connection,
    /// (recorded_at_us, seq) of the last row handed out
    after: Option<(i64, i64)>,
    buffer: VecDeque<(i64, i64, Result<WorkoutRecord>)>,
    exhausted: bool,
}

impl History<'_> {
    fn fetch_page(&mut self) -> Result<()> {
        let rows = match self.after {
            None => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM workouts ORDER BY recorded_at_us DESC, seq DESC LIMIT ?1"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([PAGE_SIZE as i64], read_keyed_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            Some((at, seq)) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM workouts \
                     WHERE recorded_at_us < ?1 OR (recorded_at_us = ?1 AND seq < ?2) \
                     ORDER BY recorded_at_us DESC, seq DESC LIMIT ?3"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![at, seq, PAGE_SIZE as i64], read_keyed_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        if rows.len() < PAGE_SIZE {
            self.exhausted = true;
        }
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for History<'_> {
    type Item = Result<WorkoutRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        let (at, seq, record) = self.buffer.pop_front()?;
        self.after = Some((at, seq));
        Some(record)
    }
}

fn read_keyed_row(row: &Row) -> rusqlite::Result<(i64, i64, Result<WorkoutRecord>)> {
    let at: i64 = row.get(2)?;
    let (seq, record) = read_row(row)?;
    Ok((at, seq, record))
}

/// Decode a row; column type errors fail the query, bad values fail the record.
fn read_row(row: &Row) -> rusqlite::Result<(i64, Result<WorkoutRecord>)> {
    let seq: i64 = row.get(0)?;
    let id: String = row.get(1)?;
    let at: i64 = row.get(2)?;
    let mode: String = row.get(3)?;
    let target_value: u32 = row.get(4)?;
    let completed_reps: u32 = row.get(5)?;
    let duration_secs: f64 = row.get(6)?;
    let average_form_score: Option<f64> = row.get(7)?;

    let record = (|| -> Result<WorkoutRecord> {
        let id = Uuid::parse_str(&id)
            .map_err(|e| WorkoutError::InvalidRecord(format!("bad id '{id}': {e}")))?;
        let timestamp = DateTime::from_timestamp_micros(at)
            .ok_or_else(|| WorkoutError::InvalidRecord(format!("bad timestamp {at}")))?;
        let mode = mode.parse::<WorkoutMode>().map_err(WorkoutError::InvalidRecord)?;
        Ok(WorkoutRecord {
            id,
            timestamp,
            mode,
            target_value,
            completed_reps,
            duration_secs,
            average_form_score,
        })
    })();
    Ok((seq, record))
}
