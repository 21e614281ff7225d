//! SQLite-based breathing session history.
//!
//! Acts as a telemetry sink: session start/stop and stage changes are
//! written as they happen and can be aggregated into statistics later.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::breathing::{StageDurations, StopReason};
use crate::error::{CoreError, DatabaseError, Result};
use crate::events::Event;
use crate::services::TelemetrySink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub durations: StageDurations,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub elapsed_secs: Option<u64>,
    pub stop_reason: Option<StopReason>,
    pub stage_changes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub finished_sessions: u64,
    pub completed_all_cycles: u64,
    pub total_elapsed_secs: u64,
    pub today_sessions: u64,
    pub today_elapsed_secs: u64,
    pub stage_changes: u64,
}

/// Persistent log of breathing sessions.
pub struct SessionLog {
    conn: Mutex<Connection>,
}

impl SessionLog {
    /// Open the log at `~/.config/prana/prana.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("prana.db"))
    }

    /// Open (and create) the log at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory log.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.migrate()?;
        Ok(log)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Custom(format!("session log lock poisoned: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                inhale       INTEGER NOT NULL,
                hold         INTEGER NOT NULL,
                exhale       INTEGER NOT NULL,
                silence      INTEGER NOT NULL,
                started_at   TEXT NOT NULL,
                stopped_at   TEXT,
                elapsed_secs INTEGER,
                stop_reason  TEXT
            );

            CREATE TABLE IF NOT EXISTS stage_changes (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                stage      TEXT NOT NULL,
                at         TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_stage_changes_session ON stage_changes(session_id);",
        )?;
        Ok(())
    }

    /// Persist one telemetry event.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn append(&self, event: &Event) -> Result<()> {
        let conn = self.conn()?;
        match event {
            Event::SessionStarted {
                session_id,
                durations,
                at,
            } => {
                conn.execute(
                    "INSERT OR REPLACE INTO sessions (id, inhale, hold, exhale, silence, started_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        session_id.to_string(),
                        durations.inhale,
                        durations.hold,
                        durations.exhale,
                        durations.silence,
                        at.to_rfc3339(),
                    ],
                )?;
            }
            Event::StageChanged {
                session_id,
                stage,
                at,
            } => {
                conn.execute(
                    "INSERT INTO stage_changes (session_id, stage, at) VALUES (?1, ?2, ?3)",
                    params![session_id.to_string(), stage.id(), at.to_rfc3339()],
                )?;
            }
            Event::SessionStopped {
                session_id,
                elapsed_secs,
                reason,
                at,
            } => {
                conn.execute(
                    "UPDATE sessions SET stopped_at = ?2, elapsed_secs = ?3, stop_reason = ?4
                     WHERE id = ?1",
                    params![
                        session_id.to_string(),
                        at.to_rfc3339(),
                        elapsed_secs,
                        reason.as_str(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    pub fn session(&self, id: Uuid) -> Result<Option<SessionSummary>> {
        let conn = self.conn()?;
        let summary = conn
            .query_row(
                "SELECT s.id, s.inhale, s.hold, s.exhale, s.silence, s.started_at,
                        s.stopped_at, s.elapsed_secs, s.stop_reason,
                        (SELECT COUNT(*) FROM stage_changes c WHERE c.session_id = s.id)
                 FROM sessions s WHERE s.id = ?1",
                params![id.to_string()],
                row_to_summary,
            )
            .optional()?;
        Ok(summary)
    }

    /// Most recent sessions first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.inhale, s.hold, s.exhale, s.silence, s.started_at,
                    s.stopped_at, s.elapsed_secs, s.stop_reason,
                    (SELECT COUNT(*) FROM stage_changes c WHERE c.session_id = s.id)
             FROM sessions s
             ORDER BY s.started_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_summary)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn stats(&self) -> Result<Stats> {
        let conn = self.conn()?;
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let mut stats = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(stopped_at),
                    COALESCE(SUM(stop_reason = 'cycles_completed'), 0),
                    COALESCE(SUM(elapsed_secs), 0)
             FROM sessions",
            [],
            |row| {
                Ok(Stats {
                    total_sessions: row.get(0)?,
                    finished_sessions: row.get(1)?,
                    completed_all_cycles: row.get(2)?,
                    total_elapsed_secs: row.get(3)?,
                    ..Stats::default()
                })
            },
        )?;

        let (today_sessions, today_elapsed_secs) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(elapsed_secs), 0)
             FROM sessions WHERE started_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_sessions = today_sessions;
        stats.today_elapsed_secs = today_elapsed_secs;

        stats.stage_changes =
            conn.query_row("SELECT COUNT(*) FROM stage_changes", [], |row| row.get(0))?;

        Ok(stats)
    }
}

impl TelemetrySink for SessionLog {
    fn record(&self, event: &Event) {
        if let Err(err) = self.append(event) {
            tracing::warn!(
                kind = event.kind(),
                session_id = %event.session_id(),
                %err,
                "failed to write session log"
            );
        }
    }
}

fn parse_time(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionSummary> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let stop_reason = row
        .get::<_, Option<String>>(8)?
        .and_then(|raw| StopReason::parse(&raw));
    Ok(SessionSummary {
        id,
        durations: StageDurations {
            inhale: row.get(1)?,
            hold: row.get(2)?,
            exhale: row.get(3)?,
            silence: row.get(4)?,
        },
        started_at: parse_time(row.get(5)?)?,
        stopped_at: row.get::<_, Option<String>>(6)?.map(parse_time).transpose()?,
        elapsed_secs: row.get(7)?,
        stop_reason,
        stage_changes: row.get(9)?,
    })
}
