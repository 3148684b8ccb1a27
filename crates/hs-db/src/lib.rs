//! Storage layer for sleep scoring records.
//!
//! Provides persistence for [`ScoringRecord`]s using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! One `scorings` row per scorer and recording, keyed by the deterministic
//! record name from [`hs_core::record_name`]. Events live in `scoring_events`,
//! one row per event, ordered by `ordinal` (the record's listing order).
//! Points use the `t` column; regions use `t_start` and `t_end`.
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use hs_core::{EventKind, EventRecord, RecordTime, ScoringError, ScoringRecord, StageMode};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for scoring {name}: {timestamp}")]
    TimestampParse {
        name: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored event row cannot be turned back into an event record.
    #[error("invalid event row {ordinal} in scoring {name}: {message}")]
    InvalidEventRow {
        name: String,
        ordinal: i64,
        message: String,
    },
    /// Stored values violate the scoring model.
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    /// The record name is already taken by another scorer or recording.
    #[error("scoring {name} belongs to {scorer} on {recording}")]
    IdentityConflict {
        name: String,
        scorer: String,
        recording: String,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Header of a stored scoring, without its events.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringSummary {
    pub name: String,
    pub scorer: String,
    pub recording: String,
    pub stages: StageMode,
    pub recording_duration: f64,
    pub saved_at: DateTime<Utc>,
    pub event_count: i64,
}

/// A stored scoring with its full record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScoring {
    pub scorer: String,
    pub recording: String,
    pub recording_duration: f64,
    pub record: ScoringRecord,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS scorings (
                name TEXT PRIMARY KEY,
                scorer TEXT NOT NULL,
                recording TEXT NOT NULL,
                stages INTEGER NOT NULL,
                recording_duration REAL NOT NULL,
                version INTEGER NOT NULL,
                saved_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scorings_recording ON scorings(recording);

            -- kind: 'point' uses t, 'region' uses t_start/t_end
            CREATE TABLE IF NOT EXISTS scoring_events (
                scoring_name TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                type_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                t REAL,
                t_start REAL,
                t_end REAL,
                PRIMARY KEY (scoring_name, ordinal),
                FOREIGN KEY (scoring_name) REFERENCES scorings(name) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Saves a record under its deterministic name, replacing any previous
    /// version. Returns the record name.
    ///
    /// Refuses with `IdentityConflict` to overwrite a row stored for a
    /// different scorer or recording.
    pub fn save_scoring(
        &mut self,
        scorer: &str,
        recording: &str,
        recording_duration: f64,
        record: &ScoringRecord,
    ) -> Result<String, DbError> {
        let name = hs_core::record_name(scorer, recording);
        let tx = self.conn.transaction()?;
        let conflicting: Option<(String, String)> = tx
            .query_row(
                "SELECT scorer, recording FROM scorings WHERE name = ?",
                [&name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .filter(|(s, r)| s != scorer || r != recording);
        if let Some((scorer, recording)) = conflicting {
            return Err(DbError::IdentityConflict {
                name,
                scorer,
                recording,
            });
        }
        tx.execute(
            "
            INSERT INTO scorings (name, scorer, recording, stages, recording_duration, version, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                stages = excluded.stages,
                recording_duration = excluded.recording_duration,
                version = excluded.version,
                saved_at = excluded.saved_at
            ",
            params![
                name,
                scorer,
                recording,
                record.stages.stage_count(),
                recording_duration,
                record.version,
                format_timestamp(record.saved_at),
            ],
        )?;
        tx.execute("DELETE FROM scoring_events WHERE scoring_name = ?", [&name])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO scoring_events (scoring_name, ordinal, type_id, kind, t, t_start, t_end)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for (ordinal, event) in (0_i64..).zip(&record.events) {
                let (t, start, end) = match event.t {
                    RecordTime::Instant(t) => (Some(t), None, None),
                    RecordTime::Span { start, end } => (None, Some(start), Some(end)),
                };
                stmt.execute(params![
                    name,
                    ordinal,
                    event.type_id,
                    event.kind.as_str(),
                    t,
                    start,
                    end,
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(%name, events = record.events.len(), "saved scoring");
        Ok(name)
    }

    /// Loads a scoring by record name. A missing name is `Ok(None)`.
    pub fn load_scoring(&self, name: &str) -> Result<Option<StoredScoring>, DbError> {
        let header = self
            .conn
            .query_row(
                "
                SELECT scorer, recording, stages, recording_duration, version, saved_at
                FROM scorings
                WHERE name = ?
                ",
                [name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((scorer, recording, stages, recording_duration, version, saved_at)) = header
        else {
            return Ok(None);
        };

        let record = ScoringRecord {
            version,
            stages: StageMode::try_from(stages)?,
            saved_at: parse_timestamp(&saved_at, name)?,
            events: self.scoring_events(name)?,
        };
        Ok(Some(StoredScoring {
            scorer,
            recording,
            recording_duration,
            record,
        }))
    }

    /// Lists stored scorings ordered by name.
    pub fn list_scorings(&self) -> Result<Vec<ScoringSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.name, s.scorer, s.recording, s.stages, s.recording_duration, s.saved_at,
                   COUNT(e.ordinal)
            FROM scorings s
            LEFT JOIN scoring_events e ON e.scoring_name = s.name
            GROUP BY s.name
            ORDER BY s.name ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            let (name, scorer, recording, stages, recording_duration, saved_at, event_count) =
                row?;
            summaries.push(ScoringSummary {
                stages: StageMode::try_from(stages)?,
                saved_at: parse_timestamp(&saved_at, &name)?,
                name,
                scorer,
                recording,
                recording_duration,
                event_count,
            });
        }
        Ok(summaries)
    }

    /// Deletes a scoring and its events. Returns whether it existed.
    pub fn delete_scoring(&mut self, name: &str) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM scorings WHERE name = ?", [name])?;
        Ok(deleted > 0)
    }

    fn scoring_events(&self, name: &str) -> Result<Vec<EventRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT ordinal, type_id, kind, t, t_start, t_end
            FROM scoring_events
            WHERE scoring_name = ?
            ORDER BY ordinal ASC
            ",
        )?;
        let rows = stmt.query_map([name], |row| {
            Ok(EventRow {
                ordinal: row.get(0)?,
                type_id: row.get(1)?,
                kind: row.get(2)?,
                t: row.get(3)?,
                start: row.get(4)?,
                end: row.get(5)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_record(name)?);
        }
        Ok(events)
    }
}

/// Raw `scoring_events` row.
struct EventRow {
    ordinal: i64,
    type_id: u8,
    kind: String,
    t: Option<f64>,
    start: Option<f64>,
    end: Option<f64>,
}

impl EventRow {
    fn into_record(self, name: &str) -> Result<EventRecord, DbError> {
        let invalid = |message: String| DbError::InvalidEventRow {
            name: name.to_string(),
            ordinal: self.ordinal,
            message,
        };
        let kind: EventKind = self.kind.parse().map_err(invalid)?;
        let t = match (kind, self.t, self.start, self.end) {
            (EventKind::Point, Some(t), None, None) => RecordTime::Instant(t),
            (EventKind::Region, None, Some(start), Some(end)) => RecordTime::Span { start, end },
            _ => return Err(invalid(format!("{kind} row has mismatched time columns"))),
        };
        Ok(EventRecord {
            type_id: self.type_id,
            kind,
            t,
        })
    }
}

fn parse_timestamp(timestamp: &str, name: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            name: name.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
