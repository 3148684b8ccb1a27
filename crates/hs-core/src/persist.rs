//! Scoring record encoding.
//!
//! A [`ScoringRecord`] is the durable form of an [`EventStore`]: every event's
//! category, kind and bounds in listing order. Selection is transient and is
//! not saved. Storage of the record itself (file, database) is up to the
//! caller.

use std::fmt::Write as _;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, StageMode};
use crate::store::EventStore;
use crate::types::{Bounds, CategoryId, EventKind, ScoringError};

/// Current record format version.
pub const RECORD_VERSION: u32 = 1;

/// Serialized scoring state for one scorer and one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRecord {
    pub version: u32,
    pub stages: StageMode,
    pub saved_at: DateTime<Utc>,
    pub events: Vec<EventRecord>,
}

/// One persisted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub type_id: u8,
    pub kind: EventKind,
    pub t: RecordTime,
}

/// Event time: a bare number for points, `{start, end}` for regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTime {
    Instant(f64),
    Span { start: f64, end: f64 },
}

impl EventRecord {
    fn from_bounds(category: CategoryId, bounds: Bounds) -> Self {
        let t = match bounds {
            Bounds::Point { t } => RecordTime::Instant(t),
            Bounds::Region { start, end } => RecordTime::Span { start, end },
        };
        Self {
            type_id: category.value(),
            kind: bounds.kind(),
            t,
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        match (self.kind, self.t) {
            (EventKind::Point, RecordTime::Instant(t)) => Some(Bounds::point(t)),
            (EventKind::Region, RecordTime::Span { start, end }) => Some(Bounds::region(start, end)),
            _ => None,
        }
    }
}

impl ScoringRecord {
    /// Encodes the store with an explicit save time.
    pub fn from_store(store: &EventStore, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: RECORD_VERSION,
            stages: store.catalog().mode(),
            saved_at,
            events: store
                .list_events()
                .map(|e| EventRecord::from_bounds(e.category, e.bounds))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a record, reporting malformed JSON as `CorruptRecord`.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        serde_json::from_str(json).map_err(|e| ScoringError::CorruptRecord(e.to_string()))
    }
}

/// Encodes the store, stamped with the current time.
///
/// The stamp is truncated to milliseconds, the precision records keep in
/// storage.
pub fn save(store: &EventStore) -> ScoringRecord {
    ScoringRecord::from_store(store, Utc::now().trunc_subsecs(3))
}

/// Rebuilds an event store from a record for the active catalog.
///
/// Fails with `CorruptRecord` if the record was written for another stage
/// mode, references a category outside the catalog, has inverted region
/// bounds, or pairs a kind with the wrong time shape.
pub fn load(record: &ScoringRecord, catalog: Catalog) -> Result<EventStore, ScoringError> {
    if record.version > RECORD_VERSION {
        return Err(ScoringError::CorruptRecord(format!(
            "unsupported record version {}",
            record.version
        )));
    }
    if record.stages != catalog.mode() {
        return Err(ScoringError::CorruptRecord(format!(
            "record uses {}-stage scoring, session uses {}-stage",
            record.stages,
            catalog.mode()
        )));
    }

    let mut store = EventStore::new(catalog);
    for (index, event) in record.events.iter().enumerate() {
        let bounds = event.bounds().ok_or_else(|| {
            ScoringError::CorruptRecord(format!(
                "event {index}: {} kind does not match its time value",
                event.kind
            ))
        })?;
        store
            .add_event(CategoryId::new(event.type_id), bounds)
            .map_err(|e| ScoringError::CorruptRecord(format!("event {index}: {e}")))?;
    }

    tracing::info!(events = store.len(), stages = %catalog.mode(), "loaded scoring record");
    Ok(store)
}

/// Loads an existing record, or seeds a fresh session when there is none.
pub fn load_or_seed(
    record: Option<&ScoringRecord>,
    catalog: Catalog,
) -> Result<EventStore, ScoringError> {
    match record {
        Some(record) => load(record, catalog),
        None => {
            tracing::info!("no scoring record, starting fresh session");
            Ok(EventStore::seeded(catalog))
        }
    }
}

/// Deterministic record name for a scorer and a source recording.
///
/// Both identities are kept whole, including any directory in the recording
/// path. Bytes outside `[A-Za-z0-9_-]` are percent-escaped, so the `.`
/// separators are unambiguous and distinct identities never share a name.
pub fn record_name(scorer: &str, recording: &str) -> String {
    format!("{}.{}.scoring", escape(recording), escape(scorer))
}

fn escape(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "%{byte:02X}");
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use chrono::TimeZone;
    use serde_json::json;

    fn saved_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn scored_night() -> EventStore {
        let mut store = EventStore::seeded(Catalog::new(StageMode::Five));
        store.add_event(CategoryId::REM, Bounds::point(200.0)).unwrap();
        store.add_event(CategoryId::N2, Bounds::point(100.0)).unwrap();
        store
            .add_event(CategoryId::ARTIFACT, Bounds::region(120.0, 180.0))
            .unwrap();
        store
            .add_event(CategoryId::SPINDLE, Bounds::region(130.0, 131.5))
            .unwrap();
        store.add_event(CategoryId::N1, Bounds::point(200.0)).unwrap();
        store
    }

    #[test]
    fn record_encodes_points_as_numbers_and_regions_as_spans() {
        let mut store = EventStore::seeded(Catalog::new(StageMode::Five));
        store
            .add_event(CategoryId::ARTIFACT, Bounds::region(120.0, 180.0))
            .unwrap();

        let record = ScoringRecord::from_store(&store, saved_at());

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "version": 1,
                "stages": 5,
                "savedAt": "2025-01-01T00:00:00Z",
                "events": [
                    {"typeId": 5, "kind": "point", "t": 0.0},
                    {"typeId": 6, "kind": "region", "t": {"start": 120.0, "end": 180.0}}
                ]
            })
        );
    }

    #[test]
    fn save_orders_events_by_time_and_omits_selection() {
        let mut store = scored_night();
        let selected = store.list_events().nth(2).unwrap().id;
        store.select(Some(selected)).unwrap();

        let record = save(&store);
        let starts: Vec<f64> = record
            .events
            .iter()
            .map(|e| match e.t {
                RecordTime::Instant(t) => t,
                RecordTime::Span { start, .. } => start,
            })
            .collect();

        assert_eq!(starts, vec![0.0, 100.0, 120.0, 130.0, 200.0, 200.0]);
        assert_eq!(record.saved_at.timestamp_subsec_nanos() % 1_000_000, 0);
        let json = record.to_json().unwrap();
        assert!(!json.contains("selected"));
    }

    #[test]
    fn reload_reproduces_reconciled_timeline() {
        let store = scored_night();
        let json = save(&store).to_json().unwrap();

        let record = ScoringRecord::from_json(&json).unwrap();
        let reloaded = load(&record, Catalog::new(StageMode::Five)).unwrap();

        assert_eq!(reloaded.len(), store.len());
        assert_eq!(reloaded.selected(), None);
        assert_eq!(
            reconcile(&reloaded, 300.0, None).unwrap(),
            reconcile(&store, 300.0, None).unwrap()
        );
    }

    #[test]
    fn load_rejects_unknown_type_for_active_mode() {
        let mut record = ScoringRecord::from_store(
            &EventStore::seeded(Catalog::new(StageMode::Three)),
            saved_at(),
        );
        record.events.push(EventRecord {
            type_id: 2,
            kind: EventKind::Point,
            t: RecordTime::Instant(60.0),
        });

        let err = load(&record, Catalog::new(StageMode::Three)).unwrap_err();
        assert!(matches!(err, ScoringError::CorruptRecord(ref msg) if msg.contains("event 1")));
    }

    #[test]
    fn load_rejects_inverted_region() {
        let json = r#"{
            "version": 1,
            "stages": 5,
            "savedAt": "2025-01-01T00:00:00Z",
            "events": [{"typeId": 6, "kind": "region", "t": {"start": 180.0, "end": 120.0}}]
        }"#;
        let record = ScoringRecord::from_json(json).unwrap();
        assert!(matches!(
            load(&record, Catalog::new(StageMode::Five)),
            Err(ScoringError::CorruptRecord(_))
        ));
    }

    #[test]
    fn load_rejects_kind_and_time_shape_mismatch() {
        let json = r#"{
            "version": 1,
            "stages": 5,
            "savedAt": "2025-01-01T00:00:00Z",
            "events": [{"typeId": 5, "kind": "point", "t": {"start": 0.0, "end": 1.0}}]
        }"#;
        let record = ScoringRecord::from_json(json).unwrap();
        assert!(load(&record, Catalog::new(StageMode::Five)).is_err());
    }

    #[test]
    fn load_rejects_stage_mode_mismatch() {
        let record = ScoringRecord::from_store(
            &EventStore::seeded(Catalog::new(StageMode::Five)),
            saved_at(),
        );
        assert!(matches!(
            load(&record, Catalog::new(StageMode::Three)),
            Err(ScoringError::CorruptRecord(_))
        ));
    }

    #[test]
    fn malformed_json_is_corrupt_record() {
        assert!(matches!(
            ScoringRecord::from_json("{\"version\": 1"),
            Err(ScoringError::CorruptRecord(_))
        ));
        assert!(ScoringRecord::from_json(r#"{"version":1,"stages":4,"savedAt":"2025-01-01T00:00:00Z","events":[]}"#).is_err());
    }

    #[test]
    fn missing_record_seeds_default_wake() {
        let store = load_or_seed(None, Catalog::new(StageMode::Three)).unwrap();
        let events: Vec<_> = store.list_events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, CategoryId::WAKE);
    }

    #[test]
    fn record_name_is_deterministic_and_escaped() {
        assert_eq!(record_name("alice", "night1"), "night1.alice.scoring");
        assert_eq!(
            record_name("alice", "/data/night 01.edf"),
            "%2Fdata%2Fnight%2001%2Eedf.alice.scoring"
        );
        assert_eq!(
            record_name("alice", "/data/night 01.edf"),
            record_name("alice", "/data/night 01.edf")
        );
        assert_eq!(record_name("", "s1"), "s1..scoring");
    }

    #[test]
    fn record_name_keeps_distinct_identities_apart() {
        assert_ne!(
            record_name("alice", "/site_a/night1.edf"),
            record_name("alice", "/site_b/night1.edf")
        );
        assert_ne!(record_name("a.b", "x"), record_name("a_b", "x"));
        assert_ne!(record_name("a%2Eb", "x"), record_name("a.b", "x"));
        assert_ne!(record_name("b", "a.x"), record_name("x.b", "a"));
        assert_ne!(record_name("alice", "night1"), record_name("alice", "night1.edf"));
        assert_eq!(record_name("z", "caf\u{e9}"), "caf%C3%A9.z.scoring");
    }
}
