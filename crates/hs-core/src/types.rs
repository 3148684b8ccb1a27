//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the scoring engine.
///
/// All of these are local, synchronous failures. None are transient, so
/// callers should surface them rather than retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    /// A region ended before it started, or a time was not finite.
    #[error("invalid bounds: {reason}")]
    InvalidBounds { reason: String },

    /// The category id is not part of the active catalog.
    #[error("unknown event type {0} for the active catalog")]
    UnknownType(u8),

    /// Only 3- and 5-stage scoring is supported.
    #[error("unsupported stage count: {0} (expected 3 or 5)")]
    UnsupportedStageCount(i64),

    /// Point bounds were given for a region type or vice versa.
    #[error("event type {category} expects {expected} bounds")]
    KindMismatch {
        category: CategoryId,
        expected: EventKind,
    },

    /// No event with this id exists in the store.
    #[error("event {0} not found")]
    NotFound(EventId),

    /// A persisted scoring record could not be reconstructed.
    #[error("corrupt scoring record: {0}")]
    CorruptRecord(String),

    /// The resolution threshold table is malformed.
    #[error("no matching resolution level: {reason}")]
    NoMatchingLevel { reason: String },

    /// The recording duration is missing or not positive.
    #[error("recording duration must be positive, got {duration}")]
    EmptyTimeline { duration: f64 },

    /// A spectrogram level does not match its own axes.
    #[error("malformed spectrogram level {level}: {reason}")]
    MalformedSpectrogram { level: usize, reason: String },
}

/// Opaque event identifier.
///
/// Ids are assigned by the [`EventStore`](crate::EventStore) in increasing
/// order and never reused within a store. Renderers keep their own
/// id-to-view mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stage or category code from the event catalog.
///
/// Smaller stage codes denote deeper sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u8);

impl CategoryId {
    /// Deepest NREM stage (N3 in 5-stage mode, NREM in 3-stage mode).
    pub const N3: Self = Self(1);
    pub const N2: Self = Self(2);
    pub const N1: Self = Self(3);
    pub const REM: Self = Self(4);
    pub const WAKE: Self = Self(5);
    pub const ARTIFACT: Self = Self(6);
    pub const SPINDLE: Self = Self(7);

    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns true for codes that denote a sleep stage rather than a marker.
    pub const fn is_stage(self) -> bool {
        self.0 >= Self::N3.0 && self.0 <= Self::WAKE.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an event marks an instant or spans an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Point,
    Region,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Region => "region",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(Self::Point),
            "region" => Ok(Self::Region),
            _ => Err(format!("invalid event kind: {s}")),
        }
    }
}

/// Temporal extent of an event, in seconds from recording start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Bounds {
    Point { t: f64 },
    Region { start: f64, end: f64 },
}

impl Bounds {
    pub const fn point(t: f64) -> Self {
        Self::Point { t }
    }

    pub const fn region(start: f64, end: f64) -> Self {
        Self::Region { start, end }
    }

    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Point { .. } => EventKind::Point,
            Self::Region { .. } => EventKind::Region,
        }
    }

    /// Time used for ordering: the instant of a point, the start of a region.
    pub const fn start(&self) -> f64 {
        match *self {
            Self::Point { t } => t,
            Self::Region { start, .. } => start,
        }
    }

    /// Checks that all times are finite and a region is not inverted.
    pub fn validate(&self) -> Result<(), ScoringError> {
        match *self {
            Self::Point { t } if !t.is_finite() => Err(ScoringError::InvalidBounds {
                reason: format!("point time {t} is not finite"),
            }),
            Self::Region { start, end } if !start.is_finite() || !end.is_finite() => {
                Err(ScoringError::InvalidBounds {
                    reason: format!("region [{start}, {end}] is not finite"),
                })
            }
            Self::Region { start, end } if end < start => Err(ScoringError::InvalidBounds {
                reason: format!("region end {end} is before start {start}"),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_rejects_inverted_bounds() {
        assert!(Bounds::region(10.0, 5.0).validate().is_err());
        assert!(Bounds::region(5.0, 5.0).validate().is_ok());
        assert!(Bounds::region(5.0, 10.0).validate().is_ok());
    }

    #[test]
    fn bounds_reject_non_finite_times() {
        assert!(Bounds::point(f64::NAN).validate().is_err());
        assert!(Bounds::region(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for stored values"
    )]
    fn bounds_start_uses_region_start() {
        assert_eq!(Bounds::point(42.0).start(), 42.0);
        assert_eq!(Bounds::region(3.0, 9.0).start(), 3.0);
    }

    #[test]
    fn bounds_serde_is_tagged_by_kind() {
        let json = serde_json::to_string(&Bounds::region(1.0, 2.5)).unwrap();
        assert_eq!(json, r#"{"kind":"region","start":1.0,"end":2.5}"#);
        let parsed: Bounds = serde_json::from_str(r#"{"kind":"point","t":30.0}"#).unwrap();
        assert_eq!(parsed, Bounds::point(30.0));
    }

    #[test]
    fn category_is_stage_covers_stage_codes_only() {
        assert!(CategoryId::N3.is_stage());
        assert!(CategoryId::WAKE.is_stage());
        assert!(!CategoryId::ARTIFACT.is_stage());
        assert!(!CategoryId::SPINDLE.is_stage());
        assert!(!CategoryId::new(0).is_stage());
    }

    #[test]
    fn event_kind_from_str() {
        assert_eq!("point".parse::<EventKind>().unwrap(), EventKind::Point);
        assert_eq!("region".parse::<EventKind>().unwrap(), EventKind::Region);
        assert!("span".parse::<EventKind>().is_err());
    }
}
