//! Event type catalogs for 3- and 5-stage scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, EventKind, ScoringError};

/// Number of sleep stages scored in a session.
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageMode {
    Three,
    Five,
}

impl StageMode {
    pub const fn stage_count(self) -> u8 {
        match self {
            Self::Three => 3,
            Self::Five => 5,
        }
    }
}

impl TryFrom<i64> for StageMode {
    type Error = ScoringError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::Three),
            5 => Ok(Self::Five),
            other => Err(ScoringError::UnsupportedStageCount(other)),
        }
    }
}

impl fmt::Display for StageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stage_count())
    }
}

impl Serialize for StageMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.stage_count())
    }
}

impl<'de> Deserialize<'de> for StageMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let count = i64::deserialize(deserializer)?;
        Self::try_from(count).map_err(serde::de::Error::custom)
    }
}

/// A catalog entry describing one kind of annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType {
    pub label: Option<&'static str>,
    pub id: CategoryId,
    pub is_region: bool,
    /// Region is also bounded on the frequency axis when drawn.
    pub y_bounded: bool,
}

impl EventType {
    const fn stage(label: &'static str, id: CategoryId) -> Self {
        Self {
            label: Some(label),
            id,
            is_region: false,
            y_bounded: false,
        }
    }

    pub const fn kind(&self) -> EventKind {
        if self.is_region {
            EventKind::Region
        } else {
            EventKind::Point
        }
    }
}

const ARTIFACT: EventType = EventType {
    label: Some("Artifact"),
    id: CategoryId::ARTIFACT,
    is_region: true,
    y_bounded: false,
};

const SPINDLE: EventType = EventType {
    label: Some("Spindle"),
    id: CategoryId::SPINDLE,
    is_region: true,
    y_bounded: true,
};

static FIVE_STAGE: [EventType; 7] = [
    EventType::stage("N3", CategoryId::N3),
    EventType::stage("N2", CategoryId::N2),
    EventType::stage("N1", CategoryId::N1),
    EventType::stage("REM", CategoryId::REM),
    EventType::stage("Wake", CategoryId::WAKE),
    ARTIFACT,
    SPINDLE,
];

static THREE_STAGE: [EventType; 5] = [
    EventType::stage("NREM", CategoryId::N3),
    EventType::stage("REM", CategoryId::REM),
    EventType::stage("Wake", CategoryId::WAKE),
    ARTIFACT,
    SPINDLE,
];

/// The fixed set of event types available in a scoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    mode: StageMode,
}

impl Catalog {
    pub const fn new(mode: StageMode) -> Self {
        Self { mode }
    }

    /// Builds the catalog for a caller-supplied stage count.
    pub fn for_stage_count(numstages: i64) -> Result<Self, ScoringError> {
        StageMode::try_from(numstages).map(Self::new)
    }

    pub const fn mode(&self) -> StageMode {
        self.mode
    }

    /// All entries, ordered by category id.
    pub fn types(&self) -> &'static [EventType] {
        match self.mode {
            StageMode::Three => &THREE_STAGE,
            StageMode::Five => &FIVE_STAGE,
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&'static EventType> {
        self.types().iter().find(|t| t.id == id)
    }

    /// Looks up an entry, failing with `UnknownType` if it is not in this catalog.
    pub fn lookup(&self, id: CategoryId) -> Result<&'static EventType, ScoringError> {
        self.get(id)
            .ok_or_else(|| ScoringError::UnknownType(id.value()))
    }

    /// Case-insensitive lookup by label.
    pub fn by_label(&self, label: &str) -> Option<&'static EventType> {
        self.types()
            .iter()
            .find(|t| t.label.is_some_and(|l| l.eq_ignore_ascii_case(label)))
    }

    /// Display label for a category, falling back to the numeric code.
    pub fn label(&self, id: CategoryId) -> String {
        self.get(id)
            .and_then(|t| t.label)
            .map_or_else(|| id.to_string(), String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_count_outside_three_or_five_is_rejected() {
        assert_eq!(
            Catalog::for_stage_count(4),
            Err(ScoringError::UnsupportedStageCount(4))
        );
        assert!(Catalog::for_stage_count(3).is_ok());
        assert!(Catalog::for_stage_count(5).is_ok());
    }

    #[test]
    fn three_stage_catalog_has_no_n2_or_n1() {
        let catalog = Catalog::new(StageMode::Three);
        assert!(catalog.get(CategoryId::N2).is_none());
        assert!(catalog.get(CategoryId::N1).is_none());
        assert_eq!(catalog.label(CategoryId::N3), "NREM");
        assert_eq!(
            catalog.lookup(CategoryId::N2),
            Err(ScoringError::UnknownType(2))
        );
    }

    #[test]
    fn five_stage_catalog_ids_are_ordered_by_depth() {
        let catalog = Catalog::new(StageMode::Five);
        let ids: Vec<u8> = catalog.types().iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(catalog.label(CategoryId::N3), "N3");
    }

    #[test]
    fn region_types_are_artifact_and_spindle() {
        let catalog = Catalog::new(StageMode::Five);
        let regions: Vec<_> = catalog
            .types()
            .iter()
            .filter(|t| t.is_region)
            .map(|t| t.id)
            .collect();
        assert_eq!(regions, vec![CategoryId::ARTIFACT, CategoryId::SPINDLE]);
        assert!(catalog.lookup(CategoryId::SPINDLE).unwrap().y_bounded);
        assert!(!catalog.lookup(CategoryId::ARTIFACT).unwrap().y_bounded);
    }

    #[test]
    fn by_label_ignores_case() {
        let catalog = Catalog::new(StageMode::Five);
        assert_eq!(catalog.by_label("rem").unwrap().id, CategoryId::REM);
        assert_eq!(catalog.by_label("ARTIFACT").unwrap().id, CategoryId::ARTIFACT);
        assert!(catalog.by_label("nrem").is_none());
    }

    #[test]
    fn stage_mode_serde_roundtrip() {
        let json = serde_json::to_string(&StageMode::Three).unwrap();
        assert_eq!(json, "3");
        let parsed: StageMode = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, StageMode::Five);
        assert!(serde_json::from_str::<StageMode>("4").is_err());
    }
}
