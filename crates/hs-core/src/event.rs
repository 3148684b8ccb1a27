//! Annotation events placed by the scorer or by a detector.

use serde::{Deserialize, Serialize};

use crate::types::{Bounds, CategoryId, EventId, EventKind};

/// A single annotation on the recording timeline.
///
/// Selection is tracked by the owning [`EventStore`](crate::EventStore), not
/// on the event itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque identifier, unique within the store.
    pub id: EventId,
    /// Category code from the active catalog.
    pub category: CategoryId,
    /// When the event occurs, in seconds from recording start.
    pub bounds: Bounds,
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        self.bounds.kind()
    }

    /// Ordering key: point time or region start.
    pub const fn start(&self) -> f64 {
        self.bounds.start()
    }

    /// True for point events carrying a sleep stage code.
    pub const fn is_stage_change(&self) -> bool {
        matches!(self.bounds, Bounds::Point { .. }) && self.category.is_stage()
    }

    /// True for artifact regions, which occlude the hypnogram.
    pub fn is_artifact(&self) -> bool {
        matches!(self.bounds, Bounds::Region { .. }) && self.category == CategoryId::ARTIFACT
    }
}
