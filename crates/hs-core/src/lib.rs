//! Core annotation-timeline engine for sleep scoring.
//!
//! This crate contains the fundamental types and logic for:
//! - Event storage: stage-change points and artifact/spindle regions
//! - Reconciliation: merging events into a single hypnogram timeline
//! - Resolution selection: picking a precomputed spectrogram level for the view
//! - Persistence: encoding event state as a scoring record

pub mod catalog;
mod event;
pub mod persist;
pub mod reconcile;
pub mod resolution;
mod session;
pub mod spectrogram;
mod store;
mod types;

pub use catalog::{Catalog, EventType, StageMode};
pub use event::Event;
pub use persist::{EventRecord, RecordTime, ScoringRecord, load, load_or_seed, record_name, save};
pub use reconcile::{Breakpoint, Hypnogram, InFlight, Segment, reconcile};
pub use resolution::{LevelSelector, ThresholdTable};
pub use session::ScoringSession;
pub use spectrogram::{
    PowerMatrix, SpectrogramCache, SpectrogramLevel, SpectrogramSource, SpectrogramView,
};
pub use store::EventStore;
pub use types::{Bounds, CategoryId, EventId, EventKind, ScoringError};
