//! Scoring session aggregate.
//!
//! Bundles the event store, the displayed resolution level and the drag in
//! progress so that every user action operates on one explicit value.
//! Callers that share a session across threads must serialize access.

use crate::reconcile::{Hypnogram, InFlight, reconcile};
use crate::resolution::LevelSelector;
use crate::spectrogram::{SpectrogramSource, SpectrogramView};
use crate::store::EventStore;
use crate::types::{Bounds, EventId, ScoringError};

/// State of one scorer working on one recording.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    store: EventStore,
    selector: LevelSelector,
    recording_duration: f64,
    drag: Option<InFlight>,
}

impl ScoringSession {
    pub fn new(
        store: EventStore,
        selector: LevelSelector,
        recording_duration: f64,
    ) -> Result<Self, ScoringError> {
        if !recording_duration.is_finite() || recording_duration <= 0.0 {
            return Err(ScoringError::EmptyTimeline {
                duration: recording_duration,
            });
        }
        Ok(Self {
            store,
            selector,
            recording_duration,
            drag: None,
        })
    }

    pub const fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EventStore {
        &mut self.store
    }

    pub const fn recording_duration(&self) -> f64 {
        self.recording_duration
    }

    /// Starts dragging an event, selecting it.
    pub fn begin_drag(&mut self, id: EventId) -> Result<(), ScoringError> {
        let bounds = self.store.get(id).ok_or(ScoringError::NotFound(id))?.bounds;
        self.store.select(Some(id))?;
        self.drag = Some(InFlight { id, bounds });
        Ok(())
    }

    /// Updates the provisional bounds of the drag in progress.
    ///
    /// Invalid bounds are rejected and the previous provisional bounds kept.
    /// Does nothing when no drag is active.
    pub fn drag_to(&mut self, bounds: Bounds) -> Result<(), ScoringError> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(());
        };
        let category = self
            .store
            .get(drag.id)
            .ok_or(ScoringError::NotFound(drag.id))?
            .category;
        self.store.validate(category, &bounds)?;
        drag.bounds = bounds;
        Ok(())
    }

    /// Applies the drag in progress to the store.
    pub fn commit_drag(&mut self) -> Result<Option<EventId>, ScoringError> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        self.store.move_event(drag.id, drag.bounds)?;
        Ok(Some(drag.id))
    }

    /// Abandons the drag in progress, leaving the store unchanged.
    pub fn cancel_drag(&mut self) -> Option<InFlight> {
        self.drag.take()
    }

    pub const fn in_flight(&self) -> Option<&InFlight> {
        self.drag.as_ref()
    }

    /// Reconciled hypnogram, including the drag in progress.
    pub fn hypnogram(&self) -> Result<Hypnogram, ScoringError> {
        reconcile(&self.store, self.recording_duration, self.drag.as_ref())
    }

    /// Reacts to a new view-window width; returns the new level on a switch.
    pub fn resize_window(&mut self, width: f64) -> Option<usize> {
        self.selector.update(width)
    }

    pub const fn current_level(&self) -> usize {
        self.selector.current()
    }

    /// Spectrogram view for the displayed level.
    pub fn displayed_view<'a, S: SpectrogramSource>(
        &self,
        source: &'a S,
        channel: usize,
    ) -> Option<SpectrogramView<'a>> {
        source.view(self.selector.current(), channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, StageMode};
    use crate::resolution::ThresholdTable;
    use crate::spectrogram::SpectrogramCache;
    use crate::spectrogram::tests::level;
    use crate::types::CategoryId;

    fn selector() -> LevelSelector {
        let table =
            ThresholdTable::new(vec![f64::INFINITY, 5400.0, 300.0, f64::NEG_INFINITY]).unwrap();
        LevelSelector::new(table, 0.0)
    }

    fn session() -> (ScoringSession, EventId, EventId) {
        let mut store = EventStore::seeded(Catalog::new(StageMode::Five));
        let n2 = store.add_event(CategoryId::N2, Bounds::point(100.0)).unwrap().id;
        let artifact = store
            .add_event(CategoryId::ARTIFACT, Bounds::region(120.0, 180.0))
            .unwrap()
            .id;
        (
            ScoringSession::new(store, selector(), 300.0).unwrap(),
            n2,
            artifact,
        )
    }

    fn times(hypnogram: &Hypnogram) -> Vec<f64> {
        hypnogram.breakpoints().iter().map(|bp| bp.time).collect()
    }

    #[test]
    fn session_requires_positive_duration() {
        let store = EventStore::seeded(Catalog::new(StageMode::Three));
        assert!(matches!(
            ScoringSession::new(store, selector(), -1.0),
            Err(ScoringError::EmptyTimeline { .. })
        ));
    }

    #[test]
    fn drag_previews_without_touching_store() {
        let (mut session, n2, _) = session();

        session.begin_drag(n2).unwrap();
        session.drag_to(Bounds::point(60.0)).unwrap();

        assert_eq!(session.store().selected(), Some(n2));
        assert_eq!(
            times(&session.hypnogram().unwrap()),
            vec![0.0, 60.0, 120.0, 180.0, 300.0]
        );
        assert_eq!(session.store().get(n2).unwrap().bounds, Bounds::point(100.0));
    }

    #[test]
    fn invalid_drag_keeps_previous_provisional_bounds() {
        let (mut session, _, artifact) = session();

        session.begin_drag(artifact).unwrap();
        session.drag_to(Bounds::region(100.0, 200.0)).unwrap();
        assert!(session.drag_to(Bounds::region(200.0, 100.0)).is_err());

        assert_eq!(
            session.in_flight().unwrap().bounds,
            Bounds::region(100.0, 200.0)
        );
    }

    #[test]
    fn commit_applies_drag_and_cancel_discards_it() {
        let (mut session, n2, artifact) = session();

        session.begin_drag(n2).unwrap();
        session.drag_to(Bounds::point(90.0)).unwrap();
        assert_eq!(session.commit_drag().unwrap(), Some(n2));
        assert_eq!(session.store().get(n2).unwrap().bounds, Bounds::point(90.0));
        assert!(session.in_flight().is_none());

        session.begin_drag(artifact).unwrap();
        session.drag_to(Bounds::region(0.0, 10.0)).unwrap();
        assert!(session.cancel_drag().is_some());
        assert_eq!(
            session.store().get(artifact).unwrap().bounds,
            Bounds::region(120.0, 180.0)
        );
        assert_eq!(session.commit_drag().unwrap(), None);
    }

    #[test]
    fn begin_drag_on_missing_event_fails() {
        let (mut session, _, _) = session();
        assert_eq!(
            session.begin_drag(EventId::new(77)),
            Err(ScoringError::NotFound(EventId::new(77)))
        );
        assert!(session.drag_to(Bounds::point(1.0)).is_ok());
    }

    #[test]
    fn resize_switches_displayed_spectrogram_level() {
        let (mut session, _, _) = session();
        let cache = SpectrogramCache::new(vec![
            level("full-night", 4, 3600.0),
            level("stage", 8, 30.0),
            level("microevent", 16, 1.0),
        ])
        .unwrap();

        assert_eq!(session.current_level(), 0);
        assert_eq!(session.resize_window(120.0), Some(2));
        let view = session.displayed_view(&cache, 0).unwrap();
        assert_eq!(view.time_axis.len(), 16);

        assert_eq!(session.resize_window(100.0), None);
        assert_eq!(session.resize_window(28_800.0), Some(0));
        assert!(session.displayed_view(&cache, 5).is_none());
    }
}
