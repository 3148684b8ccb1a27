//! In-memory event store for a scoring session.
//!
//! The store validates every mutation against the active [`Catalog`] before
//! applying it, so a rejected call leaves the store untouched. Reconciling
//! the hypnogram is a separate, explicit step (see [`crate::reconcile`]).

use crate::catalog::Catalog;
use crate::event::Event;
use crate::types::{Bounds, CategoryId, EventId, ScoringError};

/// Owns every annotation event of a session plus the current selection.
#[derive(Debug, Clone)]
pub struct EventStore {
    catalog: Catalog,
    events: Vec<Event>,
    next_id: u64,
    selected: Option<EventId>,
}

impl EventStore {
    /// Creates an empty store.
    pub const fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            events: Vec::new(),
            next_id: 1,
            selected: None,
        }
    }

    /// Creates a fresh-session store holding the default Wake event at t = 0.
    pub fn seeded(catalog: Catalog) -> Self {
        let mut store = Self::new(catalog);
        store.push(CategoryId::WAKE, Bounds::point(0.0));
        store
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Checks that `bounds` are acceptable for an event of `category`.
    pub fn validate(&self, category: CategoryId, bounds: &Bounds) -> Result<(), ScoringError> {
        let event_type = self.catalog.lookup(category)?;
        bounds.validate()?;
        if bounds.kind() != event_type.kind() {
            return Err(ScoringError::KindMismatch {
                category,
                expected: event_type.kind(),
            });
        }
        Ok(())
    }

    /// Adds a new event and returns it.
    pub fn add_event(&mut self, category: CategoryId, bounds: Bounds) -> Result<Event, ScoringError> {
        self.validate(category, &bounds)?;
        let id = self.push(category, bounds);
        tracing::debug!(event_id = %id, %category, ?bounds, "added event");
        Ok(Event {
            id,
            category,
            bounds,
        })
    }

    /// Adds a detector batch as new events of one category.
    ///
    /// Every bound is validated before any event is appended. No
    /// deduplication is done against existing events.
    pub fn insert_batch(
        &mut self,
        category: CategoryId,
        batch: &[Bounds],
    ) -> Result<Vec<EventId>, ScoringError> {
        for bounds in batch {
            self.validate(category, bounds)?;
        }
        let ids: Vec<EventId> = batch.iter().map(|b| self.push(category, *b)).collect();
        tracing::debug!(%category, count = ids.len(), "inserted detector batch");
        Ok(ids)
    }

    /// Replaces an event's bounds in place. Does not reorder or reconcile.
    pub fn move_event(&mut self, id: EventId, bounds: Bounds) -> Result<(), ScoringError> {
        let index = self.position(id)?;
        self.validate(self.events[index].category, &bounds)?;
        self.events[index].bounds = bounds;
        tracing::debug!(event_id = %id, ?bounds, "moved event");
        Ok(())
    }

    /// Removes an event, clearing the selection if it pointed at it.
    pub fn delete_event(&mut self, id: EventId) -> Result<Event, ScoringError> {
        let index = self.position(id)?;
        let removed = self.events.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::debug!(event_id = %id, "deleted event");
        Ok(removed)
    }

    /// Selects one event, or clears the selection with `None`.
    pub fn select(&mut self, id: Option<EventId>) -> Result<(), ScoringError> {
        if let Some(id) = id {
            self.position(id)?;
        }
        self.selected = id;
        Ok(())
    }

    pub const fn selected(&self) -> Option<EventId> {
        self.selected
    }

    pub fn is_selected(&self, id: EventId) -> bool {
        self.selected == Some(id)
    }

    /// Events ascending by start time, ties in insertion order.
    ///
    /// The returned iterator is a snapshot of the ordering and can be cloned
    /// to restart it.
    pub fn list_events(&self) -> impl Iterator<Item = &Event> + Clone + '_ {
        let mut order: Vec<usize> = (0..self.events.len()).collect();
        order.sort_by(|&a, &b| self.events[a].start().total_cmp(&self.events[b].start()));
        order.into_iter().map(move |i| &self.events[i])
    }

    fn position(&self, id: EventId) -> Result<usize, ScoringError> {
        self.events
            .iter()
            .position(|e| e.id == id)
            .ok_or(ScoringError::NotFound(id))
    }

    fn push(&mut self, category: CategoryId, bounds: Bounds) -> EventId {
        let id = EventId::new(self.next_id);
        self.next_id += 1;
        self.events.push(Event {
            id,
            category,
            bounds,
        });
        id
    }
}
