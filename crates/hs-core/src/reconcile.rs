//! Hypnogram reconciliation.
//!
//! Merges stage-change points and artifact regions into a single
//! piecewise-constant stage timeline covering the recording.
//!
//! # Algorithm Summary
//!
//! 1. Collect stage breakpoints from point events carrying a stage code and
//!    artifact intervals from artifact regions. Other regions (spindles) are
//!    markers only and do not affect the hypnogram.
//! 2. Apply the in-flight drag, if any, and re-sort stage points by time with
//!    insertion order breaking ties, exactly as `list_events` orders them.
//!    A dragged artifact uses its provisional interval.
//! 3. Start the timeline at zero with Wake if no stage point does, then append
//!    a terminal breakpoint at the recording end carrying the stage active
//!    there.
//! 4. Merge overlapping artifact intervals. For each, record the stage active
//!    at its end, drop stage breakpoints inside `[start, end)`, then insert
//!    `(start, Artifact)` and `(end, resumed stage)`.
//! 5. Sort by time and collapse equal times so breakpoints strictly increase.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::Event;
use crate::store::EventStore;
use crate::types::{Bounds, CategoryId, EventId, ScoringError};

/// A stage transition at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakpoint {
    /// Seconds from recording start.
    pub time: f64,
    /// Stage (or artifact) active from this time on.
    pub stage: CategoryId,
}

/// A half-open span `[start, end)` of constant stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub stage: CategoryId,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// The event currently being dragged, with its provisional bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InFlight {
    pub id: EventId,
    pub bounds: Bounds,
}

/// Reconciled stage timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hypnogram {
    breakpoints: Vec<Breakpoint>,
    duration: f64,
}

impl Hypnogram {
    /// Breakpoints in strictly increasing time order; the last one sits at
    /// the recording end.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    /// Stage active at `time`, or `None` before the first breakpoint.
    pub fn stage_at(&self, time: f64) -> Option<CategoryId> {
        hold_previous(&self.breakpoints, time)
    }

    /// Constant-stage spans between consecutive breakpoints.
    pub fn segments(&self) -> Vec<Segment> {
        self.breakpoints
            .windows(2)
            .map(|pair| Segment {
                start: pair[0].time,
                end: pair[1].time,
                stage: pair[0].stage,
            })
            .collect()
    }

    /// Seconds spent in each stage (artifact included).
    pub fn stage_durations(&self) -> BTreeMap<CategoryId, f64> {
        let mut totals = BTreeMap::new();
        for segment in self.segments() {
            *totals.entry(segment.stage).or_insert(0.0) += segment.duration();
        }
        totals
    }
}

/// Precedence when several breakpoints land on the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Resumed,
    Stage,
    Artifact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Interval {
    start: f64,
    end: f64,
}

/// Computes the reconciled hypnogram for the store's current events.
///
/// `in_flight` is the event being dragged, if any; the store itself is not
/// modified. Fails only when `recording_duration` is not a positive number.
pub fn reconcile(
    store: &EventStore,
    recording_duration: f64,
    in_flight: Option<&InFlight>,
) -> Result<Hypnogram, ScoringError> {
    if !recording_duration.is_finite() || recording_duration <= 0.0 {
        return Err(ScoringError::EmptyTimeline {
            duration: recording_duration,
        });
    }

    let mut points: Vec<(EventId, Breakpoint)> = store
        .list_events()
        .filter(|e| e.is_stage_change())
        .map(|e| {
            (
                e.id,
                Breakpoint {
                    time: e.start(),
                    stage: e.category,
                },
            )
        })
        .collect();
    let mut artifacts: Vec<(EventId, Interval)> = store
        .list_events()
        .filter(|e| e.is_artifact())
        .filter_map(|e| interval_of(&e.bounds).map(|i| (e.id, i)))
        .collect();

    if let Some(flight) = in_flight {
        apply_in_flight(store, flight, &mut points, &mut artifacts);
    }

    let mut stages: Vec<Breakpoint> = points.into_iter().map(|(_, bp)| bp).collect();
    clip_to_recording(&mut stages, recording_duration);
    if stages.first().is_none_or(|bp| bp.time > 0.0) {
        stages.insert(
            0,
            Breakpoint {
                time: 0.0,
                stage: CategoryId::WAKE,
            },
        );
    }
    let terminal = Breakpoint {
        time: recording_duration,
        stage: hold_previous(&stages, recording_duration).unwrap_or(CategoryId::WAKE),
    };

    let occluding = merge_intervals(
        artifacts.into_iter().map(|(_, interval)| interval),
        recording_duration,
    );

    let mut ranked: Vec<(Breakpoint, Rank)> = Vec::with_capacity(stages.len() + 1);
    let mut inserted: Vec<(Breakpoint, Rank)> = Vec::with_capacity(occluding.len() * 2);
    for interval in &occluding {
        let resumed = hold_previous(&stages, interval.end).unwrap_or(CategoryId::WAKE);
        inserted.push((
            Breakpoint {
                time: interval.start,
                stage: CategoryId::ARTIFACT,
            },
            Rank::Artifact,
        ));
        inserted.push((
            Breakpoint {
                time: interval.end,
                stage: resumed,
            },
            Rank::Resumed,
        ));
    }

    ranked.extend(
        stages
            .into_iter()
            .filter(|bp| {
                !occluding
                    .iter()
                    .any(|i| bp.time >= i.start && bp.time < i.end)
            })
            .map(|bp| (bp, Rank::Stage)),
    );
    ranked.push((terminal, Rank::Stage));
    ranked.extend(inserted);

    Ok(Hypnogram {
        breakpoints: collapse_equal_times(ranked),
        duration: recording_duration,
    })
}

/// Substitutes the dragged event's provisional bounds.
fn apply_in_flight(
    store: &EventStore,
    flight: &InFlight,
    points: &mut [(EventId, Breakpoint)],
    artifacts: &mut [(EventId, Interval)],
) {
    let Some(event) = store.get(flight.id) else {
        tracing::warn!(event_id = %flight.id, "in-flight event not in store, ignoring");
        return;
    };
    if store.validate(event.category, &flight.bounds).is_err() {
        tracing::warn!(event_id = %flight.id, bounds = ?flight.bounds, "in-flight bounds rejected, ignoring");
        return;
    }

    if event.is_stage_change() {
        move_stage_breakpoint(event, flight.bounds.start(), points);
    } else if event.is_artifact() {
        let Some(provisional) = interval_of(&flight.bounds) else {
            return;
        };
        if let Some(slot) = artifacts.iter_mut().find(|(id, _)| *id == flight.id) {
            slot.1 = provisional;
        }
    }
}

/// Moves the event's breakpoint and restores `(time, insertion)` order.
///
/// Ids grow with insertion, so ordering ties by id matches the committed
/// listing.
fn move_stage_breakpoint(event: &Event, new_time: f64, points: &mut [(EventId, Breakpoint)]) {
    let Some((_, bp)) = points.iter_mut().find(|(id, _)| *id == event.id) else {
        tracing::warn!(event_id = %event.id, "no breakpoint for dragged event, ignoring move");
        return;
    };
    bp.time = new_time;
    points.sort_by(|a, b| a.1.time.total_cmp(&b.1.time).then(a.0.cmp(&b.0)));
}

/// Drops breakpoints after the recording end and folds any before zero into
/// a breakpoint at zero.
fn clip_to_recording(stages: &mut Vec<Breakpoint>, recording_duration: f64) {
    stages.retain(|bp| bp.time <= recording_duration);
    if let Some(last_negative) = stages.iter().rposition(|bp| bp.time < 0.0) {
        let carried = stages[last_negative].stage;
        stages.drain(..=last_negative);
        if stages.first().is_none_or(|bp| bp.time > 0.0) {
            stages.insert(
                0,
                Breakpoint {
                    time: 0.0,
                    stage: carried,
                },
            );
        }
    }
}

/// Clamps intervals to the recording and merges overlapping or touching ones.
fn merge_intervals(intervals: impl Iterator<Item = Interval>, recording_duration: f64) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals
        .map(|i| Interval {
            start: i.start.max(0.0),
            end: i.end.min(recording_duration),
        })
        .filter(|i| i.end > i.start)
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
            _ => merged.push(interval),
        }
    }
    merged
}

/// Stable sort by time, keeping the highest-ranked breakpoint at each time.
fn collapse_equal_times(mut ranked: Vec<(Breakpoint, Rank)>) -> Vec<Breakpoint> {
    ranked.sort_by(|a, b| a.0.time.total_cmp(&b.0.time));

    let mut out: Vec<(Breakpoint, Rank)> = Vec::with_capacity(ranked.len());
    for (bp, rank) in ranked {
        match out.last_mut() {
            Some(last) if last.0.time.total_cmp(&bp.time).is_eq() => {
                if rank >= last.1 {
                    *last = (bp, rank);
                }
            }
            _ => out.push((bp, rank)),
        }
    }
    out.into_iter().map(|(bp, _)| bp).collect()
}

/// Value of the last breakpoint at or before `time` (breakpoints sorted).
fn hold_previous(breakpoints: &[Breakpoint], time: f64) -> Option<CategoryId> {
    let idx = breakpoints.partition_point(|bp| bp.time <= time);
    idx.checked_sub(1).map(|i| breakpoints[i].stage)
}

fn interval_of(bounds: &Bounds) -> Option<Interval> {
    match *bounds {
        Bounds::Region { start, end } => Some(Interval { start, end }),
        Bounds::Point { .. } => None,
    }
}
