//! Add, move and delete commands for single events.

use std::io::Write;

use anyhow::Result;
use hs_core::{Bounds, EventId};
use hs_db::Database;

use super::util::{Scoring, describe_bounds, parse_event_type};
use crate::Config;

/// Adds one event.
///
/// Ids are listing positions and are renumbered on every load, so the new
/// event's id is best read back with `hs events`.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    event_type: &str,
    bounds: Bounds,
) -> Result<()> {
    let mut scoring = Scoring::open(db, config, recording)?;
    let catalog = *scoring.catalog();
    let category = parse_event_type(&catalog, event_type)?;

    let event = scoring.session.store_mut().add_event(category, bounds)?;
    scoring.save(db, config)?;
    tracing::info!(name = %scoring.name, %category, "added event");

    writeln!(
        writer,
        "Added {} {}",
        catalog.label(event.category),
        describe_bounds(&event.bounds)
    )?;
    Ok(())
}

pub fn move_event<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    id: u64,
    bounds: Bounds,
) -> Result<()> {
    let mut scoring = Scoring::open(db, config, recording)?;
    let id = EventId::new(id);

    scoring.session.store_mut().move_event(id, bounds)?;
    scoring.save(db, config)?;
    tracing::info!(name = %scoring.name, %id, "moved event");

    writeln!(writer, "Moved event {id} {}", describe_bounds(&bounds))?;
    Ok(())
}

pub fn delete<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    id: u64,
) -> Result<()> {
    let mut scoring = Scoring::open(db, config, recording)?;
    let id = EventId::new(id);

    let event = scoring.session.store_mut().delete_event(id)?;
    scoring.save(db, config)?;
    tracing::info!(name = %scoring.name, %id, "deleted event");

    writeln!(
        writer,
        "Deleted event {id} ({} {})",
        scoring.catalog().label(event.category),
        describe_bounds(&event.bounds)
    )?;
    Ok(())
}
