//! Events command for listing a scoring's events in time order.

use std::io::Write;

use anyhow::Result;
use hs_core::{Bounds, EventId};
use hs_db::Database;
use serde::Serialize;

use super::util::{Scoring, describe_bounds};
use crate::Config;

#[derive(Debug, Serialize)]
struct EventRow {
    id: EventId,
    type_id: u8,
    label: String,
    #[serde(flatten)]
    bounds: Bounds,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    recording: &str,
    json: bool,
) -> Result<()> {
    let scoring = Scoring::open(db, config, recording)?;
    let catalog = scoring.catalog();
    let rows: Vec<EventRow> = scoring
        .session
        .store()
        .list_events()
        .map(|event| EventRow {
            id: event.id,
            type_id: event.category.value(),
            label: catalog.label(event.category),
            bounds: event.bounds,
        })
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    writeln!(writer, "{:<4}{:<10}{:<8}TIME", "ID", "TYPE", "KIND")?;
    for row in rows {
        writeln!(
            writer,
            "{:<4}{:<10}{:<8}{}",
            row.id.to_string(),
            row.label,
            row.bounds.kind().as_str(),
            describe_bounds(&row.bounds)
        )?;
    }
    Ok(())
}
