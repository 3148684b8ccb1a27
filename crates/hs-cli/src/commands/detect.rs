//! Detect command for importing automatic detector output.
//!
//! The input file holds a JSON array of bounds, e.g.
//! `[{"kind": "region", "start": 12.5, "end": 13.4}]`. All detections are
//! inserted as one batch: if any is invalid, none are saved.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hs_core::Bounds;
use hs_db::Database;

use super::util::{Scoring, parse_event_type};
use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    event_type: &str,
    input: &Path,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let detections: Vec<Bounds> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse detections in {}", input.display()))?;

    let mut scoring = Scoring::open(db, config, recording)?;
    let catalog = *scoring.catalog();
    let category = parse_event_type(&catalog, event_type)?;

    let ids = scoring
        .session
        .store_mut()
        .insert_batch(category, &detections)?;
    scoring.save(db, config)?;
    tracing::info!(name = %scoring.name, count = ids.len(), "inserted detections");

    writeln!(
        writer,
        "Inserted {} {} events",
        ids.len(),
        catalog.label(category)
    )?;
    Ok(())
}
