//! Import command for replacing a scoring with a JSON scoring record.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use hs_core::ScoringRecord;
use hs_db::Database;

use super::util::Scoring;
use crate::Config;

/// Validates the record against the configured catalog, then saves it.
///
/// The recording duration comes from `duration` or, failing that, from the
/// scoring already stored for this recording.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    input: &Path,
    duration: Option<f64>,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let record = ScoringRecord::from_json(&content)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let store = hs_core::load(&record, config.catalog()?)
        .with_context(|| format!("failed to load {}", input.display()))?;

    let name = hs_core::record_name(&config.scorer, recording);
    let duration = match duration {
        Some(duration) => duration,
        None => db
            .load_scoring(&name)?
            .map(|stored| stored.recording_duration)
            .ok_or_else(|| anyhow!("no scoring {name} to take a duration from; pass --duration"))?,
    };

    let scoring = Scoring::new(config, recording, store, duration)?;
    scoring.save(db, config)?;
    tracing::info!(%name, events = scoring.session.store().len(), "imported scoring");

    writeln!(
        writer,
        "Imported {} events into {name}",
        scoring.session.store().len()
    )?;
    Ok(())
}
