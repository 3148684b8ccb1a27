//! Status command for showing stored scorings.

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;
use hs_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let scorings = db.list_scorings()?;

    writeln!(writer, "Sleep scoring status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Scorer:   {}", config.scorer)?;

    if scorings.is_empty() {
        writeln!(writer, "No scorings recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Scorings:")?;
    for scoring in scorings {
        writeln!(
            writer,
            "- {}: {} events, {}-stage, {}s, saved {}",
            scoring.name,
            scoring.event_count,
            scoring.stages,
            scoring.recording_duration,
            scoring
                .saved_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
    }

    Ok(())
}
