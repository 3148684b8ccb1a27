//! Init command for starting a scoring.

use std::io::Write;

use anyhow::{Result, bail};
use hs_core::EventStore;
use hs_db::Database;

use super::util::Scoring;
use crate::Config;

/// Creates a scoring seeded with Wake at time 0.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    recording: &str,
    duration: f64,
    force: bool,
) -> Result<()> {
    let name = hs_core::record_name(&config.scorer, recording);
    if !force && db.load_scoring(&name)?.is_some() {
        bail!("scoring {name} already exists; pass --force to start over");
    }

    let store = EventStore::seeded(config.catalog()?);
    let scoring = Scoring::new(config, recording, store, duration)?;
    scoring.save(db, config)?;
    tracing::info!(%name, duration, "initialized scoring");

    writeln!(writer, "Initialized {}", scoring.name)?;
    writeln!(writer, "Stages:   {}", scoring.catalog().mode())?;
    writeln!(writer, "Duration: {duration}s")?;
    Ok(())
}
