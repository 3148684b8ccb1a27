//! Export command for writing a scoring record as JSON.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use hs_db::Database;

use crate::Config;

/// Writes the stored record to `output`, or to `writer` when no file is given.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    recording: &str,
    output: Option<&Path>,
) -> Result<()> {
    let name = hs_core::record_name(&config.scorer, recording);
    let stored = db
        .load_scoring(&name)?
        .ok_or_else(|| anyhow!("no scoring {name}"))?;
    let json = stored.record.to_json()?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(%name, path = %path.display(), "exported scoring");
            writeln!(writer, "Exported {name} to {}", path.display())?;
        }
        None => writeln!(writer, "{json}")?,
    }
    Ok(())
}
