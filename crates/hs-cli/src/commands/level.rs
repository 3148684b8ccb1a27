//! Level command for previewing spectrogram resolution selection.

use std::io::Write;

use anyhow::Result;

use crate::Config;

/// Prints the level for a view of `width` seconds.
///
/// With `from`, the configured dead-band applies relative to that level.
pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    width: f64,
    from: Option<usize>,
) -> Result<()> {
    let mut selector = config.level_selector(from.unwrap_or(0))?;
    let level = match from {
        Some(_) => selector.update(width).unwrap_or_else(|| selector.current()),
        None => selector.table().select_level(width),
    };

    writeln!(writer, "{level} {}", config.level_name(level))?;
    Ok(())
}
