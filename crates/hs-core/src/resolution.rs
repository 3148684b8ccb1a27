//! Resolution level selection from the view-window width.

use serde::{Deserialize, Serialize};

use crate::types::ScoringError;

/// Sentinel-bounded, strictly decreasing window-width thresholds.
///
/// Level `i` is selected when `thresholds[i] > width >= thresholds[i + 1]`,
/// so a width sitting exactly on a boundary belongs to the coarser level.
/// The table is validated once, so selection itself cannot fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ThresholdTable(Vec<f64>);

impl ThresholdTable {
    /// Validates a threshold table.
    ///
    /// Requires at least one level, `+inf` first, `-inf` last, and strictly
    /// decreasing values in between.
    pub fn new(thresholds: Vec<f64>) -> Result<Self, ScoringError> {
        let malformed = |reason: &str| ScoringError::NoMatchingLevel {
            reason: reason.to_string(),
        };

        if thresholds.len() < 2 {
            return Err(malformed("threshold table needs at least two entries"));
        }
        if thresholds.first() != Some(&f64::INFINITY) {
            return Err(malformed("threshold table must start with +inf"));
        }
        if thresholds.last() != Some(&f64::NEG_INFINITY) {
            return Err(malformed("threshold table must end with -inf"));
        }
        if !thresholds.windows(2).all(|w| w[0] > w[1]) {
            return Err(malformed("thresholds must be strictly decreasing"));
        }
        Ok(Self(thresholds))
    }

    /// Number of resolution levels the table distinguishes.
    pub fn level_count(&self) -> usize {
        self.0.len() - 1
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.0
    }

    /// Upper (exclusive) and lower (inclusive) width bounds for a level.
    pub fn bounds(&self, level: usize) -> Option<(f64, f64)> {
        Some((*self.0.get(level)?, *self.0.get(level + 1)?))
    }

    /// Picks the level for a window width.
    ///
    /// Every width that is not NaN maps to exactly one level; NaN falls back
    /// to the finest level.
    pub fn select_level(&self, width: f64) -> usize {
        self.0[1..]
            .iter()
            .position(|&lower| width >= lower)
            .unwrap_or(self.level_count() - 1)
    }
}

impl TryFrom<Vec<f64>> for ThresholdTable {
    type Error = ScoringError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThresholdTable> for Vec<f64> {
    fn from(table: ThresholdTable) -> Self {
        table.0
    }
}

/// Tracks the displayed level as the view window is resized.
///
/// With a zero dead-band this is exactly [`ThresholdTable::select_level`].
/// A positive dead-band keeps the current level until the width is more than
/// `dead_band` seconds past the boundary being crossed.
#[derive(Debug, Clone)]
pub struct LevelSelector {
    table: ThresholdTable,
    current: usize,
    dead_band: f64,
}

impl LevelSelector {
    pub const fn new(table: ThresholdTable, dead_band: f64) -> Self {
        Self {
            table,
            current: 0,
            dead_band,
        }
    }

    /// Starts from a known displayed level, clamped to the table.
    pub fn starting_at(table: ThresholdTable, dead_band: f64, level: usize) -> Self {
        let current = level.min(table.level_count() - 1);
        Self {
            table,
            current,
            dead_band,
        }
    }

    pub const fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub const fn current(&self) -> usize {
        self.current
    }

    /// Updates for a new window width, returning the new level on a switch.
    pub fn update(&mut self, width: f64) -> Option<usize> {
        let candidate = self.table.select_level(width);
        if candidate == self.current || self.within_dead_band(width) {
            return None;
        }
        tracing::debug!(from = self.current, to = candidate, width, "resolution level switch");
        self.current = candidate;
        Some(candidate)
    }

    fn within_dead_band(&self, width: f64) -> bool {
        if self.dead_band <= 0.0 {
            return false;
        }
        let Some((upper, lower)) = self.table.bounds(self.current) else {
            return false;
        };
        width < upper + self.dead_band && width >= lower - self.dead_band
    }
}
