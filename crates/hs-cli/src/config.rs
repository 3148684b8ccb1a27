//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hs_core::{Catalog, LevelSelector, ThresholdTable};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Name recorded with every saved scoring.
    pub scorer: String,

    /// Stage mode for new and loaded scorings (3 or 5).
    pub stages: i64,

    /// Resolution thresholds in seconds, `inf` first and `-inf` last.
    pub thresholds: Vec<f64>,

    /// Display name for each resolution level, coarsest first.
    pub level_names: Vec<String>,

    /// Hysteresis around level boundaries, in seconds.
    pub dead_band: f64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("hs.db"),
            scorer: "scorer".to_string(),
            stages: 5,
            thresholds: vec![f64::INFINITY, 5400.0, 300.0, f64::NEG_INFINITY],
            level_names: vec![
                "full-night".to_string(),
                "stage".to_string(),
                "microevent".to_string(),
            ],
            dead_band: 0.0,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (HS_*)
        figment = figment.merge(Env::prefixed("HS_"));

        figment.extract()
    }

    /// Checks the scoring settings before any command uses them.
    pub fn validate(&self) -> Result<()> {
        self.catalog()?;
        let table = self.threshold_table()?;
        ensure!(
            self.level_names.is_empty() || self.level_names.len() == table.level_count(),
            "{} level names configured for {} resolution levels",
            self.level_names.len(),
            table.level_count()
        );
        ensure!(
            self.dead_band.is_finite() && self.dead_band >= 0.0,
            "dead_band must be a non-negative number of seconds, got {}",
            self.dead_band
        );
        Ok(())
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::for_stage_count(self.stages)?)
    }

    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        Ok(ThresholdTable::new(self.thresholds.clone())?)
    }

    /// Level selector for a view currently showing `level`.
    pub fn level_selector(&self, level: usize) -> Result<LevelSelector> {
        Ok(LevelSelector::starting_at(
            self.threshold_table()?,
            self.dead_band,
            level,
        ))
    }

    /// Display name of a level, falling back to its index.
    pub fn level_name(&self, level: usize) -> String {
        self.level_names
            .get(level)
            .cloned()
            .unwrap_or_else(|| format!("level-{level}"))
    }
}

/// Returns the platform-specific config directory for hs.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hs"))
}

/// Returns the platform-specific data directory for hs.
///
/// On Linux: `~/.local/share/hs`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("hs"))
}
