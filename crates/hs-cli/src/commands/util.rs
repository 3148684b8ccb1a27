//! Shared utilities for CLI commands.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use fs2::FileExt;
use hs_core::{Bounds, Catalog, CategoryId, EventStore, ScoringSession};
use hs_db::Database;

use crate::Config;

/// A loaded scoring, ready for editing.
pub struct Scoring {
    pub name: String,
    pub recording: String,
    pub session: ScoringSession,
}

impl Scoring {
    /// Wraps a store in a session using the configured resolution settings.
    pub fn new(config: &Config, recording: &str, store: EventStore, duration: f64) -> Result<Self> {
        let session = ScoringSession::new(store, config.level_selector(0)?, duration)?;
        Ok(Self {
            name: hs_core::record_name(&config.scorer, recording),
            recording: recording.to_string(),
            session,
        })
    }

    /// Loads the configured scorer's scoring of `recording`.
    pub fn open(db: &Database, config: &Config, recording: &str) -> Result<Self> {
        let name = hs_core::record_name(&config.scorer, recording);
        let stored = db
            .load_scoring(&name)?
            .ok_or_else(|| anyhow!("no scoring {name}; run `hs init {recording}` first"))?;
        let store = hs_core::load(&stored.record, config.catalog()?)
            .with_context(|| format!("failed to load scoring {name}"))?;
        Self::new(config, recording, store, stored.recording_duration)
    }

    /// Saves the current store, stamped with the current time.
    pub fn save(&self, db: &mut Database, config: &Config) -> Result<()> {
        let record = hs_core::save(self.session.store());
        db.save_scoring(
            &config.scorer,
            &self.recording,
            self.session.recording_duration(),
            &record,
        )?;
        Ok(())
    }

    pub fn catalog(&self) -> &Catalog {
        self.session.store().catalog()
    }
}

/// Resolves an event type given as a label or a numeric code.
pub fn parse_event_type(catalog: &Catalog, value: &str) -> Result<CategoryId> {
    if let Some(event_type) = catalog.by_label(value) {
        return Ok(event_type.id);
    }
    let code: u8 = value.parse().map_err(|_| {
        let labels: Vec<&str> = catalog.types().iter().filter_map(|t| t.label).collect();
        anyhow!(
            "unknown event type '{value}', expected one of {}",
            labels.join(", ")
        )
    })?;
    Ok(catalog.lookup(CategoryId::new(code))?.id)
}

/// Human-readable bounds: `at 100` or `120-180`.
pub fn describe_bounds(bounds: &Bounds) -> String {
    match *bounds {
        Bounds::Point { t } => format!("at {t}"),
        Bounds::Region { start, end } => format!("{start}-{end}"),
    }
}

fn lock_path(database_path: &Path) -> PathBuf {
    let mut path = database_path.as_os_str().to_owned();
    path.push(".lock");
    PathBuf::from(path)
}

/// Takes an exclusive lock beside the database.
///
/// Held until the returned file is dropped.
pub fn lock_database(database_path: &Path) -> Result<File> {
    let lock_file =
        File::create(lock_path(database_path)).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;
    Ok(lock_file)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use hs_core::StageMode;

    pub(crate) fn config() -> Config {
        Config {
            database_path: PathBuf::from("/data/hs.db"),
            scorer: "alice".to_string(),
            ..Config::default()
        }
    }

    /// Saves a 300 s scoring of `night1`: Wake, N2 at 100, artifact 120-180, REM at 200.
    pub(crate) fn scored_night(db: &mut Database, config: &Config) {
        let mut store = EventStore::seeded(config.catalog().unwrap());
        store.add_event(CategoryId::N2, Bounds::point(100.0)).unwrap();
        store
            .add_event(CategoryId::ARTIFACT, Bounds::region(120.0, 180.0))
            .unwrap();
        store.add_event(CategoryId::REM, Bounds::point(200.0)).unwrap();
        Scoring::new(config, "night1", store, 300.0)
            .unwrap()
            .save(db, config)
            .unwrap();
    }

    #[test]
    fn event_type_accepts_label_or_code() {
        let catalog = Catalog::new(StageMode::Five);
        assert_eq!(parse_event_type(&catalog, "rem").unwrap(), CategoryId::REM);
        assert_eq!(parse_event_type(&catalog, "6").unwrap(), CategoryId::ARTIFACT);
        assert!(parse_event_type(&catalog, "Stage9").is_err());
    }

    #[test]
    fn numeric_code_must_exist_in_catalog() {
        let catalog = Catalog::new(StageMode::Three);
        assert_eq!(parse_event_type(&catalog, "NREM").unwrap(), CategoryId::N3);
        assert!(parse_event_type(&catalog, "2").is_err());
    }

    #[test]
    fn lock_file_sits_beside_database() {
        assert_eq!(
            lock_path(Path::new("/data/hs.db")),
            PathBuf::from("/data/hs.db.lock")
        );
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("hs.db");

        let first = lock_database(&db_path).unwrap();
        drop(first);
        let second = lock_database(&db_path);
        assert!(second.is_ok());
    }

    #[test]
    fn open_missing_scoring_suggests_init() {
        let db = Database::open_in_memory().unwrap();
        let err = Scoring::open(&db, &config(), "night1").err().unwrap();
        assert!(err.to_string().contains("hs init night1"), "{err}");
    }
}
