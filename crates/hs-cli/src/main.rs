use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hs_cli::commands::util::lock_database;
use hs_cli::commands::{detect, edit, events, export, hypnogram, import, init, level, status};
use hs_cli::{BoundsArgs, Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(hs_db::Database, Config)> {
    let config = load_config(config_path)?;
    create_database_dir(&config)?;

    let db = hs_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// Like `open_database`, but takes the write lock first.
///
/// The lock is held until the returned file is dropped.
fn open_database_locked(config_path: Option<&Path>) -> Result<(hs_db::Database, Config, File)> {
    let config = load_config(config_path)?;
    create_database_dir(&config)?;
    let lock = lock_database(&config.database_path)?;

    let db = hs_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config, lock))
}

fn create_database_dir(config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn bounds(args: BoundsArgs) -> Result<hs_core::Bounds> {
    args.to_bounds()
        .ok_or_else(|| anyhow!("give either --at or both --start and --end"))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Init {
            recording,
            duration,
            force,
        }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            init::run(&mut stdout, &mut db, &config, &recording, duration, force)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(config_path)?;
            status::run(&mut stdout, &db, &config)?;
        }
        Some(Commands::Add {
            recording,
            event_type,
            bounds: args,
        }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            edit::add(
                &mut stdout,
                &mut db,
                &config,
                &recording,
                &event_type,
                bounds(args)?,
            )?;
        }
        Some(Commands::Move {
            recording,
            id,
            bounds: args,
        }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            edit::move_event(&mut stdout, &mut db, &config, &recording, id, bounds(args)?)?;
        }
        Some(Commands::Delete { recording, id }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            edit::delete(&mut stdout, &mut db, &config, &recording, id)?;
        }
        Some(Commands::Events { recording, json }) => {
            let (db, config) = open_database(config_path)?;
            events::run(&mut stdout, &db, &config, &recording, json)?;
        }
        Some(Commands::Hypnogram {
            recording,
            preview_id,
            preview,
            json,
        }) => {
            let (db, config) = open_database(config_path)?;
            let preview = match preview_id {
                Some(id) => {
                    let bounds = preview.to_bounds().ok_or_else(|| {
                        anyhow!("give either --preview-at or both --preview-start and --preview-end")
                    })?;
                    Some((id, bounds))
                }
                None => None,
            };
            hypnogram::run(&mut stdout, &db, &config, &recording, preview, json)?;
        }
        Some(Commands::Detect {
            recording,
            event_type,
            input,
        }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            detect::run(&mut stdout, &mut db, &config, &recording, &event_type, &input)?;
        }
        Some(Commands::Level { width, from }) => {
            // Level selection needs no database
            let config = load_config(config_path)?;
            level::run(&mut stdout, &config, width, from)?;
        }
        Some(Commands::Export { recording, output }) => {
            let (db, config) = open_database(config_path)?;
            export::run(&mut stdout, &db, &config, &recording, output.as_deref())?;
        }
        Some(Commands::Import {
            recording,
            input,
            duration,
        }) => {
            let (mut db, config, _lock) = open_database_locked(config_path)?;
            import::run(&mut stdout, &mut db, &config, &recording, &input, duration)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
