//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hs_core::Bounds;

/// Sleep scoring from the command line.
///
/// Keeps one scoring per scorer and recording: stage changes, artifacts and
/// spindles, reconciled into a hypnogram on demand.
#[derive(Debug, Parser)]
#[command(name = "hs", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a scoring for a recording, seeded with Wake at 0.
    Init {
        /// Recording file or name, given the same way to later commands.
        recording: String,

        /// Recording duration in seconds.
        #[arg(long)]
        duration: f64,

        /// Replace an existing scoring.
        #[arg(long)]
        force: bool,
    },

    /// Show the database and stored scorings.
    Status,

    /// Add a stage change or marker.
    Add {
        recording: String,

        /// Event type label (e.g. N2, REM, Artifact) or numeric code.
        event_type: String,

        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Move an event to new bounds.
    Move {
        recording: String,

        /// Event id as shown by `hs events`.
        id: u64,

        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Delete an event.
    Delete {
        recording: String,

        /// Event id as shown by `hs events`.
        id: u64,
    },

    /// List events in time order.
    Events {
        recording: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the reconciled hypnogram.
    Hypnogram {
        recording: String,

        /// Preview a move of this event without saving it.
        #[arg(long, requires = "preview")]
        preview_id: Option<u64>,

        #[command(flatten)]
        preview: PreviewArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Insert detector output (a JSON array of bounds) as one batch.
    Detect {
        recording: String,

        /// Event type label or numeric code for every detection.
        event_type: String,

        /// JSON file with detections.
        #[arg(long)]
        input: PathBuf,
    },

    /// Show the spectrogram level for a view-window width.
    Level {
        /// Visible window width in seconds.
        width: f64,

        /// Level currently displayed, for dead-band hysteresis.
        #[arg(long)]
        from: Option<usize>,
    },

    /// Write the scoring record as JSON.
    Export {
        recording: String,

        /// Output file (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replace a scoring with a JSON scoring record.
    Import {
        recording: String,

        /// Scoring record file.
        #[arg(long)]
        input: PathBuf,

        /// Recording duration in seconds (defaults to the stored one).
        #[arg(long)]
        duration: Option<f64>,
    },
}

/// A point (`--at`) or a region (`--start` and `--end`).
#[derive(Debug, Clone, Copy, Args)]
#[group(required = true, multiple = true)]
pub struct BoundsArgs {
    /// Time of a point event, in seconds.
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub at: Option<f64>,

    /// Start of a region, in seconds.
    #[arg(long, requires = "end")]
    pub start: Option<f64>,

    /// End of a region, in seconds.
    #[arg(long, requires = "start")]
    pub end: Option<f64>,
}

impl BoundsArgs {
    pub fn to_bounds(self) -> Option<Bounds> {
        match (self.at, self.start, self.end) {
            (Some(t), None, None) => Some(Bounds::point(t)),
            (None, Some(start), Some(end)) => Some(Bounds::region(start, end)),
            _ => None,
        }
    }
}

/// Provisional bounds for a previewed move.
#[derive(Debug, Clone, Copy, Args)]
#[group(id = "preview", multiple = true, requires = "preview_id")]
pub struct PreviewArgs {
    /// Previewed time of a point event.
    #[arg(long = "preview-at", conflicts_with_all = ["preview_start", "preview_end"])]
    pub preview_at: Option<f64>,

    /// Previewed region start.
    #[arg(long = "preview-start", requires = "preview_end")]
    pub preview_start: Option<f64>,

    /// Previewed region end.
    #[arg(long = "preview-end", requires = "preview_start")]
    pub preview_end: Option<f64>,
}

impl PreviewArgs {
    pub fn to_bounds(self) -> Option<Bounds> {
        BoundsArgs {
            at: self.preview_at,
            start: self.preview_start,
            end: self.preview_end,
        }
        .to_bounds()
    }
}
