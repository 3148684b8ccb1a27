//! Sleep scoring CLI library.
//!
//! This crate provides the CLI interface for hypnoscore.

mod cli;
pub mod commands;
mod config;

pub use cli::{BoundsArgs, Cli, Commands, PreviewArgs};
pub use config::Config;
