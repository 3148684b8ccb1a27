//! CLI subcommand implementations.

pub mod detect;
pub mod edit;
pub mod events;
pub mod export;
pub mod hypnogram;
pub mod import;
pub mod init;
pub mod level;
pub mod status;
pub mod util;
