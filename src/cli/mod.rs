//! Command line for the CAG cache
//!
//! - `serve`: run the HTTP API over one cache engine
//! - `check-snapshot`: validate a snapshot file offline

pub mod check_snapshot;
pub mod serve;

use clap::{Parser, Subcommand};

/// Cache-augmented generation layer with exact and semantic lookups
#[derive(Parser)]
#[command(name = "cag-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(serve::ServeArgs),

    /// Validate a snapshot file and print what it contains
    CheckSnapshot(check_snapshot::CheckSnapshotArgs),
}
