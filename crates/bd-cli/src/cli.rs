//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Exclusive time breakdown of root spans.
///
/// Reads root spans, nested slices and thread states from a JSON document and
/// decomposes every root into gapless, non-overlapping, attributed intervals.
#[derive(Debug, Parser)]
#[command(name = "bd", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of worker threads for per-context processing.
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decompose every root span into exclusive, attributed records.
    Run {
        /// Input JSON document, or `-` for stdin.
        input: PathBuf,

        /// Output as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the innermost-active slice sequence of every root span.
    Flatten {
        /// Input JSON document, or `-` for stdin.
        input: PathBuf,

        /// Output as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show total exclusive time per cause for every root span.
    Summary {
        /// Input JSON document, or `-` for stdin.
        input: PathBuf,

        /// Output as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}
