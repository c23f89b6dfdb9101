//! Command-line interface of the `snowball` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snowball_common::PaperStatus;
use snowball_engine::Direction;

#[derive(Parser, Debug)]
#[command(name = "snowball", version)]
#[command(about = "Citation-graph snowballing for systematic literature reviews")]
pub struct Cli {
    /// Config file (overrides SNOWBALL_CONFIG and ./snowball.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Project statistics and iteration gate (default)
    Status,

    /// Expand the next generation
    Run {
        /// backward, forward or both (default: from config)
        direction: Option<Direction>,
    },

    /// List papers awaiting review
    Pending {
        /// Restrict to one generation
        iteration: Option<u32>,
    },

    /// Record a screening decision
    Review {
        paper_id: String,

        /// pending, included or excluded
        status: PaperStatus,

        /// Free-text notes, joined with spaces
        notes: Vec<String>,
    },

    /// Add a seed paper by DOI
    Seed { doi: String },

    /// Add a seed paper from a PDF extractor's JSON output
    SeedFromExtraction {
        #[arg(value_name = "JSON")]
        path: PathBuf,
    },

    /// Refresh citation counts of every paper
    Refresh,
}
