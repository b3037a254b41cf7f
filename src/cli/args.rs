//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery replay --input <path> [--config <path>] [--page-size N] [--continuation TOKEN]
//! - aeroquery order --input <path> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroquery - replay recorded partition results through the query pipeline
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run recorded result pages through aggregate, offset and limit
    Replay {
        /// Path to the recorded fixture
        #[arg(long)]
        input: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Items requested per drain
        #[arg(long, default_value_t = 100)]
        page_size: usize,

        /// Continuation token from a previous run
        #[arg(long)]
        continuation: Option<String>,
    },

    /// Merge recorded partition cursors in ORDER BY order
    Order {
        /// Path to the recorded cursors
        #[arg(long)]
        input: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
