//! CLI argument definitions using clap
//!
//! Commands:
//! - recmgr demo [--config <path>]
//! - recmgr stress [--config <path>] [--threads <n>] [--records <n>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recmgr - a multi-index in-memory record manager
#[derive(Parser, Debug)]
#[command(name = "recmgr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index a small set of composers two ways and print the results
    Demo {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run concurrent writers and readers against one group and verify it
    Stress {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of worker threads
        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Records inserted by each worker
        #[arg(long, default_value_t = 1000)]
        records: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
