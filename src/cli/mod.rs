//! CLI module for recmgr
//!
//! - demo: composer example over two indexes
//! - stress: concurrent consistency check

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{demo, run, run_command, stress, StressReport};
pub use errors::{CliError, CliResult};
