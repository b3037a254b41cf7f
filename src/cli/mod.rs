//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - replay: Run recorded partition pages through the query pipeline
//! - order: Merge recorded partition cursors in ORDER BY order

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    build_pipeline, drain_pipeline, merge_cursors, order, replay, replay_fixture, run,
    run_command, OrderFixture, ReplayFixture, ReplayPlan,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_fixture, write_error, write_response};
