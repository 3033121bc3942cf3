//! CLI module for livefeed
//!
//! Provides the command-line interface:
//! - serve: boot the change-feed server and enter the serving loop
//! - seed: preload demo documents, then serve

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{preload_demo_documents, run_command, seed, serve};
pub use errors::{CliError, CliResult};

/// Parse arguments, initialize logging, and dispatch
pub fn run() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run_command(Cli::parse_args())
}
