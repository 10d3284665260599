use std::process::ExitCode;

use clap::Parser;
use recycle_core::{CoreError, ErrorCategory, ExitStatusLike};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod prompt;

use commands::Command;

/// Reversible deletion with restore, search and retention cleanup.
#[derive(Parser, Debug)]
#[command(name = "recycle", version, about)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    let status = match cli.command.run() {
        Ok(status) => status,
        Err(err) => {
            report(&err);
            ExitStatusLike::Error
        }
    };
    ExitCode::from(status.as_code())
}

fn report(err: &anyhow::Error) {
    eprintln!("recycle: {err:#}");
    let hint = match err.downcast_ref::<CoreError>().map(CoreError::category) {
        Some(ErrorCategory::Conflict) => Some("pass --on-conflict overwrite|rename|cancel to decide"),
        Some(ErrorCategory::Permission) => Some("check the permissions of the path and its parent"),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
}
