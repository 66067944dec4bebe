// herd entry point.
// Wires logging, verifies the gh CLI is present, and dispatches commands.

mod batch;
mod cache;
mod cli;
mod commands;
mod error;
mod git;
mod github;
mod output;
mod repos;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use error::HerdError;
use github::GhRunner;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    if !GhRunner::check_available() {
        eprintln!();
        eprintln!("This tool requires `gh`, the GitHub CLI");
        eprintln!();
        eprintln!("See https://cli.github.com/ for installation instructions");
        eprintln!();
        return ExitCode::from(2);
    }

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print the failure, including the full subprocess context when present.
fn report(err: &HerdError) {
    eprintln!();
    match err {
        HerdError::Command {
            command,
            code,
            stdout,
            stderr,
        } => {
            eprintln!("Failed:");
            eprintln!("   Command: {command}");
            eprintln!("   Return : {code}");
            eprintln!("   STDOUT : {}", stdout.trim());
            eprintln!("   STDERR : {}", stderr.trim());
        }
        other => eprintln!("Failed: {other}"),
    }
}
