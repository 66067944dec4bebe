// Command handlers.
// One module per command group; dispatch fans out from the parsed CLI.

pub mod action;
pub mod cache;
pub mod pr;
pub mod release;
pub mod repos;

use crate::batch::BatchOutcome;
use crate::cli::{Commands, RepoSelection};
use crate::error::Result;
use crate::github::CommandOutput;
use crate::repos as repo_list;

pub fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Repos(cmd) => repos::run(cmd),
        Commands::Cache(cmd) => cache::run(cmd),
        Commands::Pr(cmd) => pr::run(cmd),
        Commands::Action(cmd) => action::run(cmd),
        Commands::Release(cmd) => release::run(cmd),
    }
}

/// Resolve the working set from the configured repo list.
pub(crate) fn working_set(selection: &RepoSelection) -> Result<Vec<String>> {
    repo_list::filter_repos(
        &repo_list::load_local()?,
        selection.repo.as_deref(),
        selection.repo_filter.as_deref(),
    )
}

/// Echo whatever the remote tool printed.
pub(crate) fn print_output(out: &CommandOutput) {
    if !out.stdout.trim().is_empty() {
        println!("{}", out.stdout.trim_end());
    }
    if !out.stderr.trim().is_empty() {
        println!("{}", out.stderr.trim_end());
    }
}

/// Make an early stop visible; an aborted batch is not a partial success.
pub(crate) fn report_outcome(outcome: BatchOutcome) {
    if outcome == BatchOutcome::Aborted {
        println!();
        println!("Batch aborted - remaining repositories were not processed.");
    }
}
