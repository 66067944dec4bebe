// Repo list commands.

use crate::cli::ReposCommands;
use crate::error::Result;
use crate::github::GhRunner;
use crate::repos;

pub fn run(command: ReposCommands) -> Result<()> {
    match command {
        ReposCommands::ListLocal => list_local(),
        ReposCommands::ListRemote {
            org,
            json,
            selection,
        } => list_remote(&org, json, &selection),
    }
}

fn list_local() -> Result<()> {
    let path = repos::config_path()?;
    println!("Repos configured in [{}]", path.display());
    for repo in repos::load_local()? {
        println!("\t{repo}");
    }
    Ok(())
}

fn list_remote(org: &str, json: bool, selection: &crate::cli::RepoSelection) -> Result<()> {
    let runner = GhRunner::open()?;
    let all = runner.list_repos(org)?;
    let filtered = repos::filter_repos(
        &all,
        selection.repo.as_deref(),
        selection.repo_filter.as_deref(),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
    } else {
        println!("Repos available remotely");
        for repo in &filtered {
            println!("\t{repo}");
        }
    }
    runner.close()
}
