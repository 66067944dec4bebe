// Release commands.

use crate::cli::ReleaseCommands;
use crate::error::{HerdError, Result};
use crate::github::GhRunner;
use crate::repos;

pub fn run(command: ReleaseCommands) -> Result<()> {
    match command {
        ReleaseCommands::List {
            summary,
            repo,
            filter,
        } => list(summary, repo.as_deref(), filter.as_deref()),
        ReleaseCommands::Publish {
            repo,
            filter,
            publish,
        } => self::publish(repo.as_deref(), filter.as_deref(), publish),
    }
}

fn list(summary: bool, repo: Option<&str>, filter: Option<&str>) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repo_list = repos::filter_repos(&repos::load_local()?, repo, filter)?;

    if summary {
        list_summary(&runner, &repo_list)?;
    } else {
        list_drafts(&mut runner, &repo_list)?;
    }
    runner.close()
}

/// One row per repo: latest published version, draft availability, age.
fn list_summary(runner: &GhRunner, repo_list: &[String]) -> Result<()> {
    let mut drafts: Vec<Vec<String>> = Vec::new();
    let mut dated: Vec<(Option<chrono::DateTime<chrono::FixedOffset>>, Vec<String>)> = Vec::new();

    for repo in repo_list {
        let rows = runner.fetch_latest_releases(repo)?;
        if rows.is_empty() {
            println!("Skipping repo {repo}, no release found");
            println!();
            continue;
        }

        // Two releases are requested per repo; a draft, when present, sits
        // on top and the published one underneath supplies the row.
        let (draft_available, row) = if rows.len() == 1 {
            if rows[0].is_draft() {
                drafts.push(vec![
                    repo.clone(),
                    "Draft".to_string(),
                    "YES".to_string(),
                    "N/A".to_string(),
                    "N/A".to_string(),
                ]);
                continue;
            }
            ("NO", &rows[0])
        } else if rows[0].is_draft() {
            ("YES", &rows[1])
        } else {
            ("NO", &rows[0])
        };

        let (date, age) = match row.published {
            Some(published) => (
                published.date_naive().to_string(),
                crate::output::since(published),
            ),
            None => ("N/A".to_string(), "N/A".to_string()),
        };
        dated.push((
            row.published,
            vec![
                repo.clone(),
                row.version().to_string(),
                draft_available.to_string(),
                date,
                age,
            ],
        ));
    }

    // Drafts first (they have no date to sort on), then oldest release first.
    dated.sort_by_key(|(published, _)| *published);

    let mut table = crate::output::base_table(&[
        "REPO",
        "LATEST VERSION",
        "DRAFT AVAILABLE",
        "LAST RELEASE DATE",
        "SINCE LAST RELEASE",
    ]);
    for row in drafts {
        table.add_row(row);
    }
    for (_, row) in dated {
        table.add_row(row);
    }
    println!("{table}");
    Ok(())
}

/// Full notes of each repo's draft release.
fn list_drafts(runner: &mut GhRunner, repo_list: &[String]) -> Result<()> {
    for repo in repo_list {
        let Some(release) = runner.fetch_draft_release(repo)? else {
            println!("Skipping repo {repo}, no release found");
            println!();
            continue;
        };

        let name = release.name.as_deref().unwrap_or("").trim();
        println!("Release [{name}]");
        println!(
            "    Author : {}",
            release.author.as_ref().map(|a| a.login.as_str()).unwrap_or("n/a")
        );
        println!("    URL    : {}", release.url.as_deref().unwrap_or(""));
        println!("    Tag    : {}", release.tag_name.as_deref().unwrap_or(""));
        println!("    Draft  : {}", release.draft);
        println!("    Pre    : {}", release.prerelease);
        println!("    Version: {}", release.version().unwrap_or(""));
        println!();
        println!("{}", release.body.as_deref().unwrap_or(""));
        println!();
        println!("{}", "-".repeat(124));
        println!();
    }
    Ok(())
}

fn publish(repo: Option<&str>, filter: Option<&str>, publish: bool) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repo_list = repos::filter_repos(&repos::load_local()?, repo, filter)?;

    if !publish {
        println!("**DRY RUN** - add the `--publish` flag to actually publish");
        println!();
    }

    for repo in &repo_list {
        let Some(release) = runner.fetch_draft_release(repo)? else {
            println!("    ** Skipping repo {repo}, no release found");
            continue;
        };
        let version = release
            .version()
            .map(str::to_string)
            .ok_or_else(|| {
                HerdError::Other(format!("draft release of {repo} has no version in its name"))
            })?;
        let name = release.title();

        println!("    Publishing release for {repo} -> [{name}/{version}]");
        if publish {
            runner.release_publish(repo, release.id, &version)?;
        }
    }
    runner.close()
}
