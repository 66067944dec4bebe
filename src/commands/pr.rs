// Pull request commands.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::batch::{BatchOrchestrator, BatchPolicy, FailurePolicy};
use crate::cli::{BatchArgs, PrCommands, PrSelection, RepoSelection};
use crate::error::{HerdError, Result};
use crate::git::GitRunner;
use crate::github::{GhRunner, exec};

use super::{print_output, report_outcome, working_set};

pub fn run(command: PrCommands) -> Result<()> {
    match command {
        PrCommands::List {
            prs,
            review_decision,
            selection,
        } => list(&prs, review_decision.as_deref(), &selection),
        PrCommands::Approve { prs, selection } => approve(&prs, &selection),
        PrCommands::Merge {
            prs,
            selection,
            admin,
            skip_failing,
            with_approve,
            merge_type,
            batch,
        } => merge(
            &prs,
            &selection,
            admin,
            skip_failing,
            with_approve,
            &merge_type,
            &batch,
        ),
        PrCommands::UpdateBranch {
            prs,
            selection,
            force,
        } => update_branch(&prs, &selection, force),
        PrCommands::Open { repo, number } => open(&repo, number),
        PrCommands::Create {
            selection,
            title,
            body,
            workdir,
            script,
            labels,
            batch,
        } => create(
            &selection,
            title.as_deref(),
            body.as_deref(),
            &workdir,
            &script,
            &labels,
            &batch,
        ),
    }
}

fn list(prs: &PrSelection, review_decision: Option<&str>, selection: &RepoSelection) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repos = working_set(selection)?;

    let mut table = crate::output::base_table(&[
        "REPO",
        "NUMBER",
        "STATE",
        "MERGE?",
        "MERGE STATE",
        "REVIEW",
        "CHECKS",
        "AUTHOR",
        "TITLE",
    ]);

    for repo in &repos {
        let pulls = runner.pr_list(
            repo,
            prs.filter.as_deref(),
            prs.merge_state.as_deref(),
            review_decision,
            None,
        )?;
        for pr in pulls {
            table.add_row(vec![
                repo.clone(),
                pr.number.to_string(),
                pr.state.clone(),
                pr.mergeable.clone().unwrap_or_default(),
                pr.merge_state_status.clone().unwrap_or_default(),
                pr.review_decision.clone().unwrap_or_default(),
                pr.checks_passing().to_string(),
                pr.author_login().to_string(),
                crate::output::truncate(&pr.title, 75),
            ]);
        }
    }

    println!("{table}");
    runner.close()
}

fn approve(prs: &PrSelection, selection: &RepoSelection) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repos = working_set(selection)?;

    for repo in &repos {
        let pulls = runner.pr_list(
            repo,
            prs.filter.as_deref(),
            prs.merge_state.as_deref(),
            None,
            None,
        )?;
        for pr in pulls {
            println!("    Approving {repo} -> {} [{}]", pr.number, pr.title);
            let out = runner.pr_approve(repo, pr.number)?;
            print_output(&out);
        }
    }
    runner.close()
}

fn merge(
    prs: &PrSelection,
    selection: &RepoSelection,
    admin: bool,
    skip_failing: bool,
    with_approve: bool,
    merge_type: &str,
    batch: &BatchArgs,
) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repos = working_set(selection)?;

    let on_failure = if skip_failing {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Prompt
    };
    let policy =
        BatchPolicy::new(on_failure).with_batching(batch.batch_size, batch.batch_pause);
    let mut orchestrator = BatchOrchestrator::new(policy);

    let outcome = orchestrator.run(
        &mut runner,
        &repos,
        |runner, repo| {
            runner.pr_list(
                repo,
                prs.filter.as_deref(),
                prs.merge_state.as_deref(),
                None,
                None,
            )
        },
        |runner, repo, pr| {
            if with_approve {
                println!(
                    "    Approving & Merging {repo} -> {} [{}]",
                    pr.number, pr.title
                );
                runner.pr_approve(repo, pr.number)?;
            } else {
                println!("    Merging {repo} -> {} [{}]", pr.number, pr.title);
            }
            let out = runner.pr_merge(repo, pr.number, admin, merge_type)?;
            print_output(&out);
            Ok(())
        },
    )?;

    report_outcome(outcome);
    runner.close()
}

fn update_branch(prs: &PrSelection, selection: &RepoSelection, force: bool) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repos = working_set(selection)?;

    for repo in &repos {
        let pulls = runner.pr_list(
            repo,
            prs.filter.as_deref(),
            prs.merge_state.as_deref(),
            None,
            None,
        )?;
        for pr in pulls {
            if pr.merge_state_status.as_deref() == Some("BEHIND") || force {
                println!("    Updating branch {repo} -> {} [{}]", pr.number, pr.title);
                let resp = runner.pr_update_branch(repo, pr.number)?;
                if resp.get("message").and_then(|m| m.as_str())
                    != Some("Updating pull request branch.")
                {
                    println!("Unexpected response:");
                    println!("    {resp}");
                }
            }
        }
    }
    runner.close()
}

fn open(repo: &str, number: u64) -> Result<()> {
    let runner = GhRunner::open()?;
    runner.pr_open(repo, number)?;
    runner.close()
}

fn create(
    selection: &RepoSelection,
    title: Option<&str>,
    body: Option<&str>,
    workdir: &Path,
    script: &Path,
    labels: &[String],
    batch: &BatchArgs,
) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repos = working_set(selection)?;
    let script = fs::canonicalize(script)?;
    let branch = branch_name(&script)?;

    let policy = BatchPolicy::new(FailurePolicy::Abort)
        .with_batching(batch.batch_size, batch.batch_pause);
    let mut orchestrator = BatchOrchestrator::new(policy);

    println!("Creating PRs...");
    let outcome = orchestrator.run(
        &mut runner,
        &repos,
        |_, _| Ok(vec![()]),
        |runner, repo, _| {
            println!("  {repo}");
            let repo_path = workdir.join(repo);
            let git = prepare_checkout(repo, &repo_path)?;

            git.checkout_new_branch(&branch)?;
            run_script(&repo_path, &script)?;

            if title.is_some() || body.is_some() {
                if git.working_tree_clean()? {
                    println!("    Skipping {repo} which was not modified by the script");
                    return Ok(());
                }
                git.add(&["."])?;
                git.commit(title.unwrap_or_default(), body)?;
                git.push(&branch)?;
            } else {
                if !git.branch_has_commits("main", &branch)? {
                    println!("    Skipping {repo} which was not modified by the script");
                    return Ok(());
                }
                git.push(&branch)?;
            }

            runner.pr_create(&repo_path, labels)?;
            Ok(())
        },
    )?;

    report_outcome(outcome);
    runner.close()
}

/// Bring the checkout at `repo_path` to a clean main, cloning if absent.
fn prepare_checkout(repo: &str, repo_path: &Path) -> Result<GitRunner> {
    let mut git = GitRunner::new();

    if repo_path.exists() {
        git.cwd(repo_path);
        git.clean()?;
        git.checkout_branch("main")?;
        git.reset_hard("origin/main")?;
        git.pull()?;
        if !git.working_tree_clean()? {
            return Err(HerdError::Other(format!(
                "checkout at {} has an unclean working tree",
                repo_path.display()
            )));
        }
    } else {
        let parent = repo_path
            .parent()
            .ok_or_else(|| HerdError::Other("workdir has no parent directory".to_string()))?;
        fs::create_dir_all(parent)?;
        git.cwd(parent);
        git.clone_repo(&format!("git@github.com:{repo}.git"))?;
        git.cwd(repo_path);
    }
    Ok(git)
}

fn run_script(cwd: &Path, script: &Path) -> Result<()> {
    let program = script
        .to_str()
        .ok_or_else(|| HerdError::Other("script path is not valid UTF-8".to_string()))?;
    let out = exec::run(program, &[], Some(cwd))?;
    print_output(&out);
    Ok(())
}

/// Branch name derived from the script contents, so reruns of the same
/// script land on the same branch.
fn branch_name(script: &Path) -> Result<String> {
    let contents = fs::read(script)?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let digest = format!("{:x}", hasher.finalize());
    Ok(format!("herd-pr-{}", &digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_branch_name_is_stable_per_script() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("bump.sh");
        fs::write(&script, "#!/bin/sh\necho bump\n").unwrap();

        let first = branch_name(&script).unwrap();
        let second = branch_name(&script).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("herd-pr-"));
        assert_eq!(first.len(), "herd-pr-".len() + 8);

        fs::write(&script, "#!/bin/sh\necho other\n").unwrap();
        assert_ne!(branch_name(&script).unwrap(), first);
    }
}
