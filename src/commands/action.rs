// Workflow and workflow-run commands.

use chrono::{DateTime, Utc};

use crate::batch::{BatchOrchestrator, BatchPolicy, FailurePolicy};
use crate::cli::{ActionCommands, BatchArgs, RepoSelection};
use crate::error::{HerdError, Result};
use crate::github::{GhRunner, PullRequest, WorkflowRun};
use crate::repos;

use super::{print_output, report_outcome, working_set};

pub fn run(command: ActionCommands) -> Result<()> {
    match command {
        ActionCommands::Run { repo, filter } => {
            run_workflows(&[repo], filter.as_deref(), &BatchArgs {
                batch_size: None,
                batch_pause: None,
            })
        }
        ActionCommands::RunMatching {
            filter,
            selection,
            batch,
        } => run_workflows(&working_set(&selection)?, filter.as_deref(), &batch),
        ActionCommands::Rerun { repo, number } => rerun(&repo, number),
        ActionCommands::RerunMatching {
            filter,
            merge_state,
            failed,
        } => rerun_matching(filter.as_deref(), merge_state.as_deref(), failed),
        ActionCommands::EnableMatching { filter, selection } => {
            toggle_workflows(&working_set(&selection)?, filter.as_deref(), true)
        }
        ActionCommands::DisableMatching { filter, selection } => {
            toggle_workflows(&working_set(&selection)?, filter.as_deref(), false)
        }
        ActionCommands::RunListActive {
            status,
            selection,
            all_repos,
            org,
        } => run_list_active(&status, &selection, all_repos, org.as_deref()),
        ActionCommands::RunListComplete {
            limit,
            selection,
            all_repos,
            org,
        } => run_list_complete(limit, &selection, all_repos, org.as_deref()),
    }
}

/// Dispatch every matching workflow of every repo in the working set.
fn run_workflows(repos: &[String], filter: Option<&str>, batch: &BatchArgs) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let regex = filter.map(repos::prefix_regex).transpose()?;

    let policy = BatchPolicy::new(FailurePolicy::Abort)
        .with_batching(batch.batch_size, batch.batch_pause);
    let mut orchestrator = BatchOrchestrator::new(policy);

    let outcome = orchestrator.run(
        &mut runner,
        repos,
        |runner, repo| {
            let workflows = runner.workflow_list(repo)?;
            Ok(workflows
                .into_iter()
                .filter(|workflow| regex.as_ref().is_none_or(|re| re.is_match(workflow)))
                .collect())
        },
        |runner, repo, workflow: &String| {
            println!("    Running {repo} -> {workflow}");
            let out = runner.workflow_run(repo, workflow)?;
            print_output(&out);
            Ok(())
        },
    )?;

    report_outcome(outcome);
    runner.close()
}

/// Enable or disable every matching workflow of every repo.
fn toggle_workflows(repos: &[String], filter: Option<&str>, enable: bool) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let regex = filter.map(repos::prefix_regex).transpose()?;
    let verb = if enable { "Enabling" } else { "Disabling" };

    let mut orchestrator = BatchOrchestrator::new(BatchPolicy::new(FailurePolicy::Abort));
    let outcome = orchestrator.run(
        &mut runner,
        repos,
        |runner, repo| {
            let workflows = runner.workflow_list(repo)?;
            Ok(workflows
                .into_iter()
                .filter(|workflow| regex.as_ref().is_none_or(|re| re.is_match(workflow)))
                .collect())
        },
        |runner, repo, workflow: &String| {
            println!("    {verb} {repo} -> {workflow}");
            let out = if enable {
                runner.workflow_enable(repo, workflow)?
            } else {
                runner.workflow_disable(repo, workflow)?
            };
            print_output(&out);
            Ok(())
        },
    )?;

    report_outcome(outcome);
    runner.close()
}

fn rerun(repo: &str, number: u64) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let pr = runner.pr_get(repo, number)?;
    rerun_failed(&mut runner, repo, &pr)?;
    runner.close()
}

fn rerun_matching(filter: Option<&str>, merge_state: Option<&str>, failed: bool) -> Result<()> {
    let mut runner = GhRunner::open()?;
    let repo_list = repos::load_local()?;

    for repo in &repo_list {
        let mut pulls = runner.pr_list(repo, filter, merge_state, None, None)?;
        if failed {
            pulls.retain(PullRequest::has_failing_check);
        }
        for pr in &pulls {
            rerun_failed(&mut runner, repo, pr)?;
        }
    }
    runner.close()
}

/// Rerun the run behind each failed check of a PR.
fn rerun_failed(runner: &mut GhRunner, repo: &str, pr: &PullRequest) -> Result<()> {
    for check in pr.failed_checks() {
        let details = check.details().ok_or_else(|| {
            HerdError::Other(format!(
                "failed check {} carries no details URL",
                check.display_name()
            ))
        })?;
        let job_id = job_id_from_details(details)?;

        println!(
            "    Rerunning {repo} -> {} ({details})",
            check.display_name()
        );
        let out = runner.run_rerun(repo, job_id)?;
        print_output(&out);
    }
    Ok(())
}

/// The job id is the trailing path segment of a check's details URL.
fn job_id_from_details(url: &str) -> Result<u64> {
    url.rsplit('/')
        .next()
        .and_then(|tail| tail.parse().ok())
        .ok_or_else(|| HerdError::Other(format!("no job id in details URL: {url}")))
}

fn run_list_active(
    status: &str,
    selection: &RepoSelection,
    all_repos: bool,
    org: Option<&str>,
) -> Result<()> {
    let runner = GhRunner::open()?;
    let repo_list = select_repos(&runner, selection, all_repos, org)?;

    let mut rows: Vec<(Option<DateTime<Utc>>, Vec<String>)> = Vec::new();
    for repo in &repo_list {
        for wf_run in runner.run_list_active(repo, status)? {
            rows.push((wf_run.created_at, active_row(&wf_run)));
        }
    }
    rows.sort_by_key(|(created_at, _)| *created_at);

    let mut table = crate::output::base_table(&[
        "REPO",
        "ID",
        "STATUS",
        "EVENT",
        "CREATED AT",
        "RUN STARTED AT",
        "AGE",
        "RUN ATTEMPT",
        "NAME",
    ]);
    for (_, row) in rows {
        table.add_row(row);
    }
    println!("{table}");
    runner.close()
}

fn active_row(wf_run: &WorkflowRun) -> Vec<String> {
    vec![
        wf_run.repo_full_name().to_string(),
        wf_run.id.to_string(),
        wf_run.status.clone().unwrap_or_else(|| "<not found>".to_string()),
        wf_run.event.clone().unwrap_or_else(|| "<not found>".to_string()),
        format_time(wf_run.created_at),
        format_time(wf_run.run_started_at),
        wf_run
            .created_at
            .map(crate::output::since)
            .unwrap_or_else(|| "<not found>".to_string()),
        wf_run
            .run_attempt
            .map(|attempt| attempt.to_string())
            .unwrap_or_else(|| "<not found>".to_string()),
        wf_run.name.clone().unwrap_or_else(|| "<not found>".to_string()),
    ]
}

fn run_list_complete(
    limit: usize,
    selection: &RepoSelection,
    all_repos: bool,
    org: Option<&str>,
) -> Result<()> {
    let runner = GhRunner::open()?;
    let repo_list = select_repos(&runner, selection, all_repos, org)?;

    let mut data = Vec::new();
    for repo in &repo_list {
        data.extend(runner.run_list_complete(repo, limit)?);
    }

    println!(
        "repo,status,event,created_at,run_started_at,updated_at,\
         queue_duration,run_duration,total_duration,run_attempt,name"
    );
    for wf_run in &data {
        println!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            wf_run.repo_full_name(),
            wf_run.status.as_deref().unwrap_or("<not found>"),
            wf_run.event.as_deref().unwrap_or("<not found>"),
            format_time(wf_run.created_at),
            format_time(wf_run.run_started_at),
            format_time(wf_run.updated_at),
            secs_between(wf_run.created_at, wf_run.run_started_at),
            secs_between(wf_run.run_started_at, wf_run.updated_at),
            secs_between(wf_run.created_at, wf_run.updated_at),
            wf_run.run_attempt.unwrap_or_default(),
            wf_run.name.as_deref().unwrap_or("<not found>"),
        );
    }
    runner.close()
}

/// Resolve the working set, optionally from the org's full remote list.
fn select_repos(
    runner: &GhRunner,
    selection: &RepoSelection,
    all_repos: bool,
    org: Option<&str>,
) -> Result<Vec<String>> {
    let universe = repos::load(runner, all_repos, org)?;
    repos::filter_repos(
        &universe,
        selection.repo.as_deref(),
        selection.repo_filter.as_deref(),
    )
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "<not found>".to_string())
}

/// Whole seconds between two optional instants; 0 when either is missing.
fn secs_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).num_seconds().max(0),
        _ => 0,
    }
}
