// Operations against the gh CLI, memoized through the response cache.
// Reads go through the cache; mutations clear it. The runner owns the
// store for the process lifetime: open() loads it, close() persists it.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::cache::{CacheStore, cached, invalidating, paths};
use crate::error::{HerdError, Result};

use super::exec::{self, CommandOutput};
use super::pages;
use super::types::{Job, PullRequest, Release, ReleaseRow, Repository, WorkflowRun,
                   WorkflowRunsResponse};

const PR_JSON_FIELDS: &str =
    "author,number,state,title,url,reviewDecision,statusCheckRollup,mergeable,mergeStateStatus";

const ACCEPT_V3: &str = "Accept: application/vnd.github.v3+json";

/// Driver for gh operations, backed by the durable response cache.
pub struct GhRunner {
    cache: CacheStore,
    closed: bool,
}

impl GhRunner {
    /// Construct a runner with the cache loaded from its well-known path.
    pub fn open() -> Result<Self> {
        let path = paths::cache_path().ok_or(HerdError::MissingProjectDirs)?;
        Ok(Self::with_store(CacheStore::open(path)))
    }

    /// Construct a runner over an explicit store.
    pub fn with_store(cache: CacheStore) -> Self {
        Self {
            cache,
            closed: false,
        }
    }

    /// Persist the cache. Call once after the command finishes.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.cache.store()
    }

    /// Whether the gh CLI is installed and runnable.
    pub fn check_available() -> bool {
        exec::gh(&["help"]).is_ok()
    }

    /// Get one PR in a repo by number.
    pub fn pr_get(&mut self, repo: &str, number: u64) -> Result<PullRequest> {
        let number = number.to_string();
        let key_args = [Some(repo), Some(number.as_str())];
        cached(&mut self.cache, "pr_get", &key_args, || {
            let out = exec::gh(&[
                "pr",
                "view",
                "--json",
                PR_JSON_FIELDS,
                "-R",
                repo,
                number.as_str(),
            ])?;
            Ok(serde_json::from_str(&out.stdout)?)
        })
    }

    /// List current PRs for a repo.
    ///
    /// `search` is any gh search string; `merge_state` and `review_decision`
    /// are post-filtered through jq select expressions and accept a leading
    /// `!` to negate.
    pub fn pr_list(
        &mut self,
        repo: &str,
        search: Option<&str>,
        merge_state: Option<&str>,
        review_decision: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        let key_args = [Some(repo), search, merge_state, review_decision, author];
        cached(&mut self.cache, "pr_list", &key_args, || {
            let mut args: Vec<String> = ["pr", "list", "-R", repo, "--json", PR_JSON_FIELDS]
                .iter()
                .map(|s| s.to_string())
                .collect();
            if let Some(search) = search {
                args.push("--search".to_string());
                args.push(search.to_string());
            }
            if let Some(author) = author {
                args.push("--author".to_string());
                args.push(author.to_string());
            }
            if let Some(decision) = review_decision {
                args.push("-q".to_string());
                args.push(jq_select("reviewDecision", decision));
            }
            if let Some(state) = merge_state {
                args.push("-q".to_string());
                args.push(jq_select("mergeStateStatus", state));
            }
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let out = exec::gh(&arg_refs)?;
            Ok(serde_json::from_str(&out.stdout)?)
        })
    }

    /// Approve a PR.
    pub fn pr_approve(&mut self, repo: &str, number: u64) -> Result<CommandOutput> {
        let number = number.to_string();
        invalidating(&mut self.cache, || {
            exec::gh(&["pr", "review", "-R", repo, &number, "--approve"])
        })
    }

    /// Open the PR in a browser.
    pub fn pr_open(&self, repo: &str, number: u64) -> Result<CommandOutput> {
        exec::gh(&["pr", "view", "-R", repo, &number.to_string(), "-w"])
    }

    /// Create a PR from the checkout at `repo_path`, filled from commits.
    pub fn pr_create(&mut self, repo_path: &Path, labels: &[String]) -> Result<CommandOutput> {
        invalidating(&mut self.cache, || {
            let mut args: Vec<&str> = vec!["pr", "create", "--fill"];
            for label in labels {
                args.push("-l");
                args.push(label);
            }
            exec::gh_in(repo_path, &args)
        })
    }

    /// Merge a PR. `merge_type` is one of merge, squash, rebase.
    pub fn pr_merge(
        &mut self,
        repo: &str,
        number: u64,
        admin: bool,
        merge_type: &str,
    ) -> Result<CommandOutput> {
        let number = number.to_string();
        invalidating(&mut self.cache, || {
            let mut args = vec!["pr", "merge", "-R", repo, number.as_str()];
            match merge_type {
                "merge" => args.push("-m"),
                "squash" => args.push("-s"),
                "rebase" => args.push("-r"),
                _ => {}
            }
            if admin {
                args.push("--admin");
            }
            exec::gh(&args)
        })
    }

    /// Update the PR's branch from its base.
    pub fn pr_update_branch(&mut self, repo: &str, number: u64) -> Result<Value> {
        let endpoint = format!("/repos/{repo}/pulls/{number}/update-branch");
        invalidating(&mut self.cache, || {
            let out = exec::gh(&[
                "api",
                "-X",
                "PUT",
                "-H",
                "Accept: application/vnd.github.lydian-preview+json",
                &endpoint,
            ])?;
            if out.stdout.trim().is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&out.stdout)?)
        })
    }

    /// Fetch an Actions job by id.
    pub fn fetch_job(&mut self, repo: &str, job_id: u64) -> Result<Job> {
        let id = job_id.to_string();
        let key_args = [Some(repo), Some(id.as_str())];
        cached(&mut self.cache, "fetch_job", &key_args, || {
            let endpoint = format!("/repos/{repo}/actions/jobs/{job_id}");
            let out = exec::gh(&["api", &endpoint])?;
            Ok(serde_json::from_str(&out.stdout)?)
        })
    }

    /// Rerun the workflow run that a failed job belongs to.
    pub fn run_rerun(&mut self, repo: &str, job_id: u64) -> Result<CommandOutput> {
        let job = self.fetch_job(repo, job_id)?;
        let run_id = job.run_id.to_string();
        invalidating(&mut self.cache, || {
            exec::gh(&["run", "rerun", "-R", repo, &run_id])
        })
    }

    /// List the workflow names of a repo.
    pub fn workflow_list(&mut self, repo: &str) -> Result<Vec<String>> {
        cached(&mut self.cache, "workflow_list", &[Some(repo)], || {
            let out = exec::gh(&["workflow", "list", "-R", repo])?;
            Ok(parse_workflow_list(&out.stdout))
        })
    }

    /// Dispatch a workflow by name.
    pub fn workflow_run(&self, repo: &str, name: &str) -> Result<CommandOutput> {
        exec::gh(&["workflow", "run", "-R", repo, name])
    }

    /// Enable a workflow by name.
    pub fn workflow_enable(&self, repo: &str, name: &str) -> Result<CommandOutput> {
        exec::gh(&["workflow", "enable", "-R", repo, name])
    }

    /// Disable a workflow by name.
    pub fn workflow_disable(&self, repo: &str, name: &str) -> Result<CommandOutput> {
        exec::gh(&["workflow", "disable", "-R", repo, name])
    }

    /// List active workflow runs (`queued` or `in_progress`).
    pub fn run_list_active(&self, repo: &str, status: &str) -> Result<Vec<WorkflowRun>> {
        let endpoint = format!("/repos/{repo}/actions/runs?status={status}");
        let out = exec::gh(&["api", "-H", ACCEPT_V3, &endpoint])?;
        let parsed: WorkflowRunsResponse = serde_json::from_str(&out.stdout)?;
        Ok(parsed.workflow_runs)
    }

    /// List completed workflow runs, walking pages until `limit` is reached.
    pub fn run_list_complete(&self, repo: &str, limit: usize) -> Result<Vec<WorkflowRun>> {
        let per_page = limit.min(100);
        pages::walk(limit, |page| {
            let endpoint = format!(
                "/repos/{repo}/actions/runs?status=completed&page={page}&per_page={per_page}"
            );
            let out = exec::gh(&["api", "-i", "-H", ACCEPT_V3, &endpoint])?;
            let (headers, body) = pages::split_response(&out.stdout);
            let parsed: WorkflowRunsResponse = serde_json::from_str(body)?;
            Ok((pages::next_page(headers), parsed.workflow_runs))
        })
    }

    /// Fetch the draft release of a repo, when one exists.
    pub fn fetch_draft_release(&mut self, repo: &str) -> Result<Option<Release>> {
        cached(&mut self.cache, "fetch_draft_release", &[Some(repo)], || {
            let endpoint = format!("/repos/{repo}/releases");
            let out = exec::gh(&["api", &endpoint])?;
            let releases: Vec<Release> = serde_json::from_str(&out.stdout)?;
            Ok(releases.into_iter().find(|release| release.draft))
        })
    }

    /// Fetch the latest two releases of a repo.
    pub fn fetch_latest_releases(&self, repo: &str) -> Result<Vec<ReleaseRow>> {
        let out = exec::gh(&["release", "list", "-R", repo, "-L", "2"])?;
        Ok(ReleaseRow::parse_list(&out.stdout))
    }

    /// Publish a draft release under tag `v{version}`.
    pub fn release_publish(&mut self, repo: &str, id: u64, version: &str) -> Result<Release> {
        let endpoint = format!("/repos/{repo}/releases/{id}");
        let tag = format!("tag_name=v{version}");
        invalidating(&mut self.cache, || {
            let out = exec::gh(&[
                "api", &endpoint, "-X", "PATCH", "-F", "draft=false", "-F", &tag,
            ])?;
            Ok(serde_json::from_str(&out.stdout)?)
        })
    }

    /// Enumerate all repos of an org, walking pages to exhaustion.
    pub fn list_repos(&self, org: &str) -> Result<Vec<String>> {
        let repos = pages::walk(usize::MAX, |page| {
            let endpoint = format!("/orgs/{org}/repos?page={page}&per_page=100");
            let out = exec::gh(&["api", "-i", "-H", ACCEPT_V3, &endpoint])?;
            let (headers, body) = pages::split_response(&out.stdout);
            let parsed: Vec<Repository> = serde_json::from_str(body)?;
            Ok((pages::next_page(headers), parsed))
        })?;
        Ok(repos.into_iter().map(|repo| repo.full_name).collect())
    }
}

impl Drop for GhRunner {
    fn drop(&mut self) {
        // Backstop for early returns; close() is the intended path.
        if !self.closed {
            if let Err(err) = self.cache.store() {
                warn!(%err, "failed to persist response cache");
            }
        }
    }
}

/// Build a jq select expression for one field. A leading `!` on the value
/// negates the comparison; values are matched uppercased.
fn jq_select(field: &str, value: &str) -> String {
    let (op, value) = match value.strip_prefix('!') {
        Some(rest) => ("!=", rest),
        None => ("==", value),
    };
    format!("[.[] | select(.{} {} \"{}\") ]", field, op, value.to_uppercase())
}

/// Extract workflow names from `gh workflow list` output: everything but
/// the trailing state and id columns.
fn parse_workflow_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens[..tokens.len().saturating_sub(2)].join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jq_select_equality() {
        assert_eq!(
            jq_select("mergeStateStatus", "clean"),
            "[.[] | select(.mergeStateStatus == \"CLEAN\") ]"
        );
    }

    #[test]
    fn test_jq_select_negation() {
        assert_eq!(
            jq_select("reviewDecision", "!approved"),
            "[.[] | select(.reviewDecision != \"APPROVED\") ]"
        );
    }

    #[test]
    fn test_parse_workflow_list_joins_name_tokens() {
        let stdout = "Create Release\tactive\t12345\n\
                      Test Pull Request\tactive\t67890\n";
        assert_eq!(
            parse_workflow_list(stdout),
            vec!["Create Release", "Test Pull Request"]
        );
    }

    #[test]
    fn test_parse_workflow_list_skips_blank_lines() {
        assert!(parse_workflow_list("\n\n").is_empty());
    }
}
