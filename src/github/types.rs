// Shapes of data returned by the gh CLI.
// Defines structs for deserializing `gh --json` output and REST responses.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
}

/// One entry of a pull request's status-check rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum StatusCheck {
    CheckRun {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        conclusion: Option<String>,
        #[serde(default, rename = "detailsUrl")]
        details_url: Option<String>,
    },
    StatusContext {
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        state: Option<String>,
        #[serde(default, rename = "targetUrl")]
        target_url: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StatusCheck {
    /// Whether this check counts as passing: a completed, successful check
    /// run, or a successful status context.
    pub fn passing(&self) -> bool {
        match self {
            StatusCheck::CheckRun {
                status, conclusion, ..
            } => {
                status.as_deref() == Some("COMPLETED") && conclusion.as_deref() == Some("SUCCESS")
            }
            StatusCheck::StatusContext { state, .. } => state.as_deref() == Some("SUCCESS"),
            StatusCheck::Unknown => false,
        }
    }

    /// Whether this check concluded in failure (rerun candidates).
    pub fn failed(&self) -> bool {
        matches!(
            self,
            StatusCheck::CheckRun { conclusion, .. } if conclusion.as_deref() == Some("FAILURE")
        )
    }

    pub fn display_name(&self) -> &str {
        match self {
            StatusCheck::CheckRun { name, .. } => name.as_deref().unwrap_or("<unnamed>"),
            StatusCheck::StatusContext { context, .. } => context.as_deref().unwrap_or("<unnamed>"),
            StatusCheck::Unknown => "<unknown>",
        }
    }

    /// URL pointing at the check's details page, when present.
    pub fn details(&self) -> Option<&str> {
        match self {
            StatusCheck::CheckRun { details_url, .. } => details_url.as_deref(),
            StatusCheck::StatusContext { target_url, .. } => target_url.as_deref(),
            StatusCheck::Unknown => None,
        }
    }
}

/// Pull request as reported by `gh pr list`/`gh pr view`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub review_decision: Option<String>,
    #[serde(default)]
    pub mergeable: Option<String>,
    #[serde(default)]
    pub merge_state_status: Option<String>,
    #[serde(default)]
    pub status_check_rollup: Option<Vec<StatusCheck>>,
}

impl PullRequest {
    pub fn author_login(&self) -> &str {
        self.author.as_ref().map(|a| a.login.as_str()).unwrap_or("n/a")
    }

    /// Whether every rollup entry passes. A null or empty rollup passes.
    pub fn checks_passing(&self) -> bool {
        self.status_check_rollup
            .as_deref()
            .unwrap_or_default()
            .iter()
            .all(StatusCheck::passing)
    }

    /// Whether any rollup entry is not passing.
    pub fn has_failing_check(&self) -> bool {
        !self.checks_passing()
    }

    /// Rollup entries that concluded in failure.
    pub fn failed_checks(&self) -> Vec<&StatusCheck> {
        self.status_check_rollup
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|check| check.failed())
            .collect()
    }
}

/// GitHub Actions workflow run (REST shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub run_attempt: Option<u64>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

impl WorkflowRun {
    pub fn repo_full_name(&self) -> &str {
        self.repository
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or("<not found>")
    }
}

/// Envelope around `/actions/runs` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// GitHub Actions job; only the linkage back to its run matters here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub run_id: u64,
}

/// GitHub repository (REST shape, trimmed to what enumeration needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Release as reported by `/repos/{repo}/releases`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub body: Option<String>,
}

impl Release {
    /// Trailing token of the release name, conventionally the version.
    pub fn version(&self) -> Option<&str> {
        self.name.as_deref()?.trim().split_whitespace().next_back()
    }

    /// Release name with the trailing version token removed.
    pub fn title(&self) -> String {
        let name = self.name.as_deref().unwrap_or("").trim();
        let tokens: Vec<&str> = name.split_whitespace().collect();
        match tokens.split_last() {
            Some((_, rest)) => rest.join(" "),
            None => String::new(),
        }
    }
}

/// One row of `gh release list` output (tab-separated).
#[derive(Debug, Clone)]
pub struct ReleaseRow {
    pub title: String,
    pub kind: String,
    pub tag: String,
    pub published: Option<DateTime<FixedOffset>>,
}

impl ReleaseRow {
    pub fn is_draft(&self) -> bool {
        self.kind == "Draft"
    }

    /// Trailing token of the title, conventionally the version.
    pub fn version(&self) -> &str {
        self.title.trim().split_whitespace().next_back().unwrap_or("")
    }

    /// Parse the tab-separated rows of `gh release list` output.
    pub fn parse_list(stdout: &str) -> Vec<ReleaseRow> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let mut fields = line.split('\t');
                ReleaseRow {
                    title: fields.next().unwrap_or("").to_string(),
                    kind: fields.next().unwrap_or("").to_string(),
                    tag: fields.next().unwrap_or("").to_string(),
                    published: fields
                        .next()
                        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok()),
                }
            })
            .collect()
    }
}
