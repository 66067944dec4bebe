// Command-line surface.
// Argument definitions for every command group; handlers live in commands/.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "herd", version, about = "Manage many GitHub repos in an efficient way")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the configured repo list
    #[command(subcommand)]
    Repos(ReposCommands),
    /// Manage the response cache
    #[command(subcommand)]
    Cache(CacheCommands),
    /// Manage pull requests
    #[command(subcommand)]
    Pr(PrCommands),
    /// Manage workflows and their runs
    #[command(subcommand)]
    Action(ActionCommands),
    /// Manage releases
    #[command(subcommand)]
    Release(ReleaseCommands),
}

/// Repo working-set selection shared by most commands.
#[derive(Args, Debug, Clone)]
pub struct RepoSelection {
    /// Exact repo name (owner/name)
    #[arg(long)]
    pub repo: Option<String>,

    /// Prefix-anchored pattern on the repo name; overrides --repo
    #[arg(long)]
    pub repo_filter: Option<String>,
}

/// PR selection shared by the pr subcommands.
#[derive(Args, Debug, Clone)]
pub struct PrSelection {
    /// Keyword or GitHub search filter
    #[arg(long)]
    pub filter: Option<String>,

    /// blocked, clean or draft; prefix with `!` to negate
    #[arg(long, value_parser = parse_merge_state)]
    pub merge_state: Option<String>,
}

/// Batch pacing shared by bulk commands.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Number of actions to run before pausing
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seconds to pause between batches
    #[arg(long)]
    pub batch_pause: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum ReposCommands {
    /// List configured local repos
    ListLocal,
    /// List all repos of an org
    ListRemote {
        /// GitHub org to enumerate
        #[arg(long)]
        org: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        selection: RepoSelection,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Clear the response cache
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum PrCommands {
    /// List open PRs across the working set
    List {
        #[command(flatten)]
        prs: PrSelection,

        /// commented, changes_requested or approved; prefix with `!` to negate
        #[arg(long, value_parser = parse_review_decision)]
        review_decision: Option<String>,

        #[command(flatten)]
        selection: RepoSelection,
    },
    /// Approve matching PRs
    Approve {
        #[command(flatten)]
        prs: PrSelection,

        #[command(flatten)]
        selection: RepoSelection,
    },
    /// Merge matching PRs
    Merge {
        #[command(flatten)]
        prs: PrSelection,

        #[command(flatten)]
        selection: RepoSelection,

        /// Use admin privileges to merge
        #[arg(long)]
        admin: bool,

        /// Skip past any merges that fail
        #[arg(long)]
        skip_failing: bool,

        /// Approve each PR before merging it
        #[arg(long)]
        with_approve: bool,

        /// Merge strategy
        #[arg(long, default_value = "merge", value_parser = ["merge", "squash", "rebase"])]
        merge_type: String,

        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Update the branch of matching PRs
    UpdateBranch {
        #[command(flatten)]
        prs: PrSelection,

        #[command(flatten)]
        selection: RepoSelection,

        /// Update regardless of merge state
        #[arg(long)]
        force: bool,
    },
    /// Open a PR in the browser
    Open {
        /// Repo where the PR exists
        repo: String,
        /// PR number
        number: u64,
    },
    /// Create a PR across the working set by running a script in each repo
    Create {
        #[command(flatten)]
        selection: RepoSelection,

        /// PR title (also the commit title)
        #[arg(long)]
        title: Option<String>,

        /// PR body (also the commit body)
        #[arg(long)]
        body: Option<String>,

        /// Directory for the working checkouts
        #[arg(long, default_value = ".herd-work")]
        workdir: PathBuf,

        /// Script run against each repo checkout
        #[arg(long, value_parser = parse_existing_file)]
        script: PathBuf,

        /// Labels to apply (repeatable; must start with semver: or type:)
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<String>,

        #[command(flatten)]
        batch: BatchArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ActionCommands {
    /// Run workflows of one repo
    Run {
        /// Repo name (owner/name)
        repo: String,

        /// Prefix-anchored pattern on the workflow name
        #[arg(long)]
        filter: Option<String>,
    },
    /// Run matching workflows across the working set
    RunMatching {
        /// Prefix-anchored pattern on the workflow name
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        selection: RepoSelection,

        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Rerun failed checks of one PR
    Rerun {
        /// Repo where the PR exists
        repo: String,
        /// PR number
        number: u64,
    },
    /// Rerun failed checks of matching PRs
    RerunMatching {
        /// Keyword or GitHub search filter
        #[arg(long)]
        filter: Option<String>,

        /// blocked, clean or draft; prefix with `!` to negate
        #[arg(long, value_parser = parse_merge_state)]
        merge_state: Option<String>,

        /// Only PRs with a failing check
        #[arg(long)]
        failed: bool,
    },
    /// Enable matching workflows across the working set
    EnableMatching {
        /// Prefix-anchored pattern on the workflow name
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        selection: RepoSelection,
    },
    /// Disable matching workflows across the working set
    DisableMatching {
        /// Prefix-anchored pattern on the workflow name
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        selection: RepoSelection,
    },
    /// List active workflow runs
    RunListActive {
        /// Status to list
        #[arg(long, default_value = "queued", value_parser = ["queued", "in_progress"])]
        status: String,

        #[command(flatten)]
        selection: RepoSelection,

        /// Use all repos of the org instead of the configured list
        #[arg(long)]
        all_repos: bool,

        /// GitHub org to enumerate (with --all-repos)
        #[arg(long)]
        org: Option<String>,
    },
    /// List completed workflow runs as CSV
    RunListComplete {
        /// Result set limit
        #[arg(long, default_value_t = 500)]
        limit: usize,

        #[command(flatten)]
        selection: RepoSelection,

        /// Use all repos of the org instead of the configured list
        #[arg(long)]
        all_repos: bool,

        /// GitHub org to enumerate (with --all-repos)
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReleaseCommands {
    /// List draft releases and their notes
    List {
        /// Show one summary row per repo instead of full notes
        #[arg(long)]
        summary: bool,

        /// Exact repo name (owner/name)
        #[arg(long)]
        repo: Option<String>,

        /// Prefix-anchored pattern on the repo name; overrides --repo
        #[arg(long)]
        filter: Option<String>,
    },
    /// Publish draft releases
    Publish {
        /// Exact repo name (owner/name)
        #[arg(long)]
        repo: Option<String>,

        /// Prefix-anchored pattern on the repo name; overrides --repo
        #[arg(long)]
        filter: Option<String>,

        /// Actually publish; defaults to a dry run
        #[arg(long)]
        publish: bool,
    },
}

fn parse_negatable(value: &str, allowed: &[&str]) -> Result<String, String> {
    let bare = value.strip_prefix('!').unwrap_or(value);
    if allowed.contains(&bare) {
        Ok(value.to_string())
    } else {
        Err(format!(
            "must be one of {} (optionally prefixed with `!`)",
            allowed.join(", ")
        ))
    }
}

fn parse_merge_state(value: &str) -> Result<String, String> {
    parse_negatable(value, &["blocked", "clean", "draft"])
}

fn parse_review_decision(value: &str) -> Result<String, String> {
    parse_negatable(value, &["commented", "changes_requested", "approved"])
}

fn parse_label(value: &str) -> Result<String, String> {
    if value.starts_with("semver:") || value.starts_with("type:") {
        Ok(value.to_string())
    } else {
        Err(format!("{value} must start with 'semver:' or 'type:'"))
    }
}

fn parse_existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("{value} must exist"))
    }
}
