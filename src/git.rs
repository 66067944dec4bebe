// Git operations for the PR creation flow.
// Thin driver over the git CLI, pinned to a working directory.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::github::exec::{self, CommandOutput};

/// Driver for git commands in a chosen working directory.
#[derive(Debug, Default)]
pub struct GitRunner {
    cwd: Option<PathBuf>,
}

impl GitRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point subsequent commands at `dir`.
    pub fn cwd(&mut self, dir: &Path) -> &mut Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        exec::run("git", args, self.cwd.as_deref())
    }

    /// Clone a repo into the current working directory.
    pub fn clone_repo(&self, url: &str) -> Result<CommandOutput> {
        self.run(&["clone", url])
    }

    /// Reset hard to the given ref.
    pub fn reset_hard(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["reset", "--hard", branch])
    }

    /// Remove untracked files and directories.
    pub fn clean(&self) -> Result<CommandOutput> {
        self.run(&["clean", "-df"])
    }

    pub fn pull(&self) -> Result<CommandOutput> {
        self.run(&["pull"])
    }

    /// Push the branch, setting its upstream.
    pub fn push(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["push", "-u", "origin", branch])
    }

    pub fn status(&self) -> Result<CommandOutput> {
        self.run(&["status"])
    }

    /// Stage the given paths.
    pub fn add(&self, paths: &[&str]) -> Result<CommandOutput> {
        let mut args = vec!["add"];
        args.extend_from_slice(paths);
        self.run(&args)
    }

    /// Commit staged changes with a title and optional body.
    pub fn commit(&self, title: &str, body: Option<&str>) -> Result<CommandOutput> {
        let message = match body {
            Some(body) => format!("{title}\n\n{body}"),
            None => title.to_string(),
        };
        self.run(&["commit", "-m", &message])
    }

    pub fn checkout_branch(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["checkout", branch])
    }

    pub fn checkout_new_branch(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["checkout", "-b", branch])
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        Ok(self.run(&["rev-parse", rev])?.stdout.trim().to_string())
    }

    /// Whether the working tree has nothing to commit.
    pub fn working_tree_clean(&self) -> Result<bool> {
        let status = self.status()?;
        Ok(status
            .stdout
            .trim()
            .ends_with("nothing to commit, working tree clean"))
    }

    /// Whether `branch` points at a different commit than `base`.
    pub fn branch_has_commits(&self, base: &str, branch: &str) -> Result<bool> {
        Ok(self.rev_parse(base)? != self.rev_parse(branch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        exec::run("git", &["--version"], None).is_ok()
    }

    fn init_repo(dir: &Path) {
        let git = |args: &[&str]| exec::run("git", args, Some(dir)).unwrap();
        git(&["init", "-q", "-b", "main"]);
        git(&["config", "user.email", "herd@example.com"]);
        git(&["config", "user.name", "herd"]);
    }

    #[test]
    fn test_working_tree_clean_detection() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        let mut runner = GitRunner::new();
        runner.cwd(dir.path());

        fs::write(dir.path().join("file.txt"), "one").unwrap();
        runner.add(&["."]).unwrap();
        runner.commit("initial", None).unwrap();
        assert!(runner.working_tree_clean().unwrap());

        fs::write(dir.path().join("file.txt"), "two").unwrap();
        assert!(!runner.working_tree_clean().unwrap());
    }

    #[test]
    fn test_branch_has_commits() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        let mut runner = GitRunner::new();
        runner.cwd(dir.path());

        fs::write(dir.path().join("file.txt"), "one").unwrap();
        runner.add(&["."]).unwrap();
        runner.commit("initial", None).unwrap();

        runner.checkout_new_branch("feature").unwrap();
        assert!(!runner.branch_has_commits("main", "feature").unwrap());

        fs::write(dir.path().join("file.txt"), "two").unwrap();
        runner.add(&["."]).unwrap();
        runner.commit("change", None).unwrap();
        assert!(runner.branch_has_commits("main", "feature").unwrap());
    }
}
