// Repository universe and working-set selection.
// Loads the configured repo list (or enumerates an org remotely) and
// narrows it by exact name or prefix-anchored pattern.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;

use crate::cache::paths;
use crate::error::{HerdError, Result};
use crate::github::GhRunner;

/// Path of the configured repo list.
pub fn config_path() -> Result<PathBuf> {
    paths::repos_path().ok_or(HerdError::MissingProjectDirs)
}

/// Load the configured repo list from its well-known path.
pub fn load_local() -> Result<Vec<String>> {
    load_from(&config_path()?)
}

/// Load a repo list from a JSON array of `owner/name` strings.
pub fn load_from(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&contents)?;
    match parsed {
        Value::Array(_) => Ok(serde_json::from_value(parsed)?),
        _ => Err(HerdError::Other(format!(
            "invalid repo list at {}: expected a JSON array of strings",
            path.display()
        ))),
    }
}

/// Load the repo universe: the configured list, or the org's full remote
/// set when `remote` is requested.
pub fn load(runner: &GhRunner, remote: bool, org: Option<&str>) -> Result<Vec<String>> {
    if !remote {
        return load_local();
    }
    let org = org.ok_or_else(|| {
        HerdError::Other("an organization is required to enumerate remote repos (--org)".to_string())
    })?;
    runner.list_repos(org)
}

/// Compile a pattern anchored at the start of the subject.
pub fn prefix_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// Narrow `repos` to a working set.
///
/// With no pattern, keeps repos equal to `exact` (or everything when no
/// exact name either). A pattern switches to prefix-anchored matching and
/// the exact name is ignored entirely — a long-standing quirk kept for
/// compatibility (see DESIGN.md).
pub fn filter_repos(
    repos: &[String],
    exact: Option<&str>,
    pattern: Option<&str>,
) -> Result<Vec<String>> {
    let Some(pattern) = pattern else {
        return Ok(repos
            .iter()
            .filter(|repo| exact.is_none_or(|name| repo.as_str() == name))
            .cloned()
            .collect());
    };

    let regex = prefix_regex(pattern)?;
    Ok(repos
        .iter()
        .filter(|repo| regex.is_match(repo))
        .cloned()
        .collect())
}
