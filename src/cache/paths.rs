// Well-known file locations.
// Constructs paths for the durable cache and the configured repo list.

use std::path::PathBuf;

use directories::ProjectDirs;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "herd")
}

/// Path to the durable response cache (~/.cache/herd/cache.json on Linux).
pub fn cache_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().join("cache.json"))
}

/// Path to the configured repo list (~/.config/herd/repos.json on Linux).
pub fn repos_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("repos.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_have_expected_filenames() {
        // ProjectDirs resolution depends on the host; only the leaf is stable.
        if let Some(path) = cache_path() {
            assert!(path.ends_with("cache.json"));
        }
        if let Some(path) = repos_path() {
            assert!(path.ends_with("repos.json"));
        }
    }
}
