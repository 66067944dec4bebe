// Subprocess execution boundary.
// Runs one external command, captures its output, and maps non-zero exits
// to errors carrying the command line, exit code, stdout, and stderr.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{HerdError, Result};

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args`, optionally in `cwd`, capturing output.
pub fn run(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
    let rendered = render(program, args);
    debug!(command = %rendered, "running");

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(HerdError::Command {
            command: rendered,
            code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Run the `gh` CLI with the given arguments.
pub fn gh(args: &[&str]) -> Result<CommandOutput> {
    run("gh", args, None)
}

/// Run the `gh` CLI inside a specific directory.
pub fn gh_in(dir: &Path, args: &[&str]) -> Result<CommandOutput> {
    run("gh", args, Some(dir))
}

fn render(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program];
    parts.extend_from_slice(args);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = run("sh", &["-c", "echo hello"], None).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_nonzero_exit_carries_details() {
        let err = run("sh", &["-c", "echo oops >&2; exit 3"], None).unwrap_err();
        match err {
            HerdError::Command {
                command,
                code,
                stderr,
                ..
            } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(code, 3);
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_respects_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = run("pwd", &[], Some(dir.path())).unwrap();
        assert!(out.stdout.trim().ends_with(
            dir.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
    }
}
