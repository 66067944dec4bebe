// Batched execution of an action across repositories and their sub-items.
// Handles pausing between batches and the continue/skip/abort policies
// applied when an individual action fails.

use std::io::{self, IsTerminal, Write};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{HerdError, Result};

/// Error-message prefix for workflows without a dispatch trigger.
pub const NOT_RUNNABLE_PREFIX: &str = "could not create workflow dispatch event: HTTP 422: \
     Workflow does not have 'workflow_dispatch' trigger";

/// Error-message prefix when a workflow name resolves to nothing, which is
/// what enabling an already-enabled (or disabling an already-disabled)
/// workflow reports.
pub const WORKFLOW_NOT_FOUND_PREFIX: &str = "could not find any workflows named";

/// Known "nothing to do" failures that a batch silently skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    NotRunnable,
    WorkflowNotFound,
}

impl SkipKind {
    pub fn reason(&self) -> &'static str {
        match self {
            SkipKind::NotRunnable => "workflow is not runnable",
            SkipKind::WorkflowNotFound => "workflow not found, already in the requested state?",
        }
    }
}

/// Classify a failure as an ignorable "nothing to do" condition.
///
/// The remote tool signals these conditions only through message text, so
/// the prefixes are matched here and nowhere else; update them in one place
/// when the tool's wording changes.
pub fn classify_skip(err: &HerdError) -> Option<SkipKind> {
    let HerdError::Command { stderr, .. } = err else {
        return None;
    };
    let message = stderr.trim();
    if message.starts_with(NOT_RUNNABLE_PREFIX) {
        Some(SkipKind::NotRunnable)
    } else if message.starts_with(WORKFLOW_NOT_FOUND_PREFIX) {
        Some(SkipKind::WorkflowNotFound)
    } else {
        None
    }
}

/// What to do when an action within a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole batch and propagate the error.
    #[default]
    Abort,
    /// Log and continue with the next sub-item.
    Skip,
    /// Ask for a yes/no decision; degrades to abort without a terminal.
    Prompt,
}

/// Batching and failure-handling configuration.
#[derive(Debug, Clone, Default)]
pub struct BatchPolicy {
    /// Number of actions to run before pausing; None disables pausing.
    pub batch_size: Option<usize>,
    /// How long to pause between batches.
    pub pause_seconds: f64,
    pub on_failure: FailurePolicy,
}

impl BatchPolicy {
    pub fn new(on_failure: FailurePolicy) -> Self {
        Self {
            on_failure,
            ..Self::default()
        }
    }

    pub fn with_batching(mut self, batch_size: Option<usize>, pause_seconds: Option<f64>) -> Self {
        self.batch_size = batch_size;
        self.pause_seconds = pause_seconds.unwrap_or(0.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

/// How a batch ended when it did not propagate an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    /// The batch stopped early; later repositories were not processed.
    Aborted,
}

/// Applies an action to every sub-item of every repository in a working
/// set, sequentially, pausing between batches.
pub struct BatchOrchestrator<'a> {
    policy: BatchPolicy,
    state: BatchState,
    applied: usize,
    pause: Box<dyn FnMut(f64) + 'a>,
    confirm: Box<dyn FnMut(&str) -> bool + 'a>,
}

impl BatchOrchestrator<'static> {
    pub fn new(policy: BatchPolicy) -> Self {
        Self::with_hooks(policy, default_pause, default_confirm)
    }
}

impl<'a> BatchOrchestrator<'a> {
    /// Construct with injectable pause and confirm hooks.
    pub fn with_hooks(
        policy: BatchPolicy,
        pause: impl FnMut(f64) + 'a,
        confirm: impl FnMut(&str) -> bool + 'a,
    ) -> Self {
        Self {
            policy,
            state: BatchState::Idle,
            applied: 0,
            pause: Box::new(pause),
            confirm: Box::new(confirm),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Run the batch: expand each repository into sub-items, apply the
    /// action to each sub-item.
    ///
    /// `ctx` is threaded through both closures so they can share one
    /// mutable collaborator (the runner). Every attempted action counts
    /// toward the batch size, including ones skipped as "nothing to do".
    /// An `Ok(Aborted)` outcome means the operator declined to continue;
    /// later repositories were left unprocessed.
    pub fn run<C, R, S, E, A>(
        &mut self,
        ctx: &mut C,
        repos: &[R],
        mut expand: E,
        mut apply: A,
    ) -> Result<BatchOutcome>
    where
        R: std::fmt::Display,
        E: FnMut(&mut C, &R) -> Result<Vec<S>>,
        A: FnMut(&mut C, &R, &S) -> Result<()>,
    {
        self.state = BatchState::Running;
        self.applied = 0;

        for repo in repos {
            let items = match expand(ctx, repo) {
                Ok(items) => items,
                Err(err) => {
                    self.state = BatchState::Aborted;
                    return Err(err);
                }
            };

            for item in &items {
                if let Err(err) = apply(ctx, repo, item) {
                    match classify_skip(&err) {
                        Some(kind) => {
                            info!(repo = %repo, "skipped: {}", kind.reason());
                            println!("        Skipped ({})", kind.reason());
                        }
                        None => match self.policy.on_failure {
                            FailurePolicy::Abort => {
                                self.state = BatchState::Aborted;
                                return Err(err);
                            }
                            FailurePolicy::Skip => {
                                warn!(repo = %repo, %err, "action failed, skipping");
                                println!("        Failed, skipping: {err}");
                            }
                            FailurePolicy::Prompt => {
                                print_failure(&err);
                                if !(self.confirm)("Do you wish to continue?") {
                                    self.state = BatchState::Aborted;
                                    return Ok(BatchOutcome::Aborted);
                                }
                            }
                        },
                    }
                }

                self.applied += 1;
                if let Some(size) = self.policy.batch_size {
                    if self.applied >= size {
                        (self.pause)(self.policy.pause_seconds);
                        self.applied = 0;
                    }
                }
            }
        }

        self.state = BatchState::Completed;
        Ok(BatchOutcome::Completed)
    }
}

fn print_failure(err: &HerdError) {
    println!("An error occurred while applying the action:");
    if let HerdError::Command { stderr, .. } = err {
        if !stderr.trim().is_empty() {
            println!("{}", stderr.trim());
            return;
        }
    }
    println!("{err}");
}

fn default_pause(seconds: f64) {
    println!("    *** Batch submitted - pausing ***");
    thread::sleep(Duration::from_secs_f64(seconds));
}

/// Ask a yes/no question on the terminal, defaulting to no. Without an
/// interactive stdin the answer is always no, so Prompt degrades to abort.
fn default_confirm(question: &str) -> bool {
    if !io::stdin().is_terminal() {
        return false;
    }
    print!("{question} [y/N]: ");
    let _ = io::stdout().flush();

    let mut reply = String::new();
    if io::stdin().read_line(&mut reply).is_err() {
        return false;
    }
    reply.trim().to_lowercase().starts_with('y')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_error(stderr: &str) -> HerdError {
        HerdError::Command {
            command: "gh workflow run".to_string(),
            code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn repos(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("acme/repo-{i}")).collect()
    }

    #[test]
    fn test_classify_skip_known_prefixes() {
        assert_eq!(
            classify_skip(&command_error(NOT_RUNNABLE_PREFIX)),
            Some(SkipKind::NotRunnable)
        );
        assert_eq!(
            classify_skip(&command_error(
                "could not find any workflows named Create Release"
            )),
            Some(SkipKind::WorkflowNotFound)
        );
    }

    #[test]
    fn test_classify_skip_rejects_other_failures() {
        assert_eq!(classify_skip(&command_error("HTTP 502 bad gateway")), None);
        assert_eq!(
            classify_skip(&HerdError::Other("not a command failure".to_string())),
            None
        );
    }

    #[test]
    fn test_pause_hook_fires_per_batch() {
        let pauses = std::cell::Cell::new(0);
        let policy = BatchPolicy::new(FailurePolicy::Abort).with_batching(Some(2), Some(0.0));
        let mut orchestrator = BatchOrchestrator::with_hooks(
            policy,
            |_| pauses.set(pauses.get() + 1),
            |_| panic!("no prompt"),
        );

        let mut applied = 0;
        orchestrator
            .run(
                &mut applied,
                &repos(1),
                |_, _| Ok(vec![0u32, 1, 2, 3, 4]),
                |count, _, _| {
                    *count += 1;
                    Ok(())
                },
            )
            .unwrap();

        // 5 items with batch size 2: pauses after items 2 and 4.
        assert_eq!(pauses.get(), 2);
        assert_eq!(applied, 5);
        assert_eq!(orchestrator.state(), BatchState::Completed);
    }

    #[test]
    fn test_batch_counter_spans_repos() {
        let pauses = std::cell::Cell::new(0);
        let policy = BatchPolicy::new(FailurePolicy::Abort).with_batching(Some(2), Some(0.0));
        let mut orchestrator = BatchOrchestrator::with_hooks(
            policy,
            |_| pauses.set(pauses.get() + 1),
            |_| panic!("no prompt"),
        );

        orchestrator
            .run(&mut (), &repos(3), |_, _| Ok(vec![()]), |_, _, _| Ok(()))
            .unwrap();

        // 3 repos x 1 item with batch size 2: one pause after the second.
        assert_eq!(pauses.get(), 1);
    }

    #[test]
    fn test_known_skip_does_not_abort() {
        let policy = BatchPolicy::new(FailurePolicy::Abort);
        let mut orchestrator =
            BatchOrchestrator::with_hooks(policy, |_| {}, |_| panic!("no prompt"));

        let mut attempted = 0;
        let outcome = orchestrator
            .run(
                &mut attempted,
                &repos(1),
                |_, _| Ok(vec![0u32, 1, 2]),
                |count, _, item| {
                    *count += 1;
                    if *item == 1 {
                        Err(command_error(NOT_RUNNABLE_PREFIX))
                    } else {
                        Ok(())
                    }
                },
            )
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Completed);
        assert_eq!(attempted, 3);
    }

    #[test]
    fn test_abort_policy_propagates_and_stops() {
        let policy = BatchPolicy::new(FailurePolicy::Abort);
        let mut orchestrator =
            BatchOrchestrator::with_hooks(policy, |_| {}, |_| panic!("no prompt"));

        let mut attempted = 0;
        let result = orchestrator.run(
            &mut attempted,
            &repos(1),
            |_, _| Ok(vec![0u32, 1, 2]),
            |count, _, item| {
                *count += 1;
                if *item == 1 {
                    Err(command_error("HTTP 502 bad gateway"))
                } else {
                    Ok(())
                }
            },
        );

        assert!(result.is_err());
        assert_eq!(attempted, 2); // item 2 never attempted
        assert_eq!(orchestrator.state(), BatchState::Aborted);
    }

    #[test]
    fn test_skip_policy_continues() {
        let policy = BatchPolicy::new(FailurePolicy::Skip);
        let mut orchestrator =
            BatchOrchestrator::with_hooks(policy, |_| {}, |_| panic!("no prompt"));

        let mut attempted = 0;
        let outcome = orchestrator
            .run(
                &mut attempted,
                &repos(1),
                |_, _| Ok(vec![0u32, 1, 2]),
                |count, _, item| {
                    *count += 1;
                    if *item == 1 {
                        Err(command_error("HTTP 502 bad gateway"))
                    } else {
                        Ok(())
                    }
                },
            )
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Completed);
        assert_eq!(attempted, 3);
    }

    #[test]
    fn test_prompt_decline_aborts_quietly() {
        let policy = BatchPolicy::new(FailurePolicy::Prompt);
        let mut orchestrator = BatchOrchestrator::with_hooks(policy, |_| {}, |_| false);

        let mut attempted = 0;
        let outcome = orchestrator
            .run(
                &mut attempted,
                &repos(2),
                |_, _| Ok(vec![()]),
                |count, _, _| {
                    *count += 1;
                    Err(command_error("merge blocked"))
                },
            )
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Aborted);
        assert_eq!(attempted, 1); // second repo left unprocessed
        assert_eq!(orchestrator.state(), BatchState::Aborted);
    }

    #[test]
    fn test_prompt_accept_continues() {
        let policy = BatchPolicy::new(FailurePolicy::Prompt);
        let mut orchestrator = BatchOrchestrator::with_hooks(policy, |_| {}, |_| true);

        let mut attempted = 0;
        let outcome = orchestrator
            .run(
                &mut attempted,
                &repos(2),
                |_, _| Ok(vec![()]),
                |count, _, _| {
                    *count += 1;
                    Err(command_error("merge blocked"))
                },
            )
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Completed);
        assert_eq!(attempted, 2);
    }

    #[test]
    fn test_expand_failure_aborts() {
        let policy = BatchPolicy::new(FailurePolicy::Skip);
        let mut orchestrator =
            BatchOrchestrator::with_hooks(policy, |_| {}, |_| panic!("no prompt"));

        let result = orchestrator.run(
            &mut (),
            &repos(1),
            |_, _| -> Result<Vec<()>> { Err(command_error("HTTP 404")) },
            |_, _, _| Ok(()),
        );

        assert!(result.is_err());
        assert_eq!(orchestrator.state(), BatchState::Aborted);
    }
}
