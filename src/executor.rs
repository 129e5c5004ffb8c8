//! Run build steps one after another on the host.
//!
//! Steps run strictly in order and each blocks until its process exits. The
//! first failing step ends the run unless the step was marked
//! `allow_failure`, in which case the failure is recorded and the next step
//! starts. A [`CancellationToken`] is checked before every step; a step that
//! is already running is allowed to finish.
//!
//! # Examples
//!
//! ```no_run
//! use chembrew::executor::{CancellationToken, Executor};
//! use chembrew::resolver::BuildStep;
//!
//! fn main() -> chembrew::error::Result<()> {
//!     let token = CancellationToken::new();
//!     let mut executor = Executor::host().with_cancellation(token.clone());
//!
//!     let steps = vec![
//!         BuildStep::new("cmake", ["."], "/tmp/rdkit"),
//!         BuildStep::new("make", ["install"], "/tmp/rdkit"),
//!     ];
//!     let report = executor.execute(steps)?;
//!     println!("ran {} steps", report.completed);
//!     Ok(())
//! }
//! ```

use crate::error::{BuildError, Result};
use crate::resolver::BuildStep;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared flag a caller sets to stop a build between steps
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Exit status and merged stdout/stderr of one finished step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal or never started
    pub exit_code: Option<i32>,
    pub output: String,
}

impl StepOutput {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failed(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            output: output.into(),
        }
    }
}

/// Runs a single step to completion
pub trait StepRunner {
    fn run(&mut self, step: &BuildStep) -> StepOutput;
}

/// Spawns each step as a child process, capturing its output
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl StepRunner for CommandRunner {
    fn run(&mut self, step: &BuildStep) -> StepOutput {
        let mut cmd = Command::new(&step.command);
        cmd.args(&step.args)
            .current_dir(&step.working_dir)
            .envs(&step.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) => {
                return StepOutput::failed(
                    None,
                    format!("failed to start `{}`: {}", step.command, e),
                );
            }
        };

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !captured.is_empty() && !captured.ends_with('\n') {
                captured.push('\n');
            }
            captured.push_str(&stderr);
        }

        StepOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: captured,
        }
    }
}

/// Outcome of a run in which no fatal step failed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Steps that ran, including tolerated failures
    pub completed: usize,
    /// Indices of `allow_failure` steps that failed
    pub tolerated_failures: Vec<usize>,
}

pub struct Executor<R: StepRunner = CommandRunner> {
    runner: R,
    cancellation: Option<CancellationToken>,
}

impl Executor<CommandRunner> {
    pub fn host() -> Self {
        Self::new(CommandRunner)
    }
}

impl<R: StepRunner> Executor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `steps` in order, consuming them.
    ///
    /// Returns [`BuildError::Execution`] for the first failing step that does
    /// not allow failure; no later step runs. Returns
    /// [`BuildError::Cancelled`] if the token was set before a step started.
    pub fn execute(&mut self, steps: Vec<BuildStep>) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let total = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                info!(step = index, "build cancelled");
                return Err(BuildError::Cancelled { step_index: index });
            }

            info!("==> [{}/{}] {}", index + 1, total, step.command_line());
            debug!(cwd = %step.working_dir.display(), env = ?step.env, "running step");

            let started = Instant::now();
            let result = self.runner.run(&step);
            debug!(
                step = index,
                success = result.success,
                exit_code = ?result.exit_code,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "step finished"
            );
            report.completed += 1;

            if result.success {
                continue;
            }

            if step.allow_failure {
                warn!(
                    step = index,
                    command = %step.command_line(),
                    exit_code = ?result.exit_code,
                    "step failed, continuing"
                );
                report.tolerated_failures.push(index);
                continue;
            }

            return Err(BuildError::Execution {
                step_index: index,
                command: step.command_line(),
                exit_code: result.exit_code,
                captured_output: result.output,
            });
        }

        Ok(report)
    }
}
