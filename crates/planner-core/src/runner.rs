//! Process launching for pipeline stages.
//!
//! [`CommandRunner`] is the seam between the pipeline and the operating
//! system; tests substitute a recording runner with scripted exit codes.

use std::io;
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use crate::argv::Invocation;

/// Exit status the external tools use to report failure.
pub const EXIT_FAILURE: i32 = 1;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited with this status code.
    Exited(i32),
    /// The process was terminated without an exit code (e.g. by a signal).
    Terminated,
    /// The process outlived the stage timeout and was killed.
    TimedOut,
}

impl ExitOutcome {
    /// Only the failure sentinel counts as failure; every other exit code
    /// advances the pipeline.
    pub fn is_failure(self) -> bool {
        self == ExitOutcome::Exited(EXIT_FAILURE)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => ExitOutcome::Terminated,
        }
    }
}

/// Launches one process and blocks until it ends.
pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// With `timeout` set, a process still running after that long is killed
    /// and `ExitOutcome::TimedOut` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn run(&mut self, invocation: &Invocation, timeout: Option<Duration>) -> io::Result<ExitOutcome>;
}

/// Runs invocations as child processes of the current process, inheriting
/// stdio and the working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation, timeout: Option<Duration>) -> io::Result<ExitOutcome> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .spawn()?;

        // A timeout too large to represent as an Instant never expires.
        let Some(deadline) = timeout.and_then(|t| Instant::now().checked_add(t)) else {
            return child.wait().map(ExitOutcome::from);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.into());
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    tracing::warn!(program = %invocation.program.display(), "failed to kill timed out process: {e}");
                }
                if let Err(e) = child.wait() {
                    tracing::warn!(program = %invocation.program.display(), "failed to reap timed out process: {e}");
                }
                return Ok(ExitOutcome::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sentinel_is_failure() {
        assert!(ExitOutcome::Exited(1).is_failure());
        assert!(!ExitOutcome::Exited(0).is_failure());
        assert!(!ExitOutcome::Exited(2).is_failure());
        assert!(!ExitOutcome::Exited(-1).is_failure());
        assert!(!ExitOutcome::Terminated.is_failure());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_codes() {
        let mut runner = SystemRunner;
        let sh = |script: &str| Invocation {
            program: "sh".into(),
            args: vec!["-c".to_string(), script.to_string()],
        };
        assert_eq!(runner.run(&sh("exit 0"), None).unwrap(), ExitOutcome::Exited(0));
        assert_eq!(runner.run(&sh("exit 1"), None).unwrap(), ExitOutcome::Exited(1));
        assert_eq!(
            runner.run(&sh("exit 3"), Some(Duration::from_secs(10))).unwrap(),
            ExitOutcome::Exited(3)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout_kills_child() {
        let mut runner = SystemRunner;
        let sleep = Invocation {
            program: "sleep".into(),
            args: vec!["5".to_string()],
        };
        let started = Instant::now();
        let outcome = runner.run(&sleep, Some(Duration::from_millis(200))).unwrap();
        assert_eq!(outcome, ExitOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_unrepresentable_timeout_waits_normally() {
        let mut runner = SystemRunner;
        let exit = Invocation {
            program: "sh".into(),
            args: vec!["-c".to_string(), "exit 2".to_string()],
        };
        let outcome = runner.run(&exit, Some(Duration::from_secs(u64::MAX))).unwrap();
        assert_eq!(outcome, ExitOutcome::Exited(2));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut runner = SystemRunner;
        let missing = Invocation {
            program: "/nonexistent/e-planner/compiler".into(),
            args: Vec::new(),
        };
        assert!(runner.run(&missing, None).is_err());
    }
}
