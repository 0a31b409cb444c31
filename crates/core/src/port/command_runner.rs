// Command Runner Port
// Abstraction for invoking host tools (nvidia-smi, rocm-smi, lspci) with a hard timeout

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Command errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Command timeout after {0}ms")]
    Timeout(u64),

    #[error("Command exited with status {0:?}")]
    NonZeroExit(Option<i32>),

    #[error("IO error: {0}")]
    Io(String),
}

/// Command Runner trait
///
/// Implementations must kill or abandon the child once `timeout` elapses
/// and report `CommandError::Timeout`; callers never wait longer than that.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, returning stdout/stderr on exit status 0
    ///
    /// # Errors
    /// - CommandError::SpawnFailed if the tool is missing
    /// - CommandError::Timeout if it does not finish within `timeout`
    /// - CommandError::NonZeroExit if it exits unsuccessfully
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted command runner keyed by "program arg1 arg2"
    #[derive(Default)]
    pub struct MockCommandRunner {
        responses: Mutex<HashMap<String, Result<String, String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script a successful stdout for a command line
        pub fn on(self, command_line: &str, stdout: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(command_line.to_string(), Ok(stdout.to_string()));
            self
        }

        /// Script a failure for a command line
        pub fn fail(self, command_line: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(command_line.to_string(), Err("scripted failure".to_string()));
            self
        }

        /// Every command line run so far, in order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self, command_line: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.as_str() == command_line)
                .count()
        }
    }

    #[async_trait]
    impl CommandRunner for MockCommandRunner {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
            _timeout: Duration,
        ) -> Result<CommandOutput, CommandError> {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.lock().unwrap().push(line.clone());

            match self.responses.lock().unwrap().get(&line) {
                Some(Ok(stdout)) => Ok(CommandOutput {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                }),
                Some(Err(e)) => Err(CommandError::Io(e.clone())),
                None => Err(CommandError::SpawnFailed(format!("{}: not found", program))),
            }
        }
    }
}
