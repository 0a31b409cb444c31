// Subprocess command runner
// reason: tokio for async process management with a hard timeout
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use arbiter_core::port::command_runner::{CommandError, CommandOutput, CommandRunner};

/// Environment variables GPU tooling needs to locate drivers
const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "LD_LIBRARY_PATH", "ROCM_PATH", "CUDA_PATH"];

/// Spawns host tools with an allowlisted environment.
/// Children are killed if the timeout fires.
pub struct SubprocessCommandRunner {
    env_allowlist: Vec<String>,
}

impl SubprocessCommandRunner {
    /// Create a runner passing only `env_allowlist` through to children
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessCommandRunner::new(vec!["PATH".to_string()]);
    /// ```
    pub fn new(env_allowlist: Vec<String>) -> Self {
        Self { env_allowlist }
    }

    /// Filter environment variables to allowlist only
    fn filter_env(&self, env: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        env.filter(|(k, _)| self.env_allowlist.contains(k)).collect()
    }

    async fn spawn_and_wait(
        &self,
        program: &str,
        args: &[&str],
        limit: Duration,
    ) -> Result<std::process::Output, CommandError> {
        let filtered_env = self.filter_env(std::env::vars());

        let child = Command::new(program)
            .args(args)
            .env_clear()
            .envs(&filtered_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::SpawnFailed(format!("{}: {}", program, e)))?;

        match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(CommandError::Io(e.to_string())),
            Err(_) => Err(CommandError::Timeout(limit.as_millis() as u64)),
        }
    }
}

impl Default for SubprocessCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl CommandRunner for SubprocessCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let output = self.spawn_and_wait(program, args, timeout).await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                debug!(program = %program, args = ?args, error = %e, "Command failed");
                return Err(e);
            }
        };

        if !output.status.success() {
            debug!(
                program = %program,
                args = ?args,
                exit_code = ?output.status.code(),
                "Command exited unsuccessfully"
            );
            return Err(CommandError::NonZeroExit(output.status.code()));
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success() {
        let runner = SubprocessCommandRunner::default();
        let output = runner
            .run("echo", &["hello"], Duration::from_secs(5))
            .await
            .unwrap();

        assert!(output.stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let runner = SubprocessCommandRunner::default();
        let result = runner
            .run("sleep", &["10"], Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(CommandError::Timeout(100))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_non_zero_exit() {
        let runner = SubprocessCommandRunner::default();
        let result = runner.run("false", &[], Duration::from_secs(5)).await;

        assert!(matches!(result, Err(CommandError::NonZeroExit(Some(1)))));
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let runner = SubprocessCommandRunner::default();
        let result = runner
            .run("definitely-not-a-gpu-tool", &[], Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[test]
    fn test_env_filtering() {
        let runner = SubprocessCommandRunner::new(vec!["ALLOWED_VAR".to_string()]);

        let env = vec![
            ("ALLOWED_VAR".to_string(), "value1".to_string()),
            ("BLOCKED_VAR".to_string(), "value2".to_string()),
        ];

        let filtered = runner.filter_env(env.into_iter());

        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("ALLOWED_VAR"));
        assert!(!filtered.contains_key("BLOCKED_VAR"));
    }
}
