// Subprocess executor - production binding of the execution seam
// reason: tokio::process for async spawn, kill_on_drop so a timed-out child never outlives us
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use gpmgmt_core::domain::{CommandError, CommandOutput, ResolvedCommand};
use gpmgmt_core::port::CommandExecutor;

/// Spawns the real program and captures its output
///
/// By default children inherit the whole environment. With an allowlist
/// the environment is cleared and only the listed variables are passed.
#[derive(Debug, Clone, Default)]
pub struct SubprocessExecutor {
    env_allowlist: Option<Vec<String>>,
}

impl SubprocessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the child environment
    ///
    /// # Example
    /// ```ignore
    /// let executor = SubprocessExecutor::new()
    ///     .with_env_allowlist(vec!["PATH".to_string(), "HOME".to_string(), "GPHOME".to_string()]);
    /// ```
    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = Some(allowlist);
        self
    }

    /// Current values of allowlisted variables
    fn filtered_env(&self) -> Vec<(String, String)> {
        match &self.env_allowlist {
            Some(allowlist) => std::env::vars()
                .filter(|(k, _)| allowlist.contains(k))
                .collect(),
            None => Vec::new(),
        }
    }

    fn build(&self, command: &ResolvedCommand) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.env_allowlist.is_some() {
            cmd.env_clear().envs(self.filtered_env());
        }
        cmd
    }
}

#[async_trait]
impl CommandExecutor for SubprocessExecutor {
    async fn execute(
        &self,
        command: &ResolvedCommand,
        deadline: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        let child = self.build(command).spawn().map_err(|e| CommandError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

        debug!(command = %command, pid = ?child.id(), "Spawned child process");

        let waited = match deadline {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(command = %command, timeout_ms = limit.as_millis() as u64, "Command timed out, killing child");
                    return Err(CommandError::Timeout {
                        command: command.to_string(),
                        timeout: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|e| CommandError::Io {
            command: command.to_string(),
            source: e,
        })?;

        Ok(CommandOutput::new(
            output.stdout,
            output.stderr,
            output.status.code(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cmd(program: &str, args: &[&str]) -> ResolvedCommand {
        ResolvedCommand::new(program, args.iter().map(|a| a.to_string()).collect())
    }

    #[tokio::test]
    async fn test_execute_success() {
        let executor = SubprocessExecutor::new();

        let output = executor.execute(&cmd("echo", &["hello"]), None).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "hello\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error_here() {
        let executor = SubprocessExecutor::new();

        let output = executor
            .execute(&cmd("sh", &["-c", "echo failure >&2; exit 3"]), None)
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr_lossy(), "failure\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let executor = SubprocessExecutor::new();

        let err = executor
            .execute(&cmd("/nonexistent/gpHome/bin/initdb", &[]), None)
            .await
            .unwrap_err();

        assert!(err.is_spawn_failure());
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let executor = SubprocessExecutor::new();

        let err = executor
            .execute(&cmd("sleep", &["10"]), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_env_allowlist() {
        std::env::set_var("GPMGMT_ALLOWED_VAR", "value1");
        std::env::set_var("GPMGMT_BLOCKED_VAR", "value2");
        let executor = SubprocessExecutor::new()
            .with_env_allowlist(vec!["GPMGMT_ALLOWED_VAR".to_string()]);

        let filtered = executor.filtered_env();

        assert_eq!(filtered, vec![("GPMGMT_ALLOWED_VAR".to_string(), "value1".to_string())]);
    }
}
