// Command Executor Port (execution seam)
// Abstraction for turning a resolved command into a finished process

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CommandError, CommandOutput, ResolvedCommand};

/// Command Executor trait
///
/// Implementations:
/// - SubprocessExecutor (infra-system): spawns the real program
/// - mocks::FakeExecutor: table of named fake programs for tests
///
/// Passed explicitly to whoever runs commands; there is no process-wide
/// binding to swap and restore.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion and capture its output
    ///
    /// A non-zero exit is NOT an error at this level; the returned output
    /// carries the exit code.
    ///
    /// # Errors
    /// - CommandError::Spawn if the program cannot be started
    /// - CommandError::Timeout if `timeout` elapses first (the child is killed)
    /// - CommandError::Io if waiting on the child fails
    async fn execute(
        &self,
        command: &ResolvedCommand,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// What a fake program does when invoked
    #[derive(Debug, Clone)]
    pub enum FakeBehavior {
        /// Write the given bytes and exit with `code`
        Exit {
            stdout: Vec<u8>,
            stderr: Vec<u8>,
            code: i32,
        },
        /// The program cannot be started
        SpawnFailure(std::io::ErrorKind),
        /// Never finishes; reports a timeout when a deadline is set
        Hang,
    }

    impl FakeBehavior {
        /// Writes `success` to stdout and exits 0
        pub fn success() -> Self {
            Self::stdout("success")
        }

        /// Writes `failure` to stderr and exits 1
        pub fn failure() -> Self {
            Self::exit(1, "", "failure")
        }

        pub fn stdout(text: impl Into<Vec<u8>>) -> Self {
            Self::exit(0, text, "")
        }

        pub fn exit(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
            FakeBehavior::Exit {
                stdout: stdout.into(),
                stderr: stderr.into(),
                code,
            }
        }
    }

    /// Fake execution strategy
    ///
    /// Behaviors are registered under a name; a command selects the first
    /// entry whose name equals its program file name or any of its
    /// arguments (so a host name passed with `-h` selects per-host
    /// behavior). Unmatched commands use the fallback.
    pub struct FakeExecutor {
        entries: Mutex<Vec<(String, FakeBehavior)>>,
        fallback: FakeBehavior,
        calls: Mutex<Vec<ResolvedCommand>>,
    }

    impl FakeExecutor {
        pub fn new(fallback: FakeBehavior) -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::new(FakeBehavior::success())
        }

        pub fn new_failure() -> Self {
            Self::new(FakeBehavior::failure())
        }

        /// Register a named behavior (builder style)
        pub fn register(self, name: impl Into<String>, behavior: FakeBehavior) -> Self {
            self.set(name, behavior);
            self
        }

        /// Register a named behavior on a shared executor
        pub fn set(&self, name: impl Into<String>, behavior: FakeBehavior) {
            self.entries.lock().unwrap().push((name.into(), behavior));
        }

        /// Every command received, in call order
        pub fn calls(&self) -> Vec<ResolvedCommand> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Received commands rendered as command lines
        pub fn command_lines(&self) -> Vec<String> {
            self.calls().iter().map(|c| c.to_string()).collect()
        }

        fn behavior_for(&self, command: &ResolvedCommand) -> FakeBehavior {
            let program = command.program_name();
            self.entries
                .lock()
                .unwrap()
                .iter()
                .find(|(name, _)| *name == program || command.args().iter().any(|a| a == name))
                .map(|(_, behavior)| behavior.clone())
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn execute(
            &self,
            command: &ResolvedCommand,
            timeout: Option<Duration>,
        ) -> Result<CommandOutput, CommandError> {
            self.calls.lock().unwrap().push(command.clone());

            match self.behavior_for(command) {
                FakeBehavior::Exit {
                    stdout,
                    stderr,
                    code,
                } => Ok(CommandOutput::new(stdout, stderr, Some(code))),
                FakeBehavior::SpawnFailure(kind) => Err(CommandError::Spawn {
                    command: command.to_string(),
                    source: std::io::Error::from(kind),
                }),
                FakeBehavior::Hang => match timeout {
                    Some(timeout) => Err(CommandError::Timeout {
                        command: command.to_string(),
                        timeout,
                    }),
                    None => futures::future::pending().await,
                },
            }
        }
    }
}
