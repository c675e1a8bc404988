// Command Builder - resolve options into a command and run it through the executor

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{
    CommandError, CommandOptions, CommandOutput, ProgramLocation, ResolvedCommand, BIN_DIR,
};
use crate::port::CommandExecutor;

/// Resolve an options value against an install root
///
/// `<install_root>/bin/<program>` for binaries shipped with the database,
/// the bare program name for tools found through `PATH`. Pure.
///
/// # Errors
/// - CommandError::InvalidOptions if the options declaration is malformed
pub fn resolve<O: CommandOptions + ?Sized>(
    options: &O,
    install_root: &Path,
) -> Result<ResolvedCommand, CommandError> {
    let args = options.to_args()?;
    let program = match options.location() {
        ProgramLocation::InstallRoot => install_root.join(BIN_DIR).join(options.program()),
        ProgramLocation::SystemPath => PathBuf::from(options.program()),
    };

    Ok(ResolvedCommand::new(program, args))
}

/// Runs resolved commands through an injected executor
///
/// Cheap to clone; platforms and services each hold one.
#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            timeout: None,
        }
    }

    /// Deadline applied to every invocation made by this runner
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve `options` against `install_root` and run it
    ///
    /// # Arguments
    /// * `options` - Typed options of the program to run
    /// * `install_root` - Install root holding `bin/<program>` (ignored for PATH tools)
    ///
    /// # Errors
    /// - CommandError::InvalidOptions if the declaration is malformed
    /// - CommandError::Spawn if the program could not be started
    /// - CommandError::Exit on a non-zero exit, carrying the captured output
    /// - CommandError::Timeout if the runner deadline elapsed
    pub async fn run<O: CommandOptions + ?Sized>(
        &self,
        options: &O,
        install_root: &Path,
    ) -> Result<CommandOutput, CommandError> {
        let command = resolve(options, install_root)?;
        self.execute(&command).await
    }

    /// Run a tool resolved through `PATH`
    pub async fn run_system<O: CommandOptions + ?Sized>(
        &self,
        options: &O,
    ) -> Result<CommandOutput, CommandError> {
        self.run(options, Path::new("")).await
    }

    /// Run an already resolved command
    pub async fn execute(&self, command: &ResolvedCommand) -> Result<CommandOutput, CommandError> {
        debug!(command = %command, "Executing command: {}", command);

        let output = self.executor.execute(command, self.timeout).await?;
        if output.success() {
            return Ok(output);
        }

        debug!(
            command = %command,
            exit_code = ?output.exit_code,
            "Command exited unsuccessfully"
        );
        Err(CommandError::Exit {
            command: command.to_string(),
            code: output.exit_code,
            output,
        })
    }
}
