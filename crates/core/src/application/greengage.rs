// Greengage utility helpers built on the command runner

use std::path::{Path, PathBuf};

use tracing::info;

use crate::application::command_runner::CommandRunner;
use crate::domain::commands::{GpStart, Postgres};
use crate::domain::CommandOutput;
use crate::error::{AppError, Result};

/// Directory name the management tools log into under the user's home
pub const HUB_LOG_DIR_NAME: &str = "gpAdminLogs";

/// Version string reported by `<gp_home>/bin/postgres --gp-version`
///
/// # Errors
/// - AppError::Context ("fetching postgres gp-version") wrapping the command error
pub async fn get_postgres_gp_version(runner: &CommandRunner, gp_home: &Path) -> Result<String> {
    let options = Postgres {
        gp_version: true,
        ..Default::default()
    };

    let output = runner
        .run(&options, gp_home)
        .await
        .map_err(|e| AppError::from(e).context("fetching postgres gp-version"))?;

    Ok(output.stdout_lossy().trim().to_string())
}

/// Start the whole cluster with `gpstart -a -d <data_directory>`
pub async fn start_cluster(
    runner: &CommandRunner,
    gp_home: &Path,
    data_directory: &str,
    verbose: bool,
) -> Result<CommandOutput> {
    let options = GpStart {
        data_directory: data_directory.to_string(),
        verbose,
    };

    info!(data_directory = %data_directory, "Starting cluster");
    runner
        .run(&options, gp_home)
        .await
        .map_err(|e| AppError::from(e).context("starting cluster"))
}

/// `<home>/gpAdminLogs`
pub fn default_hub_log_dir(home: &Path) -> PathBuf {
    home.join(HUB_LOG_DIR_NAME)
}
