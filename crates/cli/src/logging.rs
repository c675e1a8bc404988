//! Logging setup for gpctl
//!
//! Console output goes to stderr so tables on stdout stay clean.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `info`, `debug` with `--verbose`)
//! - `GPCTL_LOG_FORMAT`: `pretty` (default) or `json`

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "GPCTL_LOG_FORMAT";
pub const LOG_FILE_NAME: &str = "gpctl.log";

/// Install the global subscriber
///
/// Also appends to `<log_dir>/gpctl.log` when the directory can be created.
/// Keep the returned guard alive until exit so buffered file lines are flushed.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .expect("Failed to create env filter");

    let mut file_error = None;
    let (file_layer, guard) = match log_dir.map(|dir| (dir, std::fs::create_dir_all(dir))) {
        Some((dir, Ok(()))) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Some((dir, Err(e))) => {
            file_error = Some((dir.to_path_buf(), e));
            (None, None)
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());
    match log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install log subscriber")?;

    if let Some((dir, e)) = file_error {
        tracing::warn!(log_dir = %dir.display(), error = %e, "File logging disabled");
    }

    Ok(guard)
}
