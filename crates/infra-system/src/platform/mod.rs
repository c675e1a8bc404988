// Platform variants (one per service manager) and the remote-host plumbing they share

pub mod launchd;
pub mod status_table;
pub mod systemd;

pub use launchd::LaunchdPlatform;
pub use status_table::render_status_table;
pub use systemd::SystemdPlatform;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gpmgmt_core::application::{fan_out, resolve, CommandRunner};
use gpmgmt_core::domain::commands::{GpSsh, GpSync, Mkdir, Rm};
use gpmgmt_core::domain::{
    CommandOptions, CommandOutput, DomainError, FanoutReport, PlatformOs, ServiceStatus,
};
use gpmgmt_core::port::{Platform, PlatformError};
use tracing::info;

/// Platform of the running host
///
/// # Errors
/// - DomainError::UnsupportedPlatform on anything but Linux or macOS
pub fn current_os() -> Result<PlatformOs, DomainError> {
    std::env::consts::OS.parse()
}

/// Select the platform variant once at startup
///
/// # Arguments
/// * `runner` - Runner every platform command goes through
/// * `home` - Home directory of the service user (service dirs live under it)
pub fn detect_platform(
    runner: CommandRunner,
    home: PathBuf,
) -> Result<Arc<dyn Platform>, DomainError> {
    let os = current_os()?;
    info!(platform = %os, "Detected platform");
    Ok(for_os(os, runner, home))
}

/// Platform variant for an explicit OS
pub fn for_os(os: PlatformOs, runner: CommandRunner, home: PathBuf) -> Arc<dyn Platform> {
    match os {
        PlatformOs::Linux => Arc::new(SystemdPlatform::new(runner, home)),
        PlatformOs::Darwin => Arc::new(LaunchdPlatform::new(runner, home)),
    }
}

/// Runs per-host work through gpssh/gpsync from `<gp_home>/bin`
#[derive(Clone)]
pub(crate) struct RemoteHosts {
    runner: CommandRunner,
}

impl RemoteHosts {
    pub(crate) fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    pub(crate) fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Run a PATH tool on every host and keep each host's output
    pub(crate) async fn run_each<O: CommandOptions>(
        &self,
        action: &str,
        gp_home: &Path,
        hosts: &[String],
        options: &O,
    ) -> Result<FanoutReport<CommandOutput>, PlatformError> {
        let remote = resolve(options, Path::new(""))?;

        Ok(fan_out(action, hosts, |host| {
            let runner = self.runner.clone();
            let ssh = GpSsh::remote(&host, &remote);
            async move { runner.run(&ssh, gp_home).await }
        })
        .await)
    }

    /// Run a PATH tool on every host; any failing host fails the call
    pub(crate) async fn run_all<O: CommandOptions>(
        &self,
        action: &str,
        gp_home: &Path,
        hosts: &[String],
        options: &O,
    ) -> Result<(), PlatformError> {
        self.run_each(action, gp_home, hosts, options)
            .await?
            .into_result()?;
        Ok(())
    }

    /// `mkdir -p <dir>` on every host
    pub(crate) async fn make_dir(
        &self,
        gp_home: &Path,
        hosts: &[String],
        dir: &Path,
    ) -> Result<(), PlatformError> {
        let mkdir = Mkdir {
            parents: true,
            path: dir.to_path_buf(),
        };
        self.run_all("create service directory", gp_home, hosts, &mkdir)
            .await
    }

    /// `rm -f <path>` on every host
    pub(crate) async fn remove_file(
        &self,
        gp_home: &Path,
        hosts: &[String],
        path: &Path,
    ) -> Result<(), PlatformError> {
        let rm = Rm {
            force: true,
            path: path.to_path_buf(),
        };
        self.run_all("remove service file", gp_home, hosts, &rm).await
    }

    /// Stage `contents` locally and copy it to `destination` on every host
    pub(crate) async fn copy_contents(
        &self,
        gp_home: &Path,
        hosts: &[String],
        contents: &str,
        destination: &Path,
    ) -> Result<(), PlatformError> {
        let staged = tempfile::Builder::new()
            .prefix("gpmgmt-service-")
            .tempfile()
            .map_err(|e| PlatformError::io(std::env::temp_dir(), e))?;
        tokio::fs::write(staged.path(), contents)
            .await
            .map_err(|e| PlatformError::io(staged.path(), e))?;

        fan_out("copy service file", hosts, |host| {
            let runner = self.runner.clone();
            let sync = GpSync::to_host(&host, staged.path(), destination);
            async move { runner.run(&sync, gp_home).await.map(|_| ()) }
        })
        .await
        .into_result()?;
        Ok(())
    }

    /// Per-host status, unknown for hosts whose query failed
    pub(crate) async fn statuses<O, P>(
        &self,
        gp_home: &Path,
        hosts: &[String],
        options: &O,
        parse: P,
    ) -> Vec<ServiceStatus>
    where
        O: CommandOptions,
        P: Fn(&str) -> ServiceStatus,
    {
        let report = match self.run_each("query status", gp_home, hosts, options).await {
            Ok(report) => report,
            Err(_) => return hosts.iter().map(ServiceStatus::unknown).collect(),
        };

        report
            .into_outcomes()
            .into_iter()
            .map(|outcome| match outcome.result {
                Ok(output) => parse(&output.stdout_lossy()).with_host(outcome.host),
                Err(_) => ServiceStatus::unknown(outcome.host),
            })
            .collect()
    }
}

/// Write `contents` to `<dir>/<file_name>` on the local host
pub(crate) async fn write_local_file(
    dir: &Path,
    file_name: &str,
    contents: &str,
) -> Result<PathBuf, PlatformError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PlatformError::io(dir, e))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| PlatformError::io(&path, e))?;
    Ok(path)
}

/// Delete a local file; a missing file is not an error
pub(crate) async fn remove_local_file(path: &Path) -> Result<(), PlatformError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PlatformError::io(path, e)),
    }
}

/// Drop the `[host]` prefix gpssh puts in front of every remote line
pub(crate) fn strip_host_prefix(line: &str) -> &str {
    let line = line.trim();
    match line.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
        Some((_, rest)) => rest.trim(),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_host_prefix() {
        assert_eq!(strip_host_prefix("[sdw1] MainPID=42"), "MainPID=42");
        assert_eq!(strip_host_prefix("  MainPID=42  "), "MainPID=42");
        assert_eq!(strip_host_prefix("[sdw1]"), "");
    }

    #[test]
    fn test_for_os_selects_variant() {
        let runner = CommandRunner::new(Arc::new(
            gpmgmt_core::port::command_executor::mocks::FakeExecutor::new_success(),
        ));

        let linux = for_os(PlatformOs::Linux, runner.clone(), PathBuf::from("/home/gpadmin"));
        assert_eq!(linux.platform_os(), PlatformOs::Linux);
        assert_eq!(
            linux.default_service_dir(),
            PathBuf::from("/home/gpadmin/.config/systemd/user")
        );

        let darwin = for_os(PlatformOs::Darwin, runner, PathBuf::from("/Users/gpadmin"));
        assert_eq!(darwin.platform_os(), PlatformOs::Darwin);
        assert_eq!(
            darwin.default_service_dir(),
            PathBuf::from("/Users/gpadmin/Library/LaunchAgents")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_os_on_linux() {
        assert_eq!(current_os().unwrap(), PlatformOs::Linux);
    }
}
