// macOS launchd launch-agent platform

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use gpmgmt_core::application::CommandRunner;
use gpmgmt_core::domain::commands::Launchctl;
use gpmgmt_core::domain::{PlatformOs, ProcessRole, ServiceState, ServiceStatus};
use gpmgmt_core::port::platform::Result;
use gpmgmt_core::port::Platform;

use super::{remove_local_file, strip_host_prefix, write_local_file, RemoteHosts};

/// Per-user launch agents under `~/Library/LaunchAgents`
pub struct LaunchdPlatform {
    remote: RemoteHosts,
    home: PathBuf,
}

impl LaunchdPlatform {
    pub fn new(runner: CommandRunner, home: PathBuf) -> Self {
        Self {
            remote: RemoteHosts::new(runner),
            home,
        }
    }

    fn runner(&self) -> &CommandRunner {
        self.remote.runner()
    }

    fn path_arg(path: &Path) -> String {
        path.display().to_string()
    }

    /// `launchctl unload`; an agent that was never loaded is fine
    async fn unload_local(&self, service_path: &Path) {
        let unload = Launchctl::new("unload", Self::path_arg(service_path));
        if let Err(e) = self.runner().run_system(&unload).await {
            debug!(path = %service_path.display(), error = %e, "Ignoring unload failure");
        }
    }

    async fn unload_remote(&self, gp_home: &Path, hosts: &[String], service_path: &Path) {
        let unload = Launchctl::new("unload", Self::path_arg(service_path));
        match self
            .remote
            .run_each("unload agent service", gp_home, hosts, &unload)
            .await
        {
            Ok(report) if !report.is_success() => {
                debug!(hosts = ?report.failed_hosts(), "Ignoring unload failures")
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Ignoring unload failure"),
        }
    }
}

#[async_trait]
impl Platform for LaunchdPlatform {
    fn platform_os(&self) -> PlatformOs {
        PlatformOs::Darwin
    }

    fn default_service_dir(&self) -> PathBuf {
        self.home.join("Library").join("LaunchAgents")
    }

    fn service_file_name(&self, role: ProcessRole, service_name: &str) -> String {
        format!("{}.plist", role.unit_name(service_name))
    }

    fn generate_service_file_contents(
        &self,
        role: ProcessRole,
        gp_home: &Path,
        service_name: &str,
    ) -> String {
        let label = role.unit_name(service_name);
        let gp_home = gp_home.display();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{gp_home}/bin/gp</string>
        <string>{role}</string>
    </array>
    <key>StandardOutPath</key>
    <string>/tmp/grpc_{role}.log</string>
    <key>StandardErrorPath</key>
    <string>/tmp/grpc_{role}.log</string>
    <key>EnvironmentVariables</key>
    <dict>
        <key>PATH</key>
        <string>/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin:{gp_home}/bin</string>
        <key>GPHOME</key>
        <string>{gp_home}</string>
    </dict>
</dict>
</plist>
"#
        )
    }

    async fn create_service_dir(
        &self,
        hosts: &[String],
        service_dir: &Path,
        gp_home: &Path,
    ) -> Result<()> {
        self.remote.make_dir(gp_home, hosts, service_dir).await
    }

    async fn create_and_install_hub_service_file(
        &self,
        gp_home: &Path,
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()> {
        let role = ProcessRole::Hub;
        let contents = self.generate_service_file_contents(role, gp_home, service_name);
        let path = write_local_file(
            service_dir,
            &self.service_file_name(role, service_name),
            &contents,
        )
        .await?;

        self.reload_hub_service(&path).await?;

        info!(path = %path.display(), "Installed hub launch agent");
        Ok(())
    }

    async fn create_and_install_agent_service_file(
        &self,
        hosts: &[String],
        gp_home: &Path,
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()> {
        let role = ProcessRole::Agent;
        let contents = self.generate_service_file_contents(role, gp_home, service_name);
        let path = service_dir.join(self.service_file_name(role, service_name));

        self.remote
            .copy_contents(gp_home, hosts, &contents, &path)
            .await?;
        self.reload_agent_service(gp_home, hosts, &path).await?;

        info!(path = %path.display(), hosts = hosts.len(), "Installed agent launch agents");
        Ok(())
    }

    /// launchd has no reload; unload then load the plist
    async fn reload_hub_service(&self, service_path: &Path) -> Result<()> {
        self.unload_local(service_path).await;
        self.runner()
            .run_system(&Launchctl::new("load", Self::path_arg(service_path)))
            .await?;
        Ok(())
    }

    async fn reload_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_path: &Path,
    ) -> Result<()> {
        self.unload_remote(gp_home, hosts, service_path).await;
        self.remote
            .run_all(
                "load agent service",
                gp_home,
                hosts,
                &Launchctl::new("load", Self::path_arg(service_path)),
            )
            .await
    }

    async fn start_hub_service(&self, service_name: &str) -> Result<()> {
        let label = ProcessRole::Hub.unit_name(service_name);
        self.runner()
            .run_system(&Launchctl::new("start", label))
            .await?;
        Ok(())
    }

    async fn start_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()> {
        let label = ProcessRole::Agent.unit_name(service_name);
        self.remote
            .run_all("start agent service", gp_home, hosts, &Launchctl::new("start", label))
            .await
    }

    async fn stop_hub_service(&self, service_name: &str) -> Result<()> {
        let label = ProcessRole::Hub.unit_name(service_name);
        self.runner()
            .run_system(&Launchctl::new("stop", label))
            .await?;
        Ok(())
    }

    async fn stop_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()> {
        let label = ProcessRole::Agent.unit_name(service_name);
        self.remote
            .run_all("stop agent service", gp_home, hosts, &Launchctl::new("stop", label))
            .await
    }

    async fn remove_hub_service_file(&self, service_dir: &Path, service_name: &str) -> Result<()> {
        let path = service_dir.join(self.service_file_name(ProcessRole::Hub, service_name));

        self.unload_local(&path).await;
        remove_local_file(&path).await
    }

    async fn remove_agent_service_file(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()> {
        let path = service_dir.join(self.service_file_name(ProcessRole::Agent, service_name));

        self.unload_remote(gp_home, hosts, &path).await;
        self.remote.remove_file(gp_home, hosts, &path).await
    }

    async fn get_service_status_message(&self, service_name: &str) -> Result<String> {
        let output = self
            .runner()
            .run_system(&Launchctl::new("list", service_name))
            .await?;
        Ok(output.stdout_lossy())
    }

    /// `launchctl list <label>` output: a plist-like `"Key" = Value;` dictionary
    fn parse_service_status_message(&self, message: &str) -> ServiceStatus {
        let mut status = ServiceStatus::unknown("");
        let mut labelled = false;
        let mut last_exit = 0;

        for line in message.lines().map(strip_host_prefix) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_end_matches(';').trim().trim_matches('"');
            match key.trim().trim_matches('"') {
                "Label" => labelled = true,
                "PID" => {
                    if let Ok(pid) = value.parse() {
                        status.pid = pid;
                        status.state = ServiceState::Running;
                    }
                }
                "LastExitStatus" => last_exit = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        if !status.is_running() && labelled {
            status.state = if last_exit == 0 {
                ServiceState::Stopped
            } else {
                ServiceState::Failed
            };
        }
        status
    }

    async fn agent_statuses(
        &self,
        gp_home: &Path,
        hosts: &[String],
        unit: &str,
    ) -> Vec<ServiceStatus> {
        self.remote
            .statuses(gp_home, hosts, &Launchctl::new("list", unit), |message| {
                self.parse_service_status_message(message)
            })
            .await
    }

    fn display_service_status(
        &self,
        out: &mut dyn Write,
        service_name: &str,
        statuses: &[ServiceStatus],
        skip_header: bool,
    ) -> std::io::Result<()> {
        super::render_status_table(out, service_name, statuses, skip_header)
    }

    /// Launch agents do not depend on a login session
    async fn enable_user_lingering(
        &self,
        _hosts: &[String],
        _gp_home: &Path,
        service_user: &str,
    ) -> Result<()> {
        debug!(user = %service_user, "User lingering not needed with launchd");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpmgmt_core::port::command_executor::mocks::{FakeBehavior, FakeExecutor};
    use std::sync::Arc;

    fn platform(executor: FakeExecutor) -> (LaunchdPlatform, Arc<FakeExecutor>) {
        let executor = Arc::new(executor);
        let runner = CommandRunner::new(executor.clone());
        (
            LaunchdPlatform::new(runner, PathBuf::from("/Users/gpadmin")),
            executor,
        )
    }

    const RUNNING: &str = r#"{
	"LimitLoadToSessionType" = "Aqua";
	"Label" = "gp_hub";
	"OnDemand" = true;
	"LastExitStatus" = 0;
	"PID" = 19909;
	"Program" = "/usr/local/gp/bin/gp";
};"#;

    #[test]
    fn test_plist_contents() {
        let (platform, _) = platform(FakeExecutor::new_success());

        let plist = platform.generate_service_file_contents(
            ProcessRole::Agent,
            Path::new("/usr/local/gp"),
            "gp",
        );

        assert!(plist.contains("<string>gp_agent</string>"));
        assert!(plist.contains("<string>/usr/local/gp/bin/gp</string>"));
        assert!(plist.contains("<string>/tmp/grpc_agent.log</string>"));
        assert!(plist.contains("<key>GPHOME</key>"));
        assert_eq!(platform.service_file_name(ProcessRole::Agent, "gp"), "gp_agent.plist");
    }

    #[test]
    fn test_parse_running() {
        let (platform, _) = platform(FakeExecutor::new_success());

        let status = platform.parse_service_status_message(RUNNING);

        assert_eq!(status.state, ServiceState::Running);
        assert_eq!(status.pid, 19909);
        assert!(status.uptime.is_empty());
    }

    #[test]
    fn test_parse_loaded_but_stopped() {
        let (platform, _) = platform(FakeExecutor::new_success());
        let stopped = "{\n\t\"Label\" = \"gp_hub\";\n\t\"LastExitStatus\" = 0;\n};";
        let crashed = "{\n\t\"Label\" = \"gp_hub\";\n\t\"LastExitStatus\" = 256;\n};";

        assert_eq!(platform.parse_service_status_message(stopped).state, ServiceState::Stopped);
        assert_eq!(platform.parse_service_status_message(crashed).state, ServiceState::Failed);
    }

    #[test]
    fn test_parse_unrecognized_is_unknown() {
        let (platform, _) = platform(FakeExecutor::new_success());

        let status = platform
            .parse_service_status_message("Could not find service \"gp_hub\" in domain for port");

        assert_eq!(status, ServiceStatus::unknown(""));
    }

    #[tokio::test]
    async fn test_reload_hub_unloads_then_loads() {
        let executor = FakeExecutor::new_success().register("unload", FakeBehavior::failure());
        let (platform, executor) = platform(executor);
        let path = Path::new("/Users/gpadmin/Library/LaunchAgents/gp_hub.plist");

        platform.reload_hub_service(path).await.unwrap();

        assert_eq!(
            executor.command_lines(),
            vec![
                "launchctl unload /Users/gpadmin/Library/LaunchAgents/gp_hub.plist",
                "launchctl load /Users/gpadmin/Library/LaunchAgents/gp_hub.plist",
            ]
        );
    }

    #[tokio::test]
    async fn test_lingering_is_noop() {
        let (platform, executor) = platform(FakeExecutor::new_success());

        platform
            .enable_user_lingering(&["sdw1".to_string()], Path::new("gpHome"), "gpadmin")
            .await
            .unwrap();

        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_start_agents_reports_failing_host() {
        let executor = FakeExecutor::new_success().register("mdw2", FakeBehavior::failure());
        let (platform, _) = platform(executor);
        let hosts = vec!["mdw1".to_string(), "mdw2".to_string()];

        let err = platform
            .start_agent_service(Path::new("gpHome"), &hosts, "gp")
            .await
            .unwrap_err();

        assert_eq!(err.failed_hosts(), vec!["mdw2"]);
    }

    const AGENT_PLIST: &str = "/Users/gpadmin/Library/LaunchAgents/gp_agent.plist";

    fn agent_hosts() -> Vec<String> {
        vec!["mdw1".to_string(), "mdw2".to_string()]
    }

    fn remote_lines(executor: &FakeExecutor, action: &str) -> Vec<String> {
        let mut lines: Vec<String> = executor
            .command_lines()
            .into_iter()
            .filter(|l| l.contains(&format!("launchctl {} ", action)))
            .collect();
        lines.sort();
        lines
    }

    #[tokio::test]
    async fn test_agent_install_copies_then_reloads() {
        let (platform, executor) = platform(FakeExecutor::new_success());

        platform
            .create_and_install_agent_service_file(
                &agent_hosts(),
                Path::new("gpHome"),
                Path::new("/Users/gpadmin/Library/LaunchAgents"),
                "gp",
            )
            .await
            .unwrap();

        let lines = executor.command_lines();
        assert_eq!(lines.len(), 6);
        assert!(lines[..2].iter().all(|l| l.starts_with("gpHome/bin/gpsync -h ")));
        assert!(lines[..2].iter().all(|l| l.ends_with(&format!(" =:{}", AGENT_PLIST))));
        assert!(lines[2..4].iter().all(|l| l.contains("launchctl unload ")));
        assert!(lines[4..].iter().all(|l| l.contains("launchctl load ")));
        assert_eq!(
            remote_lines(&executor, "load"),
            vec![
                format!("gpHome/bin/gpssh -h mdw1 launchctl load {}", AGENT_PLIST),
                format!("gpHome/bin/gpssh -h mdw2 launchctl load {}", AGENT_PLIST),
            ]
        );
    }

    #[tokio::test]
    async fn test_agent_install_stops_when_a_copy_fails() {
        let executor = FakeExecutor::new_success().register("mdw2", FakeBehavior::failure());
        let (platform, executor) = platform(executor);

        let err = platform
            .create_and_install_agent_service_file(
                &agent_hosts(),
                Path::new("gpHome"),
                Path::new("/Users/gpadmin/Library/LaunchAgents"),
                "gp",
            )
            .await
            .unwrap_err();

        assert_eq!(err.failed_hosts(), vec!["mdw2"]);
        assert_eq!(executor.call_count(), 2);
        assert!(executor.command_lines().iter().all(|l| !l.contains("launchctl")));
    }

    #[tokio::test]
    async fn test_remote_unload_failures_are_ignored() {
        let executor = FakeExecutor::new_success().register(
            format!("launchctl unload {}", AGENT_PLIST),
            FakeBehavior::failure(),
        );
        let (platform, executor) = platform(executor);

        platform
            .reload_agent_service(Path::new("gpHome"), &agent_hosts(), Path::new(AGENT_PLIST))
            .await
            .unwrap();

        assert_eq!(remote_lines(&executor, "unload").len(), 2);
        assert_eq!(remote_lines(&executor, "load").len(), 2);
    }

    #[tokio::test]
    async fn test_remove_agent_unloads_then_deletes() {
        let (platform, executor) = platform(FakeExecutor::new_success());

        platform
            .remove_agent_service_file(
                Path::new("gpHome"),
                &agent_hosts(),
                Path::new("/Users/gpadmin/Library/LaunchAgents"),
                "gp",
            )
            .await
            .unwrap();

        let lines = executor.command_lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[..2].iter().all(|l| l.contains("launchctl unload ")));
        let mut removed = lines[2..].to_vec();
        removed.sort();
        assert_eq!(
            removed,
            vec![
                format!("gpHome/bin/gpssh -h mdw1 rm -f {}", AGENT_PLIST),
                format!("gpHome/bin/gpssh -h mdw2 rm -f {}", AGENT_PLIST),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_agent_reports_failing_host() {
        let executor = FakeExecutor::new_success()
            .register(format!("rm -f {}", AGENT_PLIST), FakeBehavior::failure());
        let (platform, _) = platform(executor);

        let err = platform
            .remove_agent_service_file(
                Path::new("gpHome"),
                &agent_hosts(),
                Path::new("/Users/gpadmin/Library/LaunchAgents"),
                "gp",
            )
            .await
            .unwrap_err();

        assert_eq!(err.failed_hosts(), vec!["mdw1", "mdw2"]);
    }

    #[tokio::test]
    async fn test_remove_hub_deletes_local_plist() {
        let dir = tempfile::tempdir().unwrap();
        let plist = dir.path().join("gp_hub.plist");
        std::fs::write(&plist, "<plist/>").unwrap();
        let (platform, executor) = platform(FakeExecutor::new_success());

        platform.remove_hub_service_file(dir.path(), "gp").await.unwrap();

        assert!(!plist.exists());
        assert_eq!(
            executor.command_lines(),
            vec![format!("launchctl unload {}", plist.display())]
        );
    }
}
