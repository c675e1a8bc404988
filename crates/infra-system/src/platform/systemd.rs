// Linux systemd user-unit platform
// reason: systemctl --user so the management services run as the database admin, not root

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use gpmgmt_core::application::CommandRunner;
use gpmgmt_core::domain::commands::{Loginctl, Systemctl};
use gpmgmt_core::domain::{PlatformOs, ProcessRole, ServiceState, ServiceStatus};
use gpmgmt_core::port::platform::Result;
use gpmgmt_core::port::Platform;

use super::{remove_local_file, strip_host_prefix, write_local_file, RemoteHosts};

/// Properties requested from `systemctl show`
const STATUS_PROPERTIES: &str = "ActiveState,MainPID,ExecMainStartTimestamp";

/// systemd user units under `~/.config/systemd/user`
pub struct SystemdPlatform {
    remote: RemoteHosts,
    home: PathBuf,
}

impl SystemdPlatform {
    pub fn new(runner: CommandRunner, home: PathBuf) -> Self {
        Self {
            remote: RemoteHosts::new(runner),
            home,
        }
    }

    fn runner(&self) -> &CommandRunner {
        self.remote.runner()
    }

    fn status_query(unit: &str) -> Systemctl {
        Systemctl {
            property: STATUS_PROPERTIES.to_string(),
            ..Systemctl::user("show", unit)
        }
    }

    async fn systemctl(&self, action: &str, unit: &str) -> Result<()> {
        self.runner().run_system(&Systemctl::user(action, unit)).await?;
        Ok(())
    }
}

#[async_trait]
impl Platform for SystemdPlatform {
    fn platform_os(&self) -> PlatformOs {
        PlatformOs::Linux
    }

    fn default_service_dir(&self) -> PathBuf {
        self.home.join(".config").join("systemd").join("user")
    }

    fn service_file_name(&self, role: ProcessRole, service_name: &str) -> String {
        format!("{}.service", role.unit_name(service_name))
    }

    fn generate_service_file_contents(
        &self,
        role: ProcessRole,
        gp_home: &Path,
        _service_name: &str,
    ) -> String {
        let gp_home = gp_home.display();
        format!(
            r#"[Unit]
Description=Greengage Database management utility {role}

[Service]
Type=simple
Environment=GPHOME={gp_home}
ExecStart={gp_home}/bin/gp {role}
Restart=on-failure
StandardOutput=file:/tmp/grpc_{role}.log
StandardError=file:/tmp/grpc_{role}.log

[Install]
WantedBy=default.target
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
        self.systemctl("enable", &role.unit_name(service_name)).await?;

        info!(path = %path.display(), "Installed hub service file");
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
        self.remote
            .run_all(
                "enable agent service",
                gp_home,
                hosts,
                &Systemctl::user("enable", &role.unit_name(service_name)),
            )
            .await?;

        info!(path = %path.display(), hosts = hosts.len(), "Installed agent service files");
        Ok(())
    }

    async fn reload_hub_service(&self, service_path: &Path) -> Result<()> {
        debug!(path = %service_path.display(), "Reloading systemd user units");
        self.systemctl("daemon-reload", "").await
    }

    async fn reload_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_path: &Path,
    ) -> Result<()> {
        debug!(path = %service_path.display(), "Reloading systemd user units on agents");
        self.remote
            .run_all(
                "reload agent service",
                gp_home,
                hosts,
                &Systemctl::user("daemon-reload", ""),
            )
            .await
    }

    async fn start_hub_service(&self, service_name: &str) -> Result<()> {
        self.systemctl("start", &ProcessRole::Hub.unit_name(service_name))
            .await
    }

    async fn start_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()> {
        let unit = ProcessRole::Agent.unit_name(service_name);
        self.remote
            .run_all("start agent service", gp_home, hosts, &Systemctl::user("start", &unit))
            .await
    }

    async fn stop_hub_service(&self, service_name: &str) -> Result<()> {
        self.systemctl("stop", &ProcessRole::Hub.unit_name(service_name))
            .await
    }

    async fn stop_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()> {
        let unit = ProcessRole::Agent.unit_name(service_name);
        self.remote
            .run_all("stop agent service", gp_home, hosts, &Systemctl::user("stop", &unit))
            .await
    }

    async fn remove_hub_service_file(&self, service_dir: &Path, service_name: &str) -> Result<()> {
        let role = ProcessRole::Hub;
        let path = service_dir.join(self.service_file_name(role, service_name));

        self.systemctl("disable", &role.unit_name(service_name)).await?;
        remove_local_file(&path).await?;
        self.reload_hub_service(&path).await
    }

    async fn remove_agent_service_file(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()> {
        let role = ProcessRole::Agent;
        let path = service_dir.join(self.service_file_name(role, service_name));

        self.remote
            .run_all(
                "disable agent service",
                gp_home,
                hosts,
                &Systemctl::user("disable", &role.unit_name(service_name)),
            )
            .await?;
        self.remote.remove_file(gp_home, hosts, &path).await?;
        self.reload_agent_service(gp_home, hosts, &path).await
    }

    async fn get_service_status_message(&self, service_name: &str) -> Result<String> {
        let output = self
            .runner()
            .run_system(&Self::status_query(service_name))
            .await?;
        Ok(output.stdout_lossy())
    }

    /// `systemctl show` output: one `Key=Value` per line
    fn parse_service_status_message(&self, message: &str) -> ServiceStatus {
        let mut status = ServiceStatus::unknown("");

        for line in message.lines().map(strip_host_prefix) {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "ActiveState" => {
                    status.state = match value {
                        "active" | "reloading" => ServiceState::Running,
                        "inactive" | "deactivating" => ServiceState::Stopped,
                        "failed" => ServiceState::Failed,
                        _ => ServiceState::Unknown,
                    }
                }
                "MainPID" => status.pid = value.parse().unwrap_or(0),
                "ExecMainStartTimestamp" => status.uptime = value.to_string(),
                _ => {}
            }
        }

        if !status.is_running() {
            status.pid = 0;
            status.uptime.clear();
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
            .statuses(gp_home, hosts, &Self::status_query(unit), |message| {
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

    async fn enable_user_lingering(
        &self,
        hosts: &[String],
        gp_home: &Path,
        service_user: &str,
    ) -> Result<()> {
        let loginctl = Loginctl {
            action: "enable-linger".to_string(),
            user: service_user.to_string(),
        };
        self.remote
            .run_all("enable user lingering", gp_home, hosts, &loginctl)
            .await?;

        info!(user = %service_user, hosts = hosts.len(), "Enabled user lingering");
        Ok(())
    }
}
