// Platform Port
// Service lifecycle across hosts, independent of the service manager

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CommandError, HostFailures, PlatformOs, ProcessRole, ServiceStatus};

/// Platform errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Hosts(#[from] HostFailures),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlatformError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlatformError::Io {
            path: path.into(),
            source,
        }
    }

    /// Hosts that failed, when the error came from a multi-host operation
    pub fn failed_hosts(&self) -> Vec<&str> {
        match self {
            PlatformError::Hosts(failures) => failures.hosts(),
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform trait
///
/// One implementation per service-manager family, selected once at startup.
/// Multi-host operations run one unit of work per host concurrently, join
/// them, and report every failing host through `PlatformError::Hosts`.
///
/// Implementations:
/// - SystemdPlatform (infra-system): Linux user units
/// - LaunchdPlatform (infra-system): macOS launch agents
/// - mocks::MockPlatform: canned answers for tests
#[async_trait]
pub trait Platform: Send + Sync {
    fn platform_os(&self) -> PlatformOs;

    /// Directory the service manager reads user service files from
    fn default_service_dir(&self) -> PathBuf;

    /// File name of the service definition, e.g. `gp_hub.service`
    fn service_file_name(&self, role: ProcessRole, service_name: &str) -> String;

    /// Service definition text for `role` (pure)
    fn generate_service_file_contents(
        &self,
        role: ProcessRole,
        gp_home: &Path,
        service_name: &str,
    ) -> String;

    /// Ensure `service_dir` exists on every host (existing is success)
    async fn create_service_dir(
        &self,
        hosts: &[String],
        service_dir: &Path,
        gp_home: &Path,
    ) -> Result<()>;

    /// Write and register the hub service file on the local host
    async fn create_and_install_hub_service_file(
        &self,
        gp_home: &Path,
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()>;

    /// Write and register the agent service file on every host
    async fn create_and_install_agent_service_file(
        &self,
        hosts: &[String],
        gp_home: &Path,
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()>;

    /// Make the local service manager re-read `service_path`
    async fn reload_hub_service(&self, service_path: &Path) -> Result<()>;

    /// Make every host's service manager re-read `service_path`
    async fn reload_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_path: &Path,
    ) -> Result<()>;

    async fn start_hub_service(&self, service_name: &str) -> Result<()>;

    async fn start_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()>;

    async fn stop_hub_service(&self, service_name: &str) -> Result<()>;

    async fn stop_agent_service(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_name: &str,
    ) -> Result<()>;

    /// Unregister and delete the hub service file
    async fn remove_hub_service_file(&self, service_dir: &Path, service_name: &str) -> Result<()>;

    /// Unregister and delete the agent service file on every host
    async fn remove_agent_service_file(
        &self,
        gp_home: &Path,
        hosts: &[String],
        service_dir: &Path,
        service_name: &str,
    ) -> Result<()>;

    /// Raw status text from the local service manager
    async fn get_service_status_message(&self, service_name: &str) -> Result<String>;

    /// Parse raw status text (pure; unknown on unrecognized input)
    fn parse_service_status_message(&self, message: &str) -> ServiceStatus;

    /// Status of `unit` on every host, in host order
    ///
    /// A host whose query fails is reported as unknown.
    async fn agent_statuses(
        &self,
        gp_home: &Path,
        hosts: &[String],
        unit: &str,
    ) -> Vec<ServiceStatus>;

    /// Write a status table, one row per status in input order
    fn display_service_status(
        &self,
        out: &mut dyn Write,
        service_name: &str,
        statuses: &[ServiceStatus],
        skip_header: bool,
    ) -> std::io::Result<()>;

    /// Keep `service_user`'s services running without a login session
    ///
    /// No-op on platforms that do not need it.
    async fn enable_user_lingering(
        &self,
        hosts: &[String],
        gp_home: &Path,
        service_user: &str,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{CommandOutput, ServiceState};
    use std::sync::Mutex;

    /// Mock platform recording every call by name
    pub struct MockPlatform {
        pub os: PlatformOs,
        pub service_dir: PathBuf,
        pub service_file_content: String,
        pub service_status_message: String,
        pub status: ServiceStatus,
        /// Operations (by method name) that fail with exit code 1
        failing: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockPlatform {
        pub fn new() -> Self {
            Self {
                os: PlatformOs::Linux,
                service_dir: PathBuf::from("/tmp/services"),
                service_file_content: String::new(),
                service_status_message: String::new(),
                status: ServiceStatus {
                    host: String::new(),
                    state: ServiceState::Running,
                    pid: 1234,
                    uptime: "5H".to_string(),
                },
                failing: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Make `operation` fail from now on
        pub fn fail_on(&self, operation: &str) {
            self.failing.lock().unwrap().push(operation.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, operation: &str) -> Result<()> {
            self.calls.lock().unwrap().push(operation.to_string());
            if self.failing.lock().unwrap().iter().any(|o| o == operation) {
                return Err(PlatformError::Command(CommandError::Exit {
                    command: operation.to_string(),
                    code: Some(1),
                    output: CommandOutput::new("", "failure", Some(1)),
                }));
            }
            Ok(())
        }
    }

    impl Default for MockPlatform {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Platform for MockPlatform {
        fn platform_os(&self) -> PlatformOs {
            self.os
        }

        fn default_service_dir(&self) -> PathBuf {
            self.service_dir.clone()
        }

        fn service_file_name(&self, role: ProcessRole, service_name: &str) -> String {
            format!("{}.service", role.unit_name(service_name))
        }

        fn generate_service_file_contents(&self, _: ProcessRole, _: &Path, _: &str) -> String {
            self.service_file_content.clone()
        }

        async fn create_service_dir(&self, _: &[String], _: &Path, _: &Path) -> Result<()> {
            self.record("create_service_dir")
        }

        async fn create_and_install_hub_service_file(
            &self,
            _: &Path,
            _: &Path,
            _: &str,
        ) -> Result<()> {
            self.record("create_and_install_hub_service_file")
        }

        async fn create_and_install_agent_service_file(
            &self,
            _: &[String],
            _: &Path,
            _: &Path,
            _: &str,
        ) -> Result<()> {
            self.record("create_and_install_agent_service_file")
        }

        async fn reload_hub_service(&self, _: &Path) -> Result<()> {
            self.record("reload_hub_service")
        }

        async fn reload_agent_service(&self, _: &Path, _: &[String], _: &Path) -> Result<()> {
            self.record("reload_agent_service")
        }

        async fn start_hub_service(&self, _: &str) -> Result<()> {
            self.record("start_hub_service")
        }

        async fn start_agent_service(&self, _: &Path, _: &[String], _: &str) -> Result<()> {
            self.record("start_agent_service")
        }

        async fn stop_hub_service(&self, _: &str) -> Result<()> {
            self.record("stop_hub_service")
        }

        async fn stop_agent_service(&self, _: &Path, _: &[String], _: &str) -> Result<()> {
            self.record("stop_agent_service")
        }

        async fn remove_hub_service_file(&self, _: &Path, _: &str) -> Result<()> {
            self.record("remove_hub_service_file")
        }

        async fn remove_agent_service_file(
            &self,
            _: &Path,
            _: &[String],
            _: &Path,
            _: &str,
        ) -> Result<()> {
            self.record("remove_agent_service_file")
        }

        async fn get_service_status_message(&self, _: &str) -> Result<String> {
            self.record("get_service_status_message")?;
            Ok(self.service_status_message.clone())
        }

        fn parse_service_status_message(&self, _: &str) -> ServiceStatus {
            self.status.clone()
        }

        async fn agent_statuses(&self, _: &Path, hosts: &[String], _: &str) -> Vec<ServiceStatus> {
            if self.record("agent_statuses").is_err() {
                return hosts.iter().map(ServiceStatus::unknown).collect();
            }
            hosts
                .iter()
                .map(|host| self.status.clone().with_host(host.as_str()))
                .collect()
        }

        fn display_service_status(
            &self,
            _: &mut dyn Write,
            _: &str,
            _: &[ServiceStatus],
            _: bool,
        ) -> std::io::Result<()> {
            Ok(())
        }

        async fn enable_user_lingering(&self, _: &[String], _: &Path, _: &str) -> Result<()> {
            self.record("enable_user_lingering")
        }
    }
}
