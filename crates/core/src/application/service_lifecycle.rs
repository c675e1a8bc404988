// Service Lifecycle - install/start/stop/status/uninstall of hub and agents

use std::sync::Arc;

use tracing::info;

use crate::domain::{ProcessRole, ServiceDescriptor, ServiceStatus};
use crate::error::{AppError, Result};
use crate::port::Platform;

/// Drives one service through its lifecycle on the hub and every agent host
///
/// Transitions only happen through explicit calls:
/// NotInstalled -> Installed -> Running <-> Stopped -> Uninstalled.
pub struct ServiceLifecycle {
    platform: Arc<dyn Platform>,
    descriptor: ServiceDescriptor,
}

impl ServiceLifecycle {
    pub fn new(platform: Arc<dyn Platform>, descriptor: ServiceDescriptor) -> Self {
        Self {
            platform,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    /// Create service directories, install hub and agent service files
    ///
    /// # Arguments
    /// * `linger_user` - When set, enable lingering for this user on every host
    pub async fn install(&self, linger_user: Option<&str>) -> Result<()> {
        let d = &self.descriptor;

        self.platform
            .create_service_dir(&d.hosts, &d.service_dir, &d.gp_home)
            .await
            .map_err(|e| AppError::from(e).context("creating service directory"))?;

        self.platform
            .create_and_install_hub_service_file(&d.gp_home, &d.service_dir, &d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("installing hub service"))?;

        self.platform
            .create_and_install_agent_service_file(
                &d.hosts,
                &d.gp_home,
                &d.service_dir,
                &d.service_name,
            )
            .await
            .map_err(|e| AppError::from(e).context("installing agent services"))?;

        if let Some(user) = linger_user {
            self.platform
                .enable_user_lingering(&d.hosts, &d.gp_home, user)
                .await
                .map_err(|e| AppError::from(e).context("enabling user lingering"))?;
        }

        info!(
            service = %d.service_name,
            hosts = d.hosts.len(),
            platform = %self.platform.platform_os(),
            "Service installed"
        );
        Ok(())
    }

    /// Start the hub, then the agents
    pub async fn start(&self) -> Result<()> {
        let d = &self.descriptor;

        self.platform
            .start_hub_service(&d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("starting hub service"))?;

        self.platform
            .start_agent_service(&d.gp_home, &d.hosts, &d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("starting agent services"))?;

        info!(service = %d.service_name, "Service started");
        Ok(())
    }

    /// Stop the agents, then the hub
    pub async fn stop(&self) -> Result<()> {
        let d = &self.descriptor;

        self.platform
            .stop_agent_service(&d.gp_home, &d.hosts, &d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("stopping agent services"))?;

        self.platform
            .stop_hub_service(&d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("stopping hub service"))?;

        info!(service = %d.service_name, "Service stopped");
        Ok(())
    }

    /// Hub status followed by one status per agent host, in host order
    pub async fn status(&self) -> Result<(ServiceStatus, Vec<ServiceStatus>)> {
        let d = &self.descriptor;

        let message = self
            .platform
            .get_service_status_message(&d.unit_name(ProcessRole::Hub))
            .await
            .map_err(|e| AppError::from(e).context("querying hub status"))?;
        let hub = self.platform.parse_service_status_message(&message);

        let agents = self
            .platform
            .agent_statuses(&d.gp_home, &d.hosts, &d.unit_name(ProcessRole::Agent))
            .await;

        Ok((hub, agents))
    }

    /// Stop everything and remove every service file
    pub async fn uninstall(&self) -> Result<()> {
        let d = &self.descriptor;

        self.stop().await?;

        self.platform
            .remove_agent_service_file(&d.gp_home, &d.hosts, &d.service_dir, &d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("removing agent service files"))?;

        self.platform
            .remove_hub_service_file(&d.service_dir, &d.service_name)
            .await
            .map_err(|e| AppError::from(e).context("removing hub service file"))?;

        info!(service = %d.service_name, "Service uninstalled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::platform::mocks::MockPlatform;
    use std::path::PathBuf;

    fn lifecycle(platform: Arc<MockPlatform>) -> ServiceLifecycle {
        let descriptor = ServiceDescriptor {
            service_name: "gp".to_string(),
            hosts: vec!["sdw1".to_string(), "sdw2".to_string()],
            gp_home: PathBuf::from("gpHome"),
            service_dir: PathBuf::from("/tmp/services"),
        };
        ServiceLifecycle::new(platform, descriptor)
    }

    #[tokio::test]
    async fn test_install_runs_steps_in_order() {
        let platform = Arc::new(MockPlatform::new());

        lifecycle(platform.clone()).install(Some("gpadmin")).await.unwrap();

        assert_eq!(
            platform.calls(),
            vec![
                "create_service_dir",
                "create_and_install_hub_service_file",
                "create_and_install_agent_service_file",
                "enable_user_lingering",
            ]
        );
    }

    #[tokio::test]
    async fn test_install_without_lingering() {
        let platform = Arc::new(MockPlatform::new());

        lifecycle(platform.clone()).install(None).await.unwrap();

        assert!(!platform.calls().contains(&"enable_user_lingering".to_string()));
    }

    #[tokio::test]
    async fn test_install_stops_at_first_failure() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_on("create_and_install_hub_service_file");

        let err = lifecycle(platform.clone()).install(None).await.unwrap_err();

        assert!(err.to_string().starts_with("installing hub service: "));
        assert_eq!(err.command_error().and_then(|e| e.exit_code()), Some(1));
        assert_eq!(platform.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_agents_before_hub() {
        let platform = Arc::new(MockPlatform::new());

        lifecycle(platform.clone()).stop().await.unwrap();

        assert_eq!(platform.calls(), vec!["stop_agent_service", "stop_hub_service"]);
    }

    #[tokio::test]
    async fn test_status_reports_hub_and_agents() {
        let platform = Arc::new(MockPlatform::new());

        let (hub, agents) = lifecycle(platform).status().await.unwrap();

        assert!(hub.is_running());
        assert_eq!(hub.pid, 1234);
        assert_eq!(
            agents.iter().map(|s| s.host.as_str()).collect::<Vec<_>>(),
            vec!["sdw1", "sdw2"]
        );
    }

    #[tokio::test]
    async fn test_uninstall_stops_then_removes() {
        let platform = Arc::new(MockPlatform::new());

        lifecycle(platform.clone()).uninstall().await.unwrap();

        assert_eq!(
            platform.calls(),
            vec![
                "stop_agent_service",
                "stop_hub_service",
                "remove_agent_service_file",
                "remove_hub_service_file",
            ]
        );
    }
}
