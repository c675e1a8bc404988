// Cluster management configuration (the gp.conf document)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::service::ServiceDescriptor;

pub const DEFAULT_HUB_PORT: u16 = 4242;
pub const DEFAULT_AGENT_PORT: u16 = 8000;
pub const DEFAULT_SERVICE_NAME: &str = "gp";
pub const DEFAULT_LOG_DIR: &str = "~/gpAdminLogs";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// TLS material locations for hub/agent RPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPaths {
    pub ca_certificate: PathBuf,
    pub server_certificate: PathBuf,
    pub server_key: PathBuf,
    pub client_certificate: PathBuf,
    pub client_key: PathBuf,
}

/// Configuration consumed by the command and platform layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hub_port: u16,
    pub agent_port: u16,
    pub hostnames: Vec<String>,
    pub log_dir: PathBuf,
    pub service_name: String,
    pub gp_home: PathBuf,
    /// Falls back to the platform default when unset
    pub service_dir: Option<PathBuf>,
    /// User whose services must survive logout
    pub service_user: Option<String>,
    pub command_timeout_secs: u64,
    pub credentials: CredentialPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub_port: DEFAULT_HUB_PORT,
            agent_port: DEFAULT_AGENT_PORT,
            hostnames: Vec::new(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            gp_home: PathBuf::new(),
            service_dir: None,
            service_user: None,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            credentials: CredentialPaths::default(),
        }
    }
}

impl Config {
    /// Reject configurations no command could be built from
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(DomainError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }

        if self
            .service_name
            .chars()
            .any(|c| c.is_whitespace() || c == '/')
        {
            return Err(DomainError::ValidationError(format!(
                "service_name '{}' must not contain whitespace or '/'",
                self.service_name
            )));
        }

        if self.hub_port == self.agent_port {
            return Err(DomainError::ValidationError(format!(
                "hub_port and agent_port must differ (both {})",
                self.hub_port
            )));
        }

        if self.gp_home.as_os_str().is_empty() {
            return Err(DomainError::ValidationError(
                "gp_home is not set (set GPHOME or gp_home in the config file)".to_string(),
            ));
        }

        if let Some(host) = self.hostnames.iter().find(|h| h.trim().is_empty()) {
            return Err(DomainError::ValidationError(format!(
                "hostnames contains an empty entry: '{}'",
                host
            )));
        }

        Ok(())
    }

    /// Descriptor for the configured service, using `default_service_dir` when unset
    pub fn service_descriptor(&self, default_service_dir: PathBuf) -> ServiceDescriptor {
        ServiceDescriptor {
            service_name: self.service_name.clone(),
            hosts: self.hostnames.clone(),
            gp_home: self.gp_home.clone(),
            service_dir: self.service_dir.clone().unwrap_or(default_service_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            gp_home: PathBuf::from("/usr/local/greengage"),
            hostnames: vec!["cdw".to_string(), "sdw1".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.hub_port, 4242);
        assert_eq!(config.agent_port, 8000);
        assert_eq!(config.service_name, "gp");
        assert_eq!(config.command_timeout_secs, 60);
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_service_name() {
        let mut config = valid();
        config.service_name = "gp hub".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whitespace"));

        config.service_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_port_clash_and_missing_home() {
        let mut config = valid();
        config.agent_port = config.hub_port;
        assert!(config.validate().unwrap_err().to_string().contains("must differ"));

        let mut config = valid();
        config.gp_home = PathBuf::new();
        assert!(config.validate().unwrap_err().to_string().contains("gp_home"));
    }

    #[test]
    fn test_service_descriptor_prefers_configured_dir() {
        let mut config = valid();
        let descriptor = config.service_descriptor(PathBuf::from("/default"));
        assert_eq!(descriptor.service_dir, PathBuf::from("/default"));
        assert_eq!(descriptor.hosts, vec!["cdw", "sdw1"]);

        config.service_dir = Some(PathBuf::from("/custom"));
        let descriptor = config.service_descriptor(PathBuf::from("/default"));
        assert_eq!(descriptor.service_dir, PathBuf::from("/custom"));
    }
}
