// Service Domain Model: roles, descriptors and parsed status

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Which management process a service unit governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessRole {
    Hub,
    Agent,
}

impl ProcessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Hub => "hub",
            ProcessRole::Agent => "agent",
        }
    }

    /// Service-manager label, e.g. `gp_hub`
    pub fn unit_name(&self, service_name: &str) -> String {
        format!("{}_{}", service_name, self.as_str())
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hub" => Ok(ProcessRole::Hub),
            "agent" => Ok(ProcessRole::Agent),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// Supported host platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformOs {
    Linux,
    Darwin,
}

impl PlatformOs {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformOs::Linux => "linux",
            PlatformOs::Darwin => "darwin",
        }
    }
}

impl fmt::Display for PlatformOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformOs {
    type Err = DomainError;

    /// Accepts both `std::env::consts::OS` values and service-manager names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(PlatformOs::Linux),
            "darwin" | "macos" => Ok(PlatformOs::Darwin),
            other => Err(DomainError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Service state as reported by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Stopped,
    Failed,
    Unknown,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopped => write!(f, "not running"),
            ServiceState::Failed => write!(f, "failed"),
            ServiceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parsed status of one service on one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub host: String,
    pub state: ServiceState,
    /// 0 unless running
    pub pid: u32,
    /// Start timestamp reported by the service manager; empty unless running
    pub uptime: String,
}

impl ServiceStatus {
    pub fn unknown(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: ServiceState::Unknown,
            pid: 0,
            uptime: String::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }
}

/// Everything a platform needs to manage one service across the cluster
///
/// Host order is preserved for per-host bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_name: String,
    pub hosts: Vec<String>,
    pub gp_home: PathBuf,
    pub service_dir: PathBuf,
}

impl ServiceDescriptor {
    pub fn unit_name(&self, role: ProcessRole) -> String {
        role.unit_name(&self.service_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name() {
        assert_eq!(ProcessRole::Hub.unit_name("gp"), "gp_hub");
        assert_eq!(ProcessRole::Agent.unit_name("gp"), "gp_agent");
    }

    #[test]
    fn test_platform_from_os_constant() {
        assert_eq!("linux".parse::<PlatformOs>().unwrap(), PlatformOs::Linux);
        assert_eq!("macos".parse::<PlatformOs>().unwrap(), PlatformOs::Darwin);
        assert!(matches!(
            "windows".parse::<PlatformOs>(),
            Err(DomainError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("agent".parse::<ProcessRole>().unwrap(), ProcessRole::Agent);
        assert!("coordinator".parse::<ProcessRole>().is_err());
    }

    #[test]
    fn test_unknown_status_is_zeroed() {
        let status = ServiceStatus::unknown("sdw1");
        assert_eq!(status.host, "sdw1");
        assert_eq!(status.pid, 0);
        assert!(status.uptime.is_empty());
        assert!(!status.is_running());
    }
}
