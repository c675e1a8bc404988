// Greengage Management Infrastructure - System Adapters
// Implements: CommandExecutor, Platform (systemd, launchd), Credentials (rustls)

pub mod config_loader;
pub mod platform;
pub mod subprocess_executor;
pub mod tls_credentials;

pub use config_loader::{default_hub_log_dir, home_dir, ConfigLoader};
pub use platform::{detect_platform, for_os, LaunchdPlatform, SystemdPlatform};
pub use subprocess_executor::SubprocessExecutor;
pub use tls_credentials::TlsCredentials;
