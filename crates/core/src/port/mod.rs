// Port Layer - Interfaces for external dependencies

pub mod command_executor; // Execution seam
pub mod credentials;
pub mod platform;

// Re-exports
pub use command_executor::CommandExecutor;
pub use credentials::{Credentials, CredentialsError};
pub use platform::{Platform, PlatformError};
