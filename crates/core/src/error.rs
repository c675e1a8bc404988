// Central Error Type for the Management Tools

use thiserror::Error;

use crate::domain::{CommandError, DomainError, HostFailures};
use crate::port::{CredentialsError, PlatformError};

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Host errors: {0}")]
    Hosts(#[from] HostFailures),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Prefix an error with what the caller was doing
    pub fn context(self, context: impl Into<String>) -> Self {
        AppError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost command error, if any
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            AppError::Command(e) => Some(e),
            AppError::Platform(PlatformError::Command(e)) => Some(e),
            AppError::Context { source, .. } => source.command_error(),
            _ => None,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
