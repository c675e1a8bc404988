// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unknown process role: {0}")]
    UnknownRole(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
