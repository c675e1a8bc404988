// Domain Layer - Pure types, option declarations and validation

pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod fanout;
pub mod options;
pub mod service;

// Re-exports
pub use command::{CommandError, CommandOutput, ResolvedCommand};
pub use config::{Config, CredentialPaths};
pub use error::DomainError;
pub use fanout::{FanoutReport, HostFailure, HostFailures, HostOutcome};
pub use options::{CommandOptions, FlagArg, PositionalArg, ProgramLocation, BIN_DIR};
pub use service::{PlatformOs, ProcessRole, ServiceDescriptor, ServiceState, ServiceStatus};
