// Application Layer - Use Cases built on the ports

pub mod command_runner;
pub mod fanout;
pub mod greengage;
pub mod service_lifecycle;

// Re-exports
pub use command_runner::{resolve, CommandRunner};
pub use fanout::fan_out;
pub use greengage::{default_hub_log_dir, get_postgres_gp_version, start_cluster};
pub use service_lifecycle::ServiceLifecycle;
