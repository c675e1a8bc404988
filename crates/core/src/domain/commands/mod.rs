// Options declarations for every external program the tools invoke

pub mod greengage;
pub mod postgres;
pub mod system;

pub use greengage::{GpSsh, GpStart, GpSync};
pub use postgres::{Initdb, PgCtlStart, PgCtlStop, Postgres};
pub use system::{Launchctl, Loginctl, Mkdir, Rm, Systemctl};
