// Postgres server binaries shipped under $GPHOME/bin

use std::path::PathBuf;

crate::command_options! {
    /// `initdb`: create a new data directory
    pub struct Initdb => "initdb" {
        pub pg_data: String => "--pgdata",
        pub encoding: String => "--encoding",
        pub locale: String => "--locale",
        pub data_checksums: bool => "--data-checksums",
        /// WAL segment size in MB; `Some` is always passed through
        pub wal_segsize: Option<u32> => "--wal-segsize",
    }
}

crate::command_options! {
    /// `pg_ctl start`
    pub struct PgCtlStart => "pg_ctl" ["start"] {
        pub pg_data: String => "--pgdata",
        pub timeout: u32 => "--timeout",
        pub wait: bool => "--wait",
        pub no_wait: bool => "--no-wait",
        pub logfile: String => "--log",
    }
}

crate::command_options! {
    /// `pg_ctl stop`
    pub struct PgCtlStop => "pg_ctl" ["stop"] {
        pub pg_data: String => "--pgdata",
        pub timeout: u32 => "--timeout",
        pub wait: bool => "--wait",
        pub no_wait: bool => "--no-wait",
        /// smart, fast or immediate
        pub mode: String => "--mode",
    }
}

crate::command_options! {
    /// `postgres` single binary queries (`--gp-version`)
    pub struct Postgres => "postgres" {
        pub gp_version: bool => "--gp-version",
        pub data_dir: PathBuf => "-D",
    }
}
