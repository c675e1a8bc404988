// Greengage management utilities shipped under $GPHOME/bin

use std::path::{Path, PathBuf};

use crate::domain::command::ResolvedCommand;

crate::command_options! {
    /// `gpstart -a`: start the whole cluster without prompting
    pub struct GpStart => "gpstart" ["-a"] {
        pub data_directory: String => "-d",
        pub verbose: bool => "-v",
    }
}

crate::command_options! {
    /// `gpssh -h <host> <command>`: run a shell command on one host
    pub struct GpSsh => "gpssh" {
        pub host: String => "-h",
        pub command: String => positional,
    }
}

crate::command_options! {
    /// `gpsync -h <host> <source> =:<destination>`: copy one file to a host
    pub struct GpSync => "gpsync" {
        pub host: String => "-h",
        pub source: PathBuf => positional,
        pub destination: String => positional,
    }
}

impl GpSsh {
    /// Run an already resolved command on `host`
    ///
    /// gpssh takes the remote command as one shell string.
    pub fn remote(host: &str, command: &ResolvedCommand) -> Self {
        Self {
            host: host.to_string(),
            command: command.to_shell_string(),
        }
    }
}

impl GpSync {
    pub fn to_host(host: &str, source: impl Into<PathBuf>, destination: &Path) -> Self {
        Self {
            host: host.to_string(),
            source: source.into(),
            destination: format!("=:{}", destination.display()),
        }
    }
}
