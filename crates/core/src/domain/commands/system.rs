// Operating-system tools resolved through PATH

use std::path::PathBuf;

crate::command_options! {
    /// `systemctl [--user] <action> [unit]`
    pub struct Systemctl => "systemctl" in system {
        pub user: bool => "--user",
        pub property: String => "--property",
        pub action: String => positional,
        pub unit: String => positional,
    }
}

crate::command_options! {
    /// `launchctl <action> [target]`
    pub struct Launchctl => "launchctl" in system {
        pub action: String => positional,
        pub target: String => positional,
    }
}

crate::command_options! {
    /// `loginctl <action> [user]`
    pub struct Loginctl => "loginctl" in system {
        pub action: String => positional,
        pub user: String => positional,
    }
}

crate::command_options! {
    /// `mkdir [-p] <path>`
    pub struct Mkdir => "mkdir" in system {
        pub parents: bool => "-p",
        pub path: PathBuf => positional,
    }
}

crate::command_options! {
    /// `rm [-f] <path>`
    pub struct Rm => "rm" in system {
        pub force: bool => "-f",
        pub path: PathBuf => positional,
    }
}

impl Systemctl {
    /// `systemctl --user <action> [unit]`
    pub fn user(action: &str, unit: &str) -> Self {
        Self {
            user: true,
            action: action.to_string(),
            unit: unit.to_string(),
            ..Default::default()
        }
    }
}

impl Launchctl {
    pub fn new(action: &str, target: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            target: target.into(),
        }
    }
}
