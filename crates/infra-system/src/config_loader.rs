// Configuration loading: gp.conf (JSON) layered under GPCTL_* environment variables
// reason: config crate for layering, shellexpand for ~ paths, directories for the home dir

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};
use directories::BaseDirs;
use tracing::debug;

use gpmgmt_core::application::greengage;
use gpmgmt_core::domain::Config;
use gpmgmt_core::error::{AppError, Result};

/// File name of the configuration document inside `$GPHOME`
pub const CONFIG_FILE_NAME: &str = "gp.conf";
pub const ENV_PREFIX: &str = "GPCTL";

/// Builds a validated `Config`
///
/// Precedence, lowest first: built-in defaults, the JSON file, environment
/// variables. `GPHOME` fills `gp_home` when nothing else set it.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
    gp_home: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
            gp_home: std::env::var_os("GPHOME").map(PathBuf::from),
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit file (it must exist)
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Override the `GPHOME` value read at construction
    pub fn with_gp_home(mut self, gp_home: Option<PathBuf>) -> Self {
        self.gp_home = gp_home;
        self
    }

    /// File that will be read, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(file) = &self.file {
            return Some(file.clone());
        }
        self.gp_home
            .as_ref()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    /// Load, expand `~` and validate
    ///
    /// # Errors
    /// - AppError::Config if the file is unreadable or a value has the wrong type
    /// - AppError::Domain if the resulting configuration is invalid
    pub fn load(&self) -> Result<Config> {
        let mut builder = config::Config::builder();

        if let Some(path) = self.config_path() {
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hostnames"),
        );

        let mut cfg: Config = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| AppError::Config(e.to_string()))?;

        if cfg.gp_home.as_os_str().is_empty() {
            if let Some(home) = &self.gp_home {
                cfg.gp_home = home.clone();
            }
        }

        expand_paths(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn expand_paths(cfg: &mut Config) {
    cfg.gp_home = expand(&cfg.gp_home);
    cfg.log_dir = expand(&cfg.log_dir);
    cfg.service_dir = cfg.service_dir.as_deref().map(expand);

    let creds = &mut cfg.credentials;
    for path in [
        &mut creds.ca_certificate,
        &mut creds.server_certificate,
        &mut creds.server_key,
        &mut creds.client_certificate,
        &mut creds.client_key,
    ] {
        let expanded = expand(path.as_path());
        *path = expanded;
    }
}

/// Home directory of the current user
pub fn home_dir() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| AppError::Config("cannot determine home directory".to_string()))
}

/// `~/gpAdminLogs`
pub fn default_hub_log_dir() -> Result<PathBuf> {
    Ok(greengage::default_hub_log_dir(&home_dir()?))
}
