//! gpctl - install and control the Greengage management services (hub and agents)

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use gpmgmt_core::application::{get_postgres_gp_version, CommandRunner, ServiceLifecycle};
use gpmgmt_core::domain::Config;
use gpmgmt_core::port::Credentials;
use gpmgmt_infra_system::{detect_platform, home_dir, ConfigLoader, SubprocessExecutor, TlsCredentials};

#[derive(Parser)]
#[command(name = "gpctl")]
#[command(about = "Greengage management service control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: $GPHOME/gp.conf)
    #[arg(long, env = "GPCTL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Service(ServiceCommand),

    /// Show gpctl and database versions
    Version,

    /// Load TLS material for both hub/agent roles
    CheckCredentials,
}

/// Commands that drive the hub and agent services
#[derive(Subcommand)]
enum ServiceCommand {
    /// Install hub and agent service files on every host
    Install {
        /// Keep this user's services running without a login session
        #[arg(long)]
        linger_user: Option<String>,
    },

    /// Start the hub and every agent
    Start,

    /// Stop every agent and the hub
    Stop,

    /// Show hub and agent service status
    Status {
        /// Omit the table header
        #[arg(long)]
        skip_header: bool,
    },

    /// Stop services and remove their service files
    Uninstall,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }

    match cli.command {
        Commands::Version => {
            let _log_guard = logging::init(cli.verbose, None)?;
            show_version(version_config(&loader)).await
        }
        Commands::CheckCredentials => {
            let (config, _log_guard) = startup(&loader, cli.verbose)?;
            check_credentials(&config)
        }
        Commands::Service(command) => {
            let (config, _log_guard) = startup(&loader, cli.verbose)?;
            run_service_command(command, &config).await
        }
    }
}

/// Load the configuration, then start logging into its log directory
fn startup(loader: &ConfigLoader, verbose: bool) -> Result<(Config, Option<WorkerGuard>)> {
    let config = loader.load().context("Failed to load configuration")?;
    let guard = logging::init(verbose, Some(config.log_dir.as_path()))?;

    info!(
        gp_home = %config.gp_home.display(),
        hosts = config.hostnames.len(),
        "gpctl v{} starting",
        gpmgmt_core::VERSION
    );
    Ok((config, guard))
}

async fn run_service_command(command: ServiceCommand, config: &Config) -> Result<()> {
    refuse_root()?;

    let runner = runner_for(config);
    let platform = detect_platform(runner, home_dir()?)?;
    let descriptor = config.service_descriptor(platform.default_service_dir());
    let lifecycle = ServiceLifecycle::new(platform, descriptor);

    match command {
        ServiceCommand::Install { linger_user } => {
            let linger_user = linger_user.or_else(|| config.service_user.clone());
            lifecycle.install(linger_user.as_deref()).await?;
            println!("{}", "✓ Services installed".green().bold());
            println!(
                "  {} {}",
                "Service dir:".bold(),
                lifecycle.descriptor().service_dir.display()
            );
        }

        ServiceCommand::Start => {
            lifecycle.start().await?;
            println!("{}", "✓ Hub and agents started".green().bold());
        }

        ServiceCommand::Stop => {
            lifecycle.stop().await?;
            println!("{}", "✓ Hub and agents stopped".green().bold());
        }

        ServiceCommand::Status { skip_header } => {
            let (hub, agents) = lifecycle.status().await?;
            let hub = hub.with_host(local_hostname());

            let platform = lifecycle.platform();
            let mut stdout = std::io::stdout().lock();
            platform.display_service_status(&mut stdout, "Hub", &[hub], skip_header)?;
            platform.display_service_status(&mut stdout, "Agent", &agents, true)?;
        }

        ServiceCommand::Uninstall => {
            lifecycle.uninstall().await?;
            println!("{}", "✓ Services uninstalled".green().bold());
        }
    }

    Ok(())
}

/// Configuration for `gpctl version`; without one only the gpctl version is shown
fn version_config(loader: &ConfigLoader) -> Option<Config> {
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "No usable configuration, skipping postgres version");
            None
        }
    }
}

fn runner_for(config: &Config) -> CommandRunner {
    CommandRunner::new(Arc::new(SubprocessExecutor::new()))
        .with_timeout(Duration::from_secs(config.command_timeout_secs))
}

async fn show_version(config: Option<Config>) -> Result<()> {
    println!("{} {}", "gpctl".bold(), gpmgmt_core::VERSION);

    let Some(config) = config else {
        return Ok(());
    };

    match get_postgres_gp_version(&runner_for(&config), &config.gp_home).await {
        Ok(version) => println!("{} {}", "postgres".bold(), version),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    Ok(())
}

fn check_credentials(config: &Config) -> Result<()> {
    let creds = TlsCredentials::new(config.credentials.clone());
    let mut failed = false;

    match creds.load_server_credentials() {
        Ok(_) => println!("  {} server credentials", "✓".green()),
        Err(e) => {
            failed = true;
            println!("  {} server credentials: {}", "✗".red(), e);
        }
    }
    match creds.load_client_credentials() {
        Ok(_) => println!("  {} client credentials", "✓".green()),
        Err(e) => {
            failed = true;
            println!("  {} client credentials: {}", "✗".red(), e);
        }
    }

    if failed {
        bail!("TLS credentials are not usable");
    }
    Ok(())
}

/// User services belong to the database administrator, never root
#[cfg(unix)]
fn refuse_root() -> Result<()> {
    use nix::unistd::{Uid, User};

    let uid = Uid::effective();
    if uid.is_root() {
        bail!("gpctl must be run as the database administrator, not root");
    }

    let user = User::from_uid(uid).ok().flatten().map(|u| u.name);
    info!(user = ?user, "Running as service user");
    Ok(())
}

#[cfg(not(unix))]
fn refuse_root() -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn local_hostname() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(not(unix))]
fn local_hostname() -> String {
    "localhost".to_string()
}
