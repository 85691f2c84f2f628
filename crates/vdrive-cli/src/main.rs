//! vdrive CLI - mount a remote drive as a local filesystem
//!
//! Loads configuration, builds the API client and the tokio runtime,
//! mounts the FUSE filesystem, and keeps it mounted until interrupted.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vdrive_api::DriveClient;
use vdrive_core::{config::Config, ports::RemoteStore};
use vdrive_fuse::{mount, unmount};

#[derive(Debug, Parser)]
#[command(name = "vdrive", version, about = "Mount a remote drive as a local filesystem")]
struct Cli {
    /// Mount point (overrides the configured one)
    mount_point: Option<String>,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drive API base URL (overrides the configured one)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token (overrides the configured one)
    #[arg(long)]
    token: Option<String>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);

    init_tracing(&cli, &config);
    info!(config_path = %config_path.display(), "Loaded configuration");

    if let Some(mount_point) = &cli.mount_point {
        config.fuse.mount_point = mount_point.clone();
    }
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }
    if let Some(token) = &cli.token {
        config.api.token = token.clone();
    }

    if config.api.base_url.is_empty() {
        bail!("No drive API base URL configured (set api.base_url or pass --api-url)");
    }
    if config.api.token.is_empty() {
        bail!("No access token configured (set api.token or pass --token)");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;

    let store: Arc<dyn RemoteStore> =
        Arc::new(DriveClient::new(
            config.api.base_url.as_str(),
            config.api.token.as_str(),
        ));

    let session = mount(
        &config.fuse,
        config.upload.clone(),
        store,
        runtime.handle().clone(),
    )
    .with_context(|| format!("Failed to mount at {}", config.fuse.mount_point))?;

    info!(mount_point = %config.fuse.mount_point, "Mounted, press Ctrl-C to unmount");

    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("Failed to wait for shutdown signal")?;

    unmount(session);
    Ok(())
}
