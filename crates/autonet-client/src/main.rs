//! Auto-networking broadcaster: entry point.
//!
//! Announces this device on the LAN until a coordinator answers, then prints
//! the device's messaging URI (`<rendezvous-uri>#<device-id>`) on standard
//! output and exits.  Logs go to standard error.
//!
//! # Usage
//!
//! ```text
//! autonet-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>            TOML config file
//!   --port <PORT>              Coordinator discovery port [default: 37800]
//!   --interval-ms <MS>         Wait between announcements [default: 10000]
//!   --device-id <ID>           Device id [default: random UUID]
//!   --device-name <NAME>       Device name
//!   --device-type <N>          Device type [default: 0]
//!   --broadcast-addr <IP>      Announcement destination [default: 255.255.255.255]
//!   --max-attempts <N>         Give up after N announcements
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Flag            |
//! |-----------------------|-----------------|
//! | `AUTONET_CONFIG`      | `--config`      |
//! | `AUTONET_PORT`        | `--port`        |
//! | `AUTONET_DEVICE_ID`   | `--device-id`   |
//! | `AUTONET_DEVICE_NAME` | `--device-name` |

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use autonet_client::infrastructure::agent::UriPrinter;
use autonet_client::infrastructure::storage::config::load_config;
use autonet_client::{Broadcaster, BroadcasterConfig, UdpBroadcastTransport};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LAN auto-networking broadcaster.
#[derive(Debug, Parser)]
#[command(
    name = "autonet-client",
    about = "Announces this device until an auto-networking coordinator answers",
    version
)]
struct Cli {
    /// TOML configuration file.  A missing file means "all defaults".
    #[arg(long, env = "AUTONET_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port the coordinator listens on.
    #[arg(long, env = "AUTONET_PORT")]
    port: Option<u16>,

    /// Milliseconds to wait for a reply before announcing again.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Device id announced to the coordinator.  A random UUID when unset.
    #[arg(long, env = "AUTONET_DEVICE_ID")]
    device_id: Option<String>,

    #[arg(long, env = "AUTONET_DEVICE_NAME")]
    device_name: Option<String>,

    #[arg(long)]
    device_type: Option<u32>,

    /// Destination address of the announcements.
    #[arg(long)]
    broadcast_addr: Option<IpAddr>,

    /// Give up after this many unanswered announcements.
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl Cli {
    /// Loads the config file (if any), applies the flag overrides and fills
    /// in a device id when none was given.
    fn to_config(&self) -> anyhow::Result<BroadcasterConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => BroadcasterConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ms) = self.interval_ms {
            config.broadcast_interval_ms = ms;
        }
        if let Some(id) = &self.device_id {
            config.device_id = id.clone();
        }
        if let Some(name) = &self.device_name {
            config.device_name = name.clone();
        }
        if let Some(t) = self.device_type {
            config.device_type = t;
        }
        if let Some(addr) = self.broadcast_addr {
            config.broadcast_addr = addr;
        }
        if self.max_attempts.is_some() {
            config.max_attempts = self.max_attempts;
        }
        if config.device_id.trim().is_empty() {
            config.device_id = Uuid::new_v4().to_string();
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.to_config()?;
    let target = config.target_addr();

    info!(
        "auto-networking client starting, device {} ({}), target {target}",
        config.device_id,
        config.device_info()
    );

    let mut broadcaster = Broadcaster::new(config, UriPrinter::new(std::io::stdout()))
        .context("invalid configuration")?;
    let transport = UdpBroadcastTransport::bind(target)
        .await
        .context("setting up broadcast socket")?;

    let uri = tokio::select! {
        result = broadcaster.run_discovery(transport) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            return Ok(());
        }
    };

    info!("auto-networking complete: {uri}");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
