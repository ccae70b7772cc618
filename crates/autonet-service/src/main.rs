//! Auto-networking coordinator: entry point.
//!
//! Listens for device announcements on the LAN and offers every new device
//! the rendezvous URI of the messaging service.  The messaging service (or an
//! operator) reports devices that arrived there through the control console
//! on standard input.
//!
//! # Usage
//!
//! ```text
//! autonet-service [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file
//!   --port <PORT>                UDP discovery port [default: 37800]
//!   --bind-address <IP>          Local address to bind [default: 0.0.0.0]
//!   --rendezvous-uri <URI>       Messaging service URI offered to devices
//!   --max-sessions <N>           Concurrent handshake sessions [default: 4]
//!   --handshake-timeout-ms <MS>  Eviction timeout [default: 20000]
//!   --handshake-interval-ms <MS> Pause between offers [default: 1000]
//!   --no-console                 Do not read commands from stdin
//! ```
//!
//! # Configuration precedence
//!
//! Command-line flags beat environment variables, which beat the config
//! file, which beats the built-in defaults.
//!
//! | Variable                 | Flag                |
//! |--------------------------|---------------------|
//! | `AUTONET_CONFIG`         | `--config`          |
//! | `AUTONET_PORT`           | `--port`            |
//! | `AUTONET_BIND_ADDRESS`   | `--bind-address`    |
//! | `AUTONET_RENDEZVOUS_URI` | `--rendezvous-uri`  |

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use autonet_service::infrastructure::control::run_console;
use autonet_service::infrastructure::storage::config::load_config;
use autonet_service::{Coordinator, CoordinatorConfig, SessionPool};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LAN auto-networking coordinator.
#[derive(Debug, Parser)]
#[command(
    name = "autonet-service",
    about = "Admits LAN devices and hands them the messaging service URI",
    version
)]
struct Cli {
    /// TOML configuration file.  A missing file means "all defaults".
    #[arg(long, env = "AUTONET_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port announcements arrive on.
    #[arg(long, env = "AUTONET_PORT")]
    port: Option<u16>,

    /// Local address the discovery socket binds to.
    #[arg(long, env = "AUTONET_BIND_ADDRESS")]
    bind_address: Option<IpAddr>,

    /// URI of the messaging service offered to every device.
    #[arg(long, env = "AUTONET_RENDEZVOUS_URI")]
    rendezvous_uri: Option<String>,

    /// Upper bound on concurrently running handshake sessions.
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Time a device may spend connecting before it is evicted.
    #[arg(long)]
    handshake_timeout_ms: Option<u64>,

    /// Pause between two offers to the same device.
    #[arg(long)]
    handshake_interval_ms: Option<u64>,

    /// Do not read control commands from standard input.
    #[arg(long)]
    no_console: bool,

    /// Seconds between device-list log lines; 0 disables them.
    #[arg(long, default_value_t = 60)]
    report_interval: u64,
}

impl Cli {
    /// Loads the config file (if any) and applies the flag overrides.
    fn to_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CoordinatorConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = self.bind_address {
            config.bind_address = addr;
        }
        if let Some(uri) = &self.rendezvous_uri {
            config.rendezvous_uri = uri.clone();
        }
        if let Some(n) = self.max_sessions {
            config.max_sessions = n;
        }
        if let Some(ms) = self.handshake_timeout_ms {
            config.handshake_timeout_ms = ms;
        }
        if let Some(ms) = self.handshake_interval_ms {
            config.handshake_interval_ms = ms;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.to_config()?;

    info!(
        "auto-networking coordinator starting, port={}, uri={}",
        config.port, config.rendezvous_uri
    );

    let pool = SessionPool::new(Handle::current(), config.max_sessions);
    let coordinator = Arc::new(Coordinator::new(config, pool).context("invalid configuration")?);

    let receive_loop = coordinator
        .start(false)
        .await?
        .context("detached start returned no loop handle")?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let coord = Arc::clone(&coordinator);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                coord.shutdown();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Control console ───────────────────────────────────────────────────────
    if !cli.no_console {
        let coord = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = run_console(coord, stdin, tokio::io::stdout()).await {
                error!("control console failed: {e}");
            }
        });
    }

    // ── Periodic device report ────────────────────────────────────────────────
    if cli.report_interval > 0 {
        let coord = Arc::clone(&coordinator);
        let period = Duration::from_secs(cli.report_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let devices = coord.get_devices();
                info!(
                    "{} connected, {} connecting",
                    devices.len(),
                    coord.connecting_count()
                );
                for (id, info) in devices {
                    info!("  {id}: {info}");
                }
            }
        });
    }

    info!("auto-networking coordinator ready. Press Ctrl-C to exit.");

    receive_loop.await.context("receive loop panicked")??;

    info!("auto-networking coordinator stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
