use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use meshcall_core::IceServerConfig;
use meshcall_core::utils::DEFAULT_SIGNALING_PATH;
use meshcall_server::{HubConfig, SignalingHub};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "meshcall=info,meshcall_server=info";

#[derive(Parser)]
#[command(name = "meshcall", version, about = "Signaling hub for mesh video calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling hub.
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "MESHCALL_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(short, long, env = "MESHCALL_PORT", default_value_t = 7673)]
    port: u16,

    /// Path upgraded to the signaling WebSocket.
    #[arg(long, env = "MESHCALL_SIGNALING_PATH", default_value = DEFAULT_SIGNALING_PATH)]
    path: String,

    #[arg(
        long,
        env = "MESHCALL_HEARTBEAT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    heartbeat_secs: u64,

    /// How long a dropped participant is remembered.
    #[arg(long, env = "MESHCALL_GRACE_SECS", default_value_t = 30)]
    grace_secs: u64,

    #[arg(
        long,
        env = "MESHCALL_JOIN_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    join_timeout_secs: u64,

    #[arg(long, env = "MESHCALL_CHAT_HISTORY", default_value_t = 100)]
    chat_history: usize,

    /// STUN/TURN URL pushed to clients. Repeat or comma-separate for several;
    /// public STUN servers are used when none is given.
    #[arg(long = "ice-server", env = "MESHCALL_ICE_SERVERS", value_delimiter = ',')]
    ice_servers: Vec<String>,

    #[arg(long, env = "MESHCALL_TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "MESHCALL_TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> HubConfig {
        let defaults = HubConfig::default();
        let ice_servers = if self.ice_servers.is_empty() {
            defaults.ice_servers
        } else {
            self.ice_servers
                .into_iter()
                .map(|url| {
                    // Credentials only mean something to TURN.
                    let turn = url.starts_with("turn:") || url.starts_with("turns:");
                    IceServerConfig {
                        urls: vec![url],
                        username: self.turn_username.clone().filter(|_| turn),
                        credential: self.turn_credential.clone().filter(|_| turn),
                    }
                })
                .collect()
        };

        HubConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            signaling_path: self.path,
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
            grace_period: Duration::from_secs(self.grace_secs),
            join_timeout: Duration::from_secs(self.join_timeout_secs),
            chat_history_limit: self.chat_history,
            ice_servers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Commands::Serve(args) => serve(args.into_config()).await,
    }
}

async fn serve(config: HubConfig) -> Result<()> {
    println!("{}", "📡 Starting meshcall signaling hub...".green().bold());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    println!("   🔌 WebSocket: ws://{}{}", addr, config.signaling_path);
    println!("   ❤️  Health:    http://{}/health", addr);
    for server in &config.ice_servers {
        println!("   🧊 ICE:       {}", server.urls.join(", "));
    }

    let hub = SignalingHub::new(config);
    hub.serve_with_shutdown(listener, shutdown_signal())
        .await
        .context("Signaling hub stopped with an error")?;

    println!("{}", "👋 Hub stopped".yellow());
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested, draining connections");
    }
}
