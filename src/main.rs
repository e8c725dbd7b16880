use clap::{Parser, Subcommand};
use pppos::config::{self, Config};
use pppos::link::{self, LinkOutcome, NetworkEvent, PppLink};
use pppos::telemetry::{init_logging, LinkStats};
use pppos::transport::UdpTransport;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "pppos")]
#[command(about = "PPP link bring-up over a raw frame transport")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Bring up the link and keep it running
    Run {
        /// Path to pppos.toml
        #[arg(short, long, default_value = "pppos.toml")]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate pppos.toml
    Validate {
        /// Path to pppos.toml
        #[arg(short, long, default_value = "pppos.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => {
            init_logging(None);
            cmd_config_validate(&config)
        }
        Commands::Run { config } => cmd_run(&config),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn load_checked(path: &Path) -> Result<Config, String> {
    let config = config::load(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let result = config::validate(&config);
    result.print_diagnostics();
    if result.has_errors() {
        return Err(format!("{} has {} error(s)", path.display(), result.errors.len()));
    }
    Ok(config)
}

fn cmd_config_validate(path: &Path) -> Result<(), String> {
    load_checked(path)?;
    println!("{} is valid", path.display());
    Ok(())
}

fn cmd_run(path: &Path) -> Result<(), String> {
    let config = load_checked(path)?;
    init_logging(Some(&config.logging));

    let bind: SocketAddr = config
        .transport
        .bind
        .parse()
        .map_err(|e| format!("transport.bind: {}", e))?;
    let peer: SocketAddr = config
        .transport
        .peer
        .parse()
        .map_err(|e| format!("transport.peer: {}", e))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        let transport = UdpTransport::bind(bind, peer)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", bind, e))?;

        let stats = Arc::new(LinkStats::new());
        let link = PppLink::with_stats(config.link_config(), stats.clone());

        // No local IP stack yet: the outbound side stays idle and inbound
        // datagrams are only logged.
        let (_ip_tx, ip_rx) = mpsc::channel(64);
        let (net_tx, mut net_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(event) = net_rx.recv().await {
                match event {
                    NetworkEvent::Up { local, peer } => {
                        info!("network up: local {} peer {}", local, peer)
                    }
                    NetworkEvent::Down => info!("network down"),
                    NetworkEvent::Datagram(datagram) => {
                        debug!("received {} byte datagram", datagram.len())
                    }
                }
            }
        });

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        };

        info!("pppos starting on {}", bind);
        let outcome = link::run(link, transport, ip_rx, net_tx, shutdown)
            .await
            .map_err(|e| e.to_string())?;

        for (name, value) in stats.export() {
            info!("{}: {}", name, value);
        }

        match outcome {
            LinkOutcome::Shutdown => Ok(()),
            LinkOutcome::Finished => Err("link finished: peer stopped negotiating".to_string()),
            LinkOutcome::AuthFailed(reason) => Err(format!("authentication failed: {}", reason)),
        }
    })
}
