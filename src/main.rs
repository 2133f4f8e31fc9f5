//! Roomcast: presence and room messaging server
//!
//! A single-process server that tracks who is connected, which rooms they
//! are in, and routes public, room and private messages between them over
//! WebSocket.
//!
//! Usage:
//!   roomcast                                     # Default port 7070
//!   roomcast --port 8080                         # Custom port
//!   roomcast --history-limit 200                 # Keep the last 200 messages per room
//!   roomcast --archive ./roomcast.db             # Also archive room messages to SQLite

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use roomcast_archive::{ArchiveConfig, ArchiveWriter};
use roomcast_core::ChatConfig;
use roomcast_server::EventRouter;
use roomcast_transport::{PeerTable, TransportConfig, TransportServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roomcast", about = "Roomcast: presence and room messaging server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "7070")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "256")]
    max_connections: usize,

    /// Messages kept per room (unbounded if omitted)
    #[arg(long)]
    history_limit: Option<usize>,

    /// Longest accepted message text in characters (0 disables the check)
    #[arg(long, default_value = "2000")]
    max_text_length: usize,

    /// Seconds between heartbeat pings (0 disables the heartbeat)
    #[arg(long, default_value = "30")]
    heartbeat_secs: u64,

    /// Archive room messages to this SQLite file
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Capacity of the archive queue; records beyond it are dropped
    #[arg(long, default_value = "1024")]
    archive_queue: usize,

    /// Enable permissive CORS
    #[arg(long)]
    cors: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(log_path) = &cli.log_file {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false);
        if cli.json_logs {
            builder.json().init();
        } else {
            builder.init();
        }

        eprintln!("Logging to {}", log_path.display());
    } else if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let chat_config = ChatConfig {
        history_limit: cli.history_limit.filter(|n| *n > 0),
        max_text_length: cli.max_text_length,
    };
    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        enable_cors: cli.cors,
        max_connections: Some(cli.max_connections),
        heartbeat_interval: (cli.heartbeat_secs > 0)
            .then(|| Duration::from_secs(cli.heartbeat_secs)),
    };

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Roomcast Server                         ║");
    println!("║                presence and room messaging                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Port:       {}", cli.port);
    println!("  Binding:    {}", cli.hostname);
    println!("  Max conns:  {}", cli.max_connections);
    match chat_config.history_limit {
        Some(n) => println!("  History:    last {n} messages per room"),
        None => println!("  History:    unbounded"),
    }
    match transport_config.heartbeat_interval {
        Some(every) => println!("  Heartbeat:  every {}s", every.as_secs()),
        None => println!("  Heartbeat:  disabled"),
    }

    let peers = PeerTable::new();
    let mut router = EventRouter::new(chat_config, peers.clone());

    if let Some(path) = &cli.archive {
        let archive_config = ArchiveConfig {
            path: path.clone(),
            queue_capacity: cli.archive_queue,
        };
        let writer = ArchiveWriter::open(&archive_config)
            .with_context(|| format!("Failed to open archive {}", path.display()))?;
        let archived = writer
            .count()
            .await
            .with_context(|| format!("Failed to read archive {}", path.display()))?;
        router = router.with_archive(writer);
        println!("  Archive:    {} ({archived} messages)", path.display());
    } else {
        println!("  Archive:    disabled");
    }
    println!();

    let router = Arc::new(router);
    let mut transport = TransportServer::start(transport_config, router.clone(), peers)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start transport: {e}"))?;

    let ws_url = format!("ws://{}:{}/ws", cli.hostname, transport.port());
    info!("Roomcast ready at {}", ws_url);

    println!("────────────────────────────────────────────────────────────────");
    println!();
    println!("  Server running!");
    println!();
    println!("  WebSocket endpoint:");
    println!("    {ws_url}");
    println!();
    println!("  Health check:");
    println!("    http://{}:{}/health", cli.hostname, transport.port());
    println!();
    println!("────────────────────────────────────────────────────────────────");
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!();
    println!("  Shutting down...");
    transport.stop().await;
    router.shutdown_archive().await;

    println!("  Server stopped.");
    Ok(())
}
