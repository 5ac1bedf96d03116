//! Barrage CLI - watch live danmaku streams from the command line
//!
//! Connect to a room and print comments as they arrive, or decode captured
//! binary frames offline.

use anyhow::{Context, Result};
use barrage_core::{decode_all, parse_command, Event, Operation, ProtocolVersion};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod watch;

use config::{parse_host, WatchConfig};
use watch::WatchOutput;

/// Barrage - live danmaku stream client
#[derive(Parser)]
#[command(name = "barrage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a room and print its comments
    Watch {
        /// Room id (overrides the config file)
        #[arg(short, long, env = "BARRAGE_ROOM")]
        room: Option<u64>,

        /// Auth token (overrides the config file)
        #[arg(short, long, env = "BARRAGE_TOKEN")]
        token: Option<String>,

        /// Danmaku host as host[:port], repeatable (replaces config hosts)
        #[arg(short = 'H', long = "host")]
        hosts: Vec<String>,

        /// User id sent in AUTH
        #[arg(short, long)]
        uid: Option<u64>,

        /// Hide comments scored below this level (0 = default level)
        #[arg(long)]
        min_score: Option<u8>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Also print popularity updates
        #[arg(long)]
        popularity: bool,
    },

    /// Decode a file of captured binary frames
    Decode {
        /// File holding one or more raw frames
        file: PathBuf,
    },

    /// Show version and protocol info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(()).await;
        }
    });

    match cli.command {
        Commands::Watch {
            room,
            token,
            hosts,
            uid,
            min_score,
            json,
            popularity,
        } => {
            let mut config = match cli.config.or_else(WatchConfig::default_path) {
                Some(path) => WatchConfig::load(&path)?,
                None => WatchConfig::default(),
            };
            if let Some(room) = room {
                config.room_id = room;
            }
            if let Some(token) = token {
                config.token = token;
            }
            if !hosts.is_empty() {
                config.hosts = hosts
                    .iter()
                    .map(|h| parse_host(h))
                    .collect::<Result<Vec<_>>>()?;
            }
            if let Some(uid) = uid {
                config.client.user_id = uid;
            }
            if min_score.is_some() {
                config.client.min_recommend_score = min_score;
            }

            watch::run_watch(config, WatchOutput { json, popularity }, &mut shutdown_rx).await?;
        }

        Commands::Decode { file } => {
            decode_file(&file)?;
        }

        Commands::Info => {
            print_info();
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn decode_file(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let frames = decode_all(&bytes);

    println!(
        "{} {} bytes, {} frame(s)",
        "DECODE".cyan().bold(),
        bytes.len(),
        frames.len()
    );

    for frame in &frames {
        let op = frame
            .op()
            .map(|op| format!("{:?}", op))
            .unwrap_or_else(|| format!("op#{}", frame.operation));
        let ver = frame
            .version()
            .map(|v| format!("{:?}", v))
            .unwrap_or_else(|| format!("v{}", frame.protocol_version));
        println!(
            "  {} {} seq={} body={}B",
            op.green(),
            ver,
            frame.sequence,
            frame.body.len()
        );

        match frame.op() {
            Some(Operation::Command) => {
                match parse_command(&String::from_utf8_lossy(&frame.body)) {
                    Some(event) => println!("    {}", serde_json::to_string(&event)?),
                    None => println!("    {}", String::from_utf8_lossy(&frame.body).dimmed()),
                }
            }
            Some(Operation::HeartbeatReply) if frame.body.len() >= 4 => {
                let value = u32::from_be_bytes([
                    frame.body[0],
                    frame.body[1],
                    frame.body[2],
                    frame.body[3],
                ]);
                let event = Event::PopularityUpdate { value };
                println!("    {}", serde_json::to_string(&event)?);
            }
            Some(Operation::Auth) | Some(Operation::AuthReply) => {
                println!("    {}", String::from_utf8_lossy(&frame.body));
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_info() {
    println!(
        "{}",
        "Barrage - live danmaku stream client".cyan().bold()
    );
    println!();
    println!("Version:    {}", env!("CARGO_PKG_VERSION"));
    println!("Platform:   {}", std::env::consts::OS);
    println!("Arch:       {}", std::env::consts::ARCH);
    println!();
    println!("{}", "Protocol:".green());
    println!(
        "  Header:     {} bytes, big-endian",
        barrage_core::HEADER_SIZE
    );
    println!(
        "  Versions:   {} plain, {} heartbeat, {} zlib (brotli frames are skipped)",
        ProtocolVersion::Plain.code(),
        ProtocolVersion::Heartbeat.code(),
        ProtocolVersion::Zlib.code()
    );
    println!(
        "  Operations: heartbeat={} reply={} command={} auth={} auth-reply={}",
        Operation::Heartbeat.code(),
        Operation::HeartbeatReply.code(),
        Operation::Command.code(),
        Operation::Auth.code(),
        Operation::AuthReply.code()
    );
    if let Some(path) = WatchConfig::default_path() {
        println!("  Config:     {}", path.display());
    }
    println!();
    println!("{}", "Examples:".green());
    println!("  barrage watch --room 21000000 --token TOKEN -H broadcast.example.com:443");
    println!("  barrage watch -c room.toml --json      # Stream events as JSON lines");
    println!("  barrage decode capture.bin             # Inspect captured frames");
}
