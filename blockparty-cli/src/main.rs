use anyhow::{Context, Result};
use blockparty_client::{ClientConfig, Session, SessionHandlers};
use blockparty_core::sync::Identity;
use blockparty_core::utils::{DEFAULT_RELAY_PORT, SWEEP_INTERVAL_SECS};
use blockparty_core::{PlayerId, RoomId};
use blockparty_server::{RelayConfig, RelayServer};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockparty", version, about = "Room relay and console client for block party games")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, env = "PORT", default_value_t = DEFAULT_RELAY_PORT)]
        port: u16,

        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,

        /// Seconds between sweeps for empty rooms.
        #[arg(long, default_value_t = SWEEP_INTERVAL_SECS)]
        sweep_secs: u64,
    },

    /// Join a room and print what the other players are doing.
    Watch {
        /// Relay WebSocket URL, e.g. ws://localhost:3001/ws
        #[arg(long)]
        relay: String,

        #[arg(long)]
        room: String,

        #[arg(long, default_value = "watcher")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Relay {
            port,
            host,
            sweep_secs,
        } => run_relay(SocketAddr::new(host, port), sweep_secs).await,
        Commands::Watch { relay, room, name } => run_watch(relay, room, name).await,
    }
}

async fn run_relay(bind: SocketAddr, sweep_secs: u64) -> Result<()> {
    let config = RelayConfig::default()
        .with_bind(bind)
        .with_sweep_interval(Duration::from_secs(sweep_secs));
    let server = RelayServer::new(config);
    let listener = server.bind().await?;

    println!(
        "{} {}",
        "Relay listening on".green().bold(),
        format!("ws://{}/ws", listener.local_addr()?).cyan()
    );

    server
        .serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down relay");
        })
        .await?;
    Ok(())
}

async fn run_watch(relay: String, room: String, name: String) -> Result<()> {
    let room_id = RoomId::from_user_input(&room).context("Room id must not be empty")?;
    let identity = Identity::new(room_id, PlayerId::random(), name);

    println!(
        "{} {} {}",
        "Joining".cyan(),
        identity.room_id.to_string().bold(),
        format!("as {}", identity.player_name).dimmed()
    );

    // Only print a peer when its score or game-over flag changes.
    let last_seen: Mutex<HashMap<PlayerId, (u64, bool)>> = Mutex::new(HashMap::new());
    let handlers = SessionHandlers::default()
        .on_roster(|diff, players| {
            for player in &diff.joined {
                println!("{} {}", "+".green().bold(), player.player_name);
            }
            for player_id in &diff.left {
                println!("{} {}", "-".red().bold(), player_id);
            }
            if !diff.is_empty() {
                let names: Vec<&str> = players.iter().map(|p| p.player_name.as_str()).collect();
                println!("  {} {}", "in room:".dimmed(), names.join(", "));
            }
        })
        .on_peer_state(move |view| {
            let mut seen = last_seen.lock().unwrap_or_else(|e| e.into_inner());
            let current = (view.score, view.game_over);
            if seen.get(&view.player_id) == Some(&current) {
                return;
            }
            seen.insert(view.player_id.clone(), current);

            let status = if view.game_over {
                "game over".red()
            } else if view.is_playing() {
                "playing".green()
            } else {
                "waiting".yellow()
            };
            println!(
                "  {:<16} {:>8}  {}",
                view.player_name.bold(),
                view.score,
                status
            );
        });

    let session = Session::connect(ClientConfig::new(relay, identity), handlers).await?;
    println!(
        "{} {}",
        "Connected.".green().bold(),
        "Press Ctrl-C to leave.".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    session.disconnect().await;
    println!("{}", "Left the room.".cyan());
    Ok(())
}
