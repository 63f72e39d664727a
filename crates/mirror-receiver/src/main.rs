//! InputMirror receiver entry point.
//!
//! Shows a connection token, waits for a sender, asks the operator to approve
//! it and then replays the sender's keyboard and mouse input on this machine.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ generate_token() + derive_key()   -- one key for the receiver's lifetime
//!  └─ spawn_session()                   -- "mirror-session" thread
//!  └─ run_listener()                    -- WebSocket accept loop (Tokio task)
//!  └─ console loop
//!       ├─ approval request  -> prompt "allow? [y/N]" and answer it
//!       ├─ p / r             -> pause / resume
//!       └─ q / Ctrl-C        -> shutdown (sends disconnect to the sender)
//! ```
//!
//! # Usage
//!
//! ```text
//! mirror-receiver [--port <PORT>] [--bind <ADDR>] [--config <PATH>]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mirror_core::{derive_key, generate_token, load_config};
use mirror_receiver::application::receiver_session::{spawn_session, ReceiverSession};
use mirror_receiver::application::replay_input::InputReplayer;
use mirror_receiver::infrastructure::approval::{ApprovalRequest, ChannelApprover};
use mirror_receiver::infrastructure::input_emulation::platform_emulator;
use mirror_receiver::infrastructure::network::ws_server::run_listener;
use mirror_receiver::infrastructure::screen_info::virtual_screen;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// InputMirror receiver.
///
/// Accepts one approved sender at a time and replays its input locally.
#[derive(Debug, Parser)]
#[command(
    name = "mirror-receiver",
    about = "Replay keyboard and mouse input mirrored from an InputMirror sender",
    version
)]
struct Cli {
    /// TCP port to listen on.  Overrides the config file.
    #[arg(long, env = "MIRROR_PORT")]
    port: Option<u16>,

    /// Address to bind.  Overrides the config file.
    #[arg(long, env = "MIRROR_BIND")]
    bind: Option<String>,

    /// Path to the TOML config file.
    #[arg(long, env = "MIRROR_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.general.log_level);

    let token = generate_token(config.session.token_length);
    let key = {
        let token = token.clone();
        tokio::task::spawn_blocking(move || derive_key(&token))
            .await
            .context("key derivation task failed")?
            .context("failed to derive the session key")?
    };

    let emulator = platform_emulator().context("input replay is unavailable")?;
    let geometry = virtual_screen();
    info!("Replaying onto virtual desktop {geometry:?}");
    let replay = Arc::new(InputReplayer::new(emulator, geometry));

    let bind = cli.bind.unwrap_or(config.network.bind_address.clone());
    let port = cli.port.unwrap_or(config.network.port);
    let listener = TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {bind}:{port}"))?;

    let (approver, mut approvals) = ChannelApprover::new();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            println!("[status] {status}");
        }
    });

    let session = ReceiverSession::new(key, Arc::new(approver), replay, status_tx);
    let handle = spawn_session(session).context("failed to start the session thread")?;
    let listener_task = tokio::spawn(run_listener(
        listener,
        handle.inputs(),
        handle.shutdown_signal(),
    ));

    println!("Connection token: {token}");
    println!("Waiting for a sender on port {port}.  Commands: p = pause, r = resume, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<ApprovalRequest> = None;

    loop {
        tokio::select! {
            Some(request) = approvals.recv(), if pending.is_none() => {
                let mut stdout = tokio::io::stdout();
                let prompt = format!("Allow {:?} to control this PC? [y/N] ", request.pc_name);
                stdout.write_all(prompt.as_bytes()).await?;
                stdout.flush().await?;
                pending = Some(request);
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(request) = pending.take() {
                        request.answer(parse_answer(&line));
                        continue;
                    }
                    match line.trim() {
                        "p" | "pause" => handle.pause(),
                        "r" | "resume" => handle.resume(),
                        "q" | "quit" => break,
                        "" => {}
                        other => println!("Unknown command: {other}"),
                    }
                }
                Ok(None) | Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    // An unanswered prompt would keep the session thread blocked.
    drop(pending);
    drop(approvals);

    let counts = handle.counts();
    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("session shutdown task failed")?;
    let _ = listener_task.await;

    info!(
        "Receiver stopped: {} events replayed, {} dropped, {} replay failures",
        counts.received, counts.dropped, counts.replay_failures
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
