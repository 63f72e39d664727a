//! InputMirror sender entry point.
//!
//! Captures this machine's keyboard and mouse and mirrors them to a receiver.
//!
//! # Usage
//!
//! ```text
//! mirror-sender --host <RECEIVER_IP> [OPTIONS]
//!
//! Options:
//!   --host     <HOST>  Receiver hostname or IP address
//!   --port     <PORT>  Receiver WebSocket port [default: from config, 8765]
//!   --token    <TOKEN> Token shown by the receiver (prompted if omitted)
//!   --name     <NAME>  Name shown to the receiver's operator [default: hostname]
//!   --config   <PATH>  Config file [default: platform config dir]
//! ```
//!
//! While connected, type `p` + Enter to pause, `r` to resume and `q` to quit.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mirror_core::{load_config, normalize_token_input, validate_token};
use mirror_sender::application::sender_session::{connect, SenderSettings};
use mirror_sender::infrastructure::identity::{resolve_pc_name, HostnameIdentity};
use mirror_sender::infrastructure::input_capture::platform_capture_source;
use mirror_sender::infrastructure::network::ws_client;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// InputMirror sender.
///
/// Mirrors local keyboard and mouse input to a receiver on the network.
#[derive(Debug, Parser)]
#[command(
    name = "mirror-sender",
    about = "Mirror this machine's keyboard and mouse to an InputMirror receiver",
    version
)]
struct Cli {
    /// Hostname or IP address of the receiver.
    #[arg(long, env = "MIRROR_HOST")]
    host: String,

    /// WebSocket port of the receiver.  Overrides the config file.
    #[arg(long, env = "MIRROR_PORT")]
    port: Option<u16>,

    /// Token displayed by the receiver.  Prompted for when omitted.
    #[arg(long, env = "MIRROR_TOKEN")]
    token: Option<String>,

    /// Name shown to the receiver's operator.  Defaults to the hostname.
    #[arg(long)]
    name: Option<String>,

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

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.general.log_level);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let raw_token = match cli.token {
        Some(token) => token,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(b"Enter connection token: ").await?;
            stdout.flush().await?;
            lines
                .next_line()
                .await?
                .context("stdin closed before a token was entered")?
        }
    };
    let token = normalize_token_input(&raw_token);
    if !validate_token(&token, config.session.token_length) {
        anyhow::bail!(
            "invalid token: expected {} characters from A-Z and 0-9",
            config.session.token_length
        );
    }

    let port = cli.port.unwrap_or(config.network.port);
    let url = format!("ws://{}:{}", cli.host, port);
    let settings = SenderSettings {
        pc_name: resolve_pc_name(cli.name, &HostnameIdentity),
        connect_timeout: config.session.connect_timeout(),
        mouse_throttle: config.session.mouse_throttle(),
    };

    let capture = platform_capture_source().context("input capture is unavailable")?;

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            println!("[status] {status}");
        }
    });

    info!("Connecting to {url} as {:?}", settings.pc_name);
    let handle = connect(&token, settings, ws_client::open(&url), capture, status_tx)
        .await
        .with_context(|| format!("could not establish a session with {url}"))?;

    println!("Mirroring input.  Commands: p = pause, r = resume, q = quit");

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "p" | "pause" => handle.pause(),
                    "r" | "resume" => handle.resume(),
                    "q" | "quit" => break,
                    "" => {}
                    other => println!("Unknown command: {other}"),
                },
                Ok(None) | Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = handle.ended() => {
                info!("Session ended by the receiver or the network");
                break;
            }
        }
    }

    let counts = handle.counts();
    handle.disconnect().await;
    info!(
        "Session ended: {} events sent, {} dropped",
        counts.sent, counts.dropped
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_only_host() {
        // Arrange / Act
        let cli = Cli::parse_from(["mirror-sender", "--host", "192.168.1.20"]);

        // Assert
        assert_eq!(cli.host, "192.168.1.20");
        assert!(cli.port.is_none());
        assert!(cli.token.is_none());
    }

    #[test]
    fn test_cli_accepts_all_overrides() {
        let cli = Cli::parse_from([
            "mirror-sender",
            "--host",
            "desk",
            "--port",
            "9000",
            "--token",
            "ab12cd",
            "--name",
            "laptop",
        ]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.token.as_deref(), Some("ab12cd"));
        assert_eq!(cli.name.as_deref(), Some("laptop"));
    }

    #[test]
    fn test_cli_without_host_is_error() {
        assert!(Cli::try_parse_from(["mirror-sender"]).is_err());
    }
}
