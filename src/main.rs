use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use retroboard::client::cli_client;
use retroboard::client::config::ClientConfig;
use retroboard::client::utils::session_store::{load_display_name, save_display_name};

#[derive(Debug, Parser)]
#[command(name = "retroboard", about = "Terminal client for a collaborative retro board")]
struct Args {
    /// Board server, host[:port]
    #[arg(long)]
    host: Option<String>,
    /// Board path on the server
    #[arg(long)]
    board: Option<String>,
    /// Display name (otherwise the remembered one, or a prompt)
    #[arg(long)]
    name: Option<String>,
    /// Use wss://
    #[arg(long)]
    secure: bool,
}

async fn ask_name() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"Your name: ").await?;
        stdout.flush().await?;
        let line = lines.next_line().await?.context("stdin closed before a name was given")?;
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let mut config = ClientConfig::from_env();

    // Configura logging
    std::env::set_var("RUST_LOG", &config.log_level);
    env_logger::init();

    let args = Args::parse();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(board) = args.board {
        config.path = board;
    }
    config.secure |= args.secure;

    let name = match args.name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name.trim().to_string(),
        None => match load_display_name() {
            Some(name) => name,
            None => ask_name().await?,
        },
    };
    if let Err(e) = save_display_name(&name) {
        warn!("display name not remembered: {}", e);
    }

    info!("connecting to {}{} as {}", config.host, config.path, name);
    cli_client::run(config, name).await
}
