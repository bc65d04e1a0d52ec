//! platter — food-ordering orchestrator over restaurant A2A agents
//!
//! Usage:
//!   platter run                 interactive relay console
//!   platter monitor --port N    message monitor service

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platter_a2a::{A2aClient, MessageLogSink, Orchestrator, RELAY_HELP, RelayPlanner};
use platter_core::Wallet;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::config::{PlatterConfig, REMOTE_AGENTS_ENV};

const CONSOLE_HELP: &str = "Console: new (start a fresh conversation) | help | quit";

#[derive(Parser, Debug)]
#[command(name = "platter", version, about = "Order food through restaurant A2A agents")]
struct Cli {
    /// Path to config.toml (defaults to <config dir>/platter/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the orchestrator with an interactive console
    Run,
    /// Serve the message monitor
    Monitor {
        #[arg(long, default_value_t = platter_monitor::DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Run => run(cli.config.as_deref()).await,
        Command::Monitor { port, host } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            platter_monitor::serve(addr).await
        }
    }
}

async fn run(config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = PlatterConfig::load(config_path)?;
    config.apply_remote_agents_override(std::env::var(REMOTE_AGENTS_ENV).ok());
    config.validate()?;

    let client = A2aClient::new(config.client_config())?;
    let sink = MessageLogSink::new(config.monitor.url.as_deref());
    if !sink.is_enabled() {
        info!("Message monitor disabled");
    }
    let orchestrator = Orchestrator::new(
        config.orchestrator_config(),
        Arc::new(client),
        Arc::new(Wallet::new(config.budget.initial_balance)),
        sink,
        Arc::new(RelayPlanner),
    );
    orchestrator.monitor().ensure_started().await;

    let mut conversation_id = uuid::Uuid::new_v4().to_string();
    info!(
        "{} ready ({} agent(s) reachable), conversation {}",
        orchestrator.name(),
        orchestrator.registry().connected_count(),
        conversation_id
    );

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    stdout
        .write_all(format!("{}\n{}\n", RELAY_HELP, CONSOLE_HELP).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                stdout
                    .write_all(format!("{}\n{}\n", RELAY_HELP, CONSOLE_HELP).as_bytes())
                    .await?;
                continue;
            }
            "new" => {
                orchestrator.end_conversation(&conversation_id).await;
                conversation_id = uuid::Uuid::new_v4().to_string();
                stdout.write_all(b"Starting over.\n").await?;
                continue;
            }
            _ => {}
        }

        let answer = match orchestrator.handle_turn(&conversation_id, line).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Turn failed: {:#}", e);
                format!("Something went wrong: {:#}", e)
            }
        };
        stdout.write_all(format!("{}\n", answer).as_bytes()).await?;
    }

    orchestrator.end_conversation(&conversation_id).await;
    info!("Goodbye");
    Ok(())
}
