//! Chat relay - Entry Point
//!
//! Runs either the relay server (optionally joining its own chat) or a
//! client, with a terminal front end on stdin/stdout.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::config::{Cli, Mode};
use chat_relay::console;
use chat_relay::{AppError, Client, Identity, Server, SharedSink};

/// How long pending events may take to reach the terminal on exit
const RENDER_DRAIN: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Events from the core are rendered on stdout
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let sink: SharedSink = Arc::new(event_tx);
    let renderer = tokio::spawn(console::render(event_rx, cli.json));

    let result = run(cli.mode, sink).await;

    // Let status events already emitted (a bind error, say) get printed
    let _ = timeout(RENDER_DRAIN, renderer).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_reported() => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: Mode, sink: SharedSink) -> Result<(), AppError> {
    let addr = mode.address();

    match mode {
        Mode::Server { name, .. } => {
            let server = Server::bind(&addr, sink.clone()).await?;

            if let Some(name) = name {
                let local = server.advertised_addr()?.to_string();
                let client = Client::connect(&local, Identity::from_line(&name), sink).await?;
                info!("Joined own relay at {} as '{}'", local, client.identity());
                tokio::spawn(async move {
                    if let Err(e) = console::chat_from_stdin(client).await {
                        error!("Local client stopped: {}", e);
                    }
                });
            }

            server
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
        Mode::Client { name, .. } => {
            let client = Client::connect(&addr, Identity::from_line(&name), sink).await?;
            console::chat_from_stdin(client).await?;
        }
    }

    Ok(())
}
