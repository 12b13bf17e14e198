//! Command line configuration
//!
//! Mode, address, port and display name are fixed at startup.

use clap::{Parser, Subcommand};

use crate::server::DEFAULT_PORT;

/// Line-oriented chat relay with typing indicators
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Print events as JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Accept clients and relay their messages
    Server {
        /// Address to bind to
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Also join the chat locally under this name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Connect to a relay and chat
    Client {
        /// Relay address
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Relay port
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Display name (blank means anonymous)
        #[arg(short, long, default_value = "")]
        name: String,
    },
}

impl Mode {
    /// `host:port` to bind or connect to
    pub fn address(&self) -> String {
        match self {
            Mode::Server { host, port, .. } | Mode::Client { host, port, .. } => {
                format!("{}:{}", host, port)
            }
        }
    }
}
