//! Line-Oriented Chat Relay Library
//!
//! One process acts as a rendezvous point for many chat clients over
//! plain TCP, one UTF-8 line per message.
//!
//! # Features
//! - Identity registration from the first line of each connection
//! - Chat relay to every connected client
//! - Typing / stop-typing notices to everyone but the sender
//! - Presence updates as clients come and go
//! - Client endpoint with debounced typing notices
//!
//! # Architecture
//! - `Registry` is an actor owning the connection → identity map
//! - Each accepted socket gets a `handler` task plus a writer task
//! - `Broadcaster` fans lines out to registry snapshots
//! - The presentation layer only sees `Event`s through an `EventSink`
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use chat_relay::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, _events) = mpsc::unbounded_channel();
//!     let server = Server::bind("0.0.0.0:5000", Arc::new(tx)).await.unwrap();
//!     server.run_until(std::future::pending()).await;
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod handler;
pub mod message;
pub mod peer;
pub mod registry;
pub mod server;
pub mod sink;
pub mod transcript;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{Broadcaster, Delivery};
pub use client::Client;
pub use connection::Connection;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::Message;
pub use peer::Peer;
pub use registry::Registry;
pub use server::Server;
pub use sink::{Event, EventSink, SharedSink};
pub use transcript::Transcript;
pub use types::{ConnectionId, Identity};
