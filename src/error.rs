//! Error types for the chat relay
//!
//! Defines application-level errors and peer send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::types::ConnectionId;

/// Application-level errors
///
/// `Bind` and `Connect` are fatal to startup or to a connection attempt.
/// `Stream` and `Io` are local to one connection and only tear that one down.
#[derive(Debug, Error)]
pub enum AppError {
    /// Listening port unavailable
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server unreachable
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Line read/write failure mid-session
    #[error("Stream error: {0}")]
    Stream(#[from] LinesCodecError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection registered twice
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// Registry actor is no longer running
    #[error("Registry closed")]
    RegistryClosed,
}

impl AppError {
    /// Check if this error was already shown to the user as a status event
    pub fn is_reported(&self) -> bool {
        matches!(self, AppError::Bind { .. } | AppError::Connect { .. })
    }
}

/// Peer send errors
///
/// Occurs when a peer's writer task has ended.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
