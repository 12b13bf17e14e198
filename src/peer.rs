//! Peer handle definition
//!
//! The registry's view of a server-side connection: its ID and the
//! channel feeding that connection's writer task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::ConnectionId;

/// Handle used to deliver lines to one connected peer
///
/// Cloning is cheap. The connection's writer task ends once every
/// clone has been dropped.
#[derive(Debug, Clone)]
pub struct Peer {
    /// Connection this handle writes to
    pub id: ConnectionId,
    /// Relay → peer line channel
    sender: mpsc::Sender<String>,
}

impl Peer {
    /// Create a new peer handle with the given ID and sender channel
    pub fn new(id: ConnectionId, sender: mpsc::Sender<String>) -> Self {
        Self { id, sender }
    }

    /// Queue one line for this peer
    ///
    /// Returns an error if the writer task has ended (peer gone or its
    /// socket write failed).
    pub async fn send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(line.into())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
