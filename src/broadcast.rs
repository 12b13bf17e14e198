//! Fan-out of lines to registered connections
//!
//! Chat lines go to every registered connection, the originator included.
//! Typing and stop-typing lines go to everyone except the originator.
//! The relay has always behaved this way; senders see their own chat
//! echoed back but not their own typing notices.

use tracing::debug;

use crate::message::Message;
use crate::peer::Peer;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients a send was attempted to
    pub attempted: usize,
    /// Recipients whose writer was already gone
    pub failed: usize,
}

impl Delivery {
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed
    }
}

/// Delivers lines to the connections in a [`Registry`]
#[derive(Clone)]
pub struct Broadcaster {
    registry: Registry,
}

impl Broadcaster {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Relay a chat line to every registered connection, sender included
    pub async fn broadcast_chat(&self, line: &str) -> Delivery {
        let recipients = self.registry.all().await;
        self.deliver(recipients, line).await
    }

    /// Relay `typing:<identity>` to everyone but the originator
    pub async fn broadcast_typing(&self, origin: ConnectionId, identity: &str) -> Delivery {
        let line = Message::TypingStart {
            sender: identity.to_string(),
        }
        .to_string();
        let recipients = self.registry.all_except(origin).await;
        self.deliver(recipients, &line).await
    }

    /// Relay `stopTyping` to everyone but the originator
    pub async fn broadcast_stop_typing(&self, origin: ConnectionId) -> Delivery {
        let line = Message::TypingStop.to_string();
        let recipients = self.registry.all_except(origin).await;
        self.deliver(recipients, &line).await
    }

    /// Send to each recipient in snapshot order
    ///
    /// A failed recipient is deregistered and skipped; the error never
    /// reaches the sender.
    async fn deliver(&self, recipients: Vec<Peer>, line: &str) -> Delivery {
        let mut delivery = Delivery::default();

        for peer in recipients {
            delivery.attempted += 1;
            if let Err(e) = peer.send(line).await {
                debug!("Dropping connection {} after failed delivery: {}", peer.id, e);
                delivery.failed += 1;
                self.registry.deregister(peer.id).await;
            }
        }

        delivery
    }
}
