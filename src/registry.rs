//! Registry actor implementation
//!
//! Owns the mapping from each registered connection to its identity.
//! All access goes through [`Registry`], a cloneable handle that sends
//! commands to a single actor task, so the map itself is never shared.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::AppError;
use crate::peer::Peer;
use crate::sink::{Event, SharedSink};
use crate::types::{ConnectionId, Identity};

/// Channel buffer size for registry commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Commands sent from handles to the registry actor
#[derive(Debug)]
enum RegistryCommand {
    /// Connection completed identity registration
    Register {
        peer: Peer,
        identity: Identity,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    /// Connection is going away
    Deregister {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    /// Copy of the registered identities
    Snapshot {
        reply: oneshot::Sender<Vec<Identity>>,
    },
    /// Every registered peer except one
    Recipients {
        except: Option<ConnectionId>,
        reply: oneshot::Sender<Vec<Peer>>,
    },
}

/// One registered connection
#[derive(Debug)]
struct Entry {
    peer: Peer,
    identity: Identity,
    /// Registration order
    seq: u64,
}

/// The registry actor
///
/// Processes one command at a time, so every register/deregister is a
/// single atomic step and snapshots are consistent.
struct RegistryActor {
    /// Registered connections: ConnectionId -> Entry
    entries: HashMap<ConnectionId, Entry>,
    /// Next registration sequence number
    next_seq: u64,
    /// Presence updates go here
    sink: SharedSink,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl RegistryActor {
    fn new(receiver: mpsc::Receiver<RegistryCommand>, sink: SharedSink) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            sink,
            receiver,
        }
    }

    /// Run until every handle has been dropped
    async fn run(mut self) {
        debug!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!("Registry shutting down");
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                peer,
                identity,
                reply,
            } => {
                let _ = reply.send(self.handle_register(peer, identity));
            }
            RegistryCommand::Deregister { id, reply } => {
                let _ = reply.send(self.handle_deregister(id));
            }
            RegistryCommand::Snapshot { reply } => {
                let _ = reply.send(self.identities());
            }
            RegistryCommand::Recipients { except, reply } => {
                let _ = reply.send(self.recipients(except));
            }
        }
    }

    fn handle_register(&mut self, peer: Peer, identity: Identity) -> Result<(), AppError> {
        if self.entries.contains_key(&peer.id) {
            return Err(AppError::AlreadyRegistered(peer.id));
        }

        info!("Connection {} registered as '{}'", peer.id, identity);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            peer.id,
            Entry {
                peer,
                identity,
                seq,
            },
        );

        self.publish_presence();
        Ok(())
    }

    fn handle_deregister(&mut self, id: ConnectionId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };

        info!("Connection {} ('{}') deregistered", id, entry.identity);
        self.publish_presence();
        true
    }

    /// Entries in registration order
    fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    fn identities(&self) -> Vec<Identity> {
        self.ordered()
            .into_iter()
            .map(|e| e.identity.clone())
            .collect()
    }

    fn recipients(&self, except: Option<ConnectionId>) -> Vec<Peer> {
        self.ordered()
            .into_iter()
            .filter(|e| Some(e.peer.id) != except)
            .map(|e| e.peer.clone())
            .collect()
    }

    fn publish_presence(&self) {
        debug!("Registered connections: {}", self.entries.len());

        let identities = self
            .identities()
            .into_iter()
            .map(|i| i.as_str().to_string())
            .collect();
        self.sink.emit(Event::Presence { identities });
    }
}

/// Handle to the registry actor
#[derive(Clone)]
pub struct Registry {
    sender: mpsc::Sender<RegistryCommand>,
}

impl Registry {
    /// Start a registry actor and return a handle to it
    ///
    /// Every successful register/deregister emits an [`Event::Presence`]
    /// into `sink`.
    pub fn spawn(sink: SharedSink) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(RegistryActor::new(receiver, sink).run());
        Self { sender }
    }

    /// Register a connection under an identity
    ///
    /// Fails if the connection is already present.
    pub async fn register(&self, peer: Peer, identity: Identity) -> Result<(), AppError> {
        self.request(|reply| RegistryCommand::Register {
            peer,
            identity,
            reply,
        })
        .await?
    }

    /// Remove a connection; returns false if it was not registered
    pub async fn deregister(&self, id: ConnectionId) -> bool {
        self.request(|reply| RegistryCommand::Deregister { id, reply })
            .await
            .unwrap_or(false)
    }

    /// Point-in-time copy of registered identities, in registration order
    pub async fn snapshot(&self) -> Vec<Identity> {
        self.request(|reply| RegistryCommand::Snapshot { reply })
            .await
            .unwrap_or_default()
    }

    /// Every registered peer except `id`
    pub async fn all_except(&self, id: ConnectionId) -> Vec<Peer> {
        self.recipients(Some(id)).await
    }

    /// Every registered peer
    pub async fn all(&self) -> Vec<Peer> {
        self.recipients(None).await
    }

    async fn recipients(&self, except: Option<ConnectionId>) -> Vec<Peer> {
        self.request(|reply| RegistryCommand::Recipients { except, reply })
            .await
            .unwrap_or_default()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| AppError::RegistryClosed)?;
        response.await.map_err(|_| AppError::RegistryClosed)
    }
}
