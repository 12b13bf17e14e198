//! Per-connection session handler
//!
//! Reads the identity line, registers the connection, then relays every
//! following line through the [`Broadcaster`] until the stream ends.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::connection::{Connection, LineReader};
use crate::error::AppError;
use crate::message::Message;
use crate::peer::Peer;
use crate::registry::Registry;
use crate::types::{ConnectionId, Identity};

/// Lines queued for one connection before senders wait
pub const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Handle one accepted connection to completion
///
/// Sets up a writer task fed by the [`Peer`] handed to the registry,
/// relays lines until the peer disconnects or either direction fails,
/// then deregisters and closes the connection. Read failures are not
/// retried.
pub async fn handle_connection<S>(
    connection: Connection<S>,
    registry: Registry,
    broadcaster: Broadcaster,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = connection.id();
    let (mut writer, mut reader) = connection.into_split();

    // First line is the identity
    let identity = match reader.receive().await {
        Ok(Some(line)) => Identity::from_line(&line),
        Ok(None) => {
            debug!("Connection {} closed before sending an identity", id);
            writer.close().await;
            return Ok(());
        }
        Err(e) => {
            writer.close().await;
            return Err(e);
        }
    };

    // Channel for relay -> connection lines
    let (line_tx, mut line_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER_SIZE);

    // Spawn write task (queued lines -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            if let Err(e) = writer.send(&line).await {
                debug!("Write to connection {} failed: {}", id, e);
                break;
            }
        }
        writer.close().await;
    });

    registry.register(Peer::new(id, line_tx), identity.clone()).await?;
    info!("Session {} active as '{}'", id, identity);

    // Wait for the read loop to end or the writer to fail
    let outcome = tokio::select! {
        result = relay_lines(id, &mut reader, &broadcaster) => Some(result),
        _ = &mut write_task => {
            debug!("Write task ended first for {}", id);
            None
        }
    };

    registry.deregister(id).await;

    // The registry held the last sender, so the writer drains and closes
    let result = match outcome {
        Some(result) => {
            let _ = write_task.await;
            result
        }
        None => Ok(()),
    };

    info!("Session {} ('{}') ended", id, identity);
    result
}

/// Classify and relay lines until end of stream
async fn relay_lines<S>(
    id: ConnectionId,
    reader: &mut LineReader<S>,
    broadcaster: &Broadcaster,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(line) = reader.receive().await? {
        match Message::parse(&line) {
            Message::TypingStart { sender } => {
                debug!("{} is typing ({})", sender, id);
                broadcaster.broadcast_typing(id, &sender).await;
            }
            Message::TypingStop => {
                broadcaster.broadcast_stop_typing(id).await;
            }
            Message::Chat { .. } => {
                let delivery = broadcaster.broadcast_chat(&line).await;
                debug!(
                    "Chat from {} delivered to {}/{}",
                    id,
                    delivery.delivered(),
                    delivery.attempted
                );
            }
        }
    }

    Ok(())
}
