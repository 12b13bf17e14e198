//! Client-side endpoint
//!
//! Connects to a relay, sends the identity line, then runs an inbound
//! task that turns relayed lines into [`Event`]s while the owner sends
//! chat and typing notices on the outbound half.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, LineReader, LineWriter};
use crate::error::AppError;
use crate::message::{Message, CHAT_SEPARATOR};
use crate::sink::{Event, SharedSink};
use crate::types::Identity;

/// A connected chat client
pub struct Client<S = TcpStream> {
    identity: Identity,
    writer: LineWriter<S>,
    /// Currently signaled as typing
    typing: bool,
    inbound: JoinHandle<()>,
}

impl Client<TcpStream> {
    /// Connect to a relay at `addr`
    ///
    /// A failure is reported to `sink` and returned as
    /// [`AppError::Connect`]; there is no retry.
    pub async fn connect(
        addr: &str,
        identity: Identity,
        sink: SharedSink,
    ) -> Result<Self, AppError> {
        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(source) => {
                let err = AppError::Connect {
                    addr: addr.to_string(),
                    source,
                };
                warn!("{}", err);
                sink.emit(Event::error(err.to_string()));
                return Err(err);
            }
        };

        info!("Connected to {}", addr);
        Self::start(Connection::new(stream), identity, sink).await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Send the identity line over an established connection and start
    /// the inbound task
    pub async fn start(
        connection: Connection<S>,
        identity: Identity,
        sink: SharedSink,
    ) -> Result<Self, AppError> {
        let (mut writer, reader) = connection.into_split();

        writer.send(identity.as_str()).await?;
        sink.emit(Event::status(format!("Connected as {}", identity)));

        let inbound = tokio::spawn(receive_lines(reader, identity.clone(), sink));

        Ok(Self {
            identity,
            writer,
            typing: false,
            inbound,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Check if the inbound side is still running
    pub fn is_connected(&self) -> bool {
        !self.inbound.is_finished()
    }

    /// Signal that the user is composing
    ///
    /// Only the first call of a burst sends `typing:<identity>`; the burst
    /// ends when a chat message is sent.
    pub async fn notify_typing(&mut self) -> Result<(), AppError> {
        if self.typing {
            return Ok(());
        }

        let line = Message::TypingStart {
            sender: self.identity.to_string(),
        }
        .to_string();
        self.writer.send(&line).await?;
        self.typing = true;
        Ok(())
    }

    /// Send a chat message followed by `stopTyping`
    ///
    /// The text is trimmed and any line breaks are flattened to spaces.
    /// Returns false without sending if nothing is left.
    pub async fn send_chat(&mut self, text: &str) -> Result<bool, AppError> {
        let text = text.trim().replace(|c: char| c == '\r' || c == '\n', " ");
        if text.is_empty() {
            return Ok(false);
        }

        let line = Message::chat(self.identity.as_str(), text).to_string();
        self.writer.send(&line).await?;

        self.typing = false;
        self.writer.send(&Message::TypingStop.to_string()).await?;
        Ok(true)
    }

    /// Close the outbound side and wait for the relay to hang up
    pub async fn close(mut self) {
        self.writer.close().await;
        let _ = self.inbound.await;
    }
}

/// Map a relayed line to the event shown to the local user
pub fn inbound_event(line: &str, identity: &Identity) -> Event {
    match Message::parse(line) {
        Message::TypingStart { sender } => Event::Typing { sender },
        Message::TypingStop => Event::StopTyping,
        Message::Chat { .. } => Event::Display {
            text: line.to_string(),
            local: line.starts_with(&format!("{}{}", identity, CHAT_SEPARATOR)),
        },
    }
}

async fn receive_lines<S>(mut reader: LineReader<S>, identity: Identity, sink: SharedSink)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match reader.receive().await {
            Ok(Some(line)) => sink.emit(inbound_event(&line, &identity)),
            Ok(None) => {
                info!("Relay closed the connection");
                sink.emit(Event::error("Disconnected from server"));
                break;
            }
            Err(e) => {
                warn!("Connection lost: {}", e);
                sink.emit(Event::error(format!("Disconnected: {}", e)));
                break;
            }
        }
    }

    debug!("Inbound task ended for '{}'", identity);
}
