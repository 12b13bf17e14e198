//! Line-oriented connection
//!
//! Wraps any byte stream in a `LinesCodec` and splits it into a reader
//! half and a writer half, so that a session can read on one task while
//! another task writes.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::types::ConnectionId;

/// Longest accepted line in bytes, excluding the newline
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A bidirectional text-line stream to one remote peer
pub struct Connection<S = TcpStream> {
    id: ConnectionId,
    writer: LineWriter<S>,
    reader: LineReader<S>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Frame a stream into lines under a fresh connection ID
    pub fn new(stream: S) -> Self {
        let id = ConnectionId::new();
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (sink, stream) = framed.split();

        Self {
            id,
            writer: LineWriter {
                id,
                sink,
                closed: false,
            },
            reader: LineReader { stream },
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Write one line and flush
    pub async fn send(&mut self, line: &str) -> Result<(), AppError> {
        self.writer.send(line).await
    }

    /// Read the next line; `None` at end of stream
    pub async fn receive(&mut self) -> Result<Option<String>, AppError> {
        self.reader.receive().await
    }

    /// Close the write side; safe to call more than once
    pub async fn close(&mut self) {
        self.writer.close().await;
    }

    /// Split into independently owned writer and reader halves
    pub fn into_split(self) -> (LineWriter<S>, LineReader<S>) {
        (self.writer, self.reader)
    }
}

/// Write half of a [`Connection`]
pub struct LineWriter<S = TcpStream> {
    id: ConnectionId,
    sink: SplitSink<Framed<S, LinesCodec>, String>,
    closed: bool,
}

impl<S> LineWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Write one line and flush
    pub async fn send(&mut self, line: &str) -> Result<(), AppError> {
        self.sink.send(line.to_string()).await?;
        Ok(())
    }

    /// Flush and shut down the write side
    ///
    /// Only the first call does anything. A failure to close is logged,
    /// never returned.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.sink.close().await {
            Ok(()) => debug!("Connection {} closed", self.id),
            Err(e) => warn!("Failed to close connection {}: {}", self.id, e),
        }
    }
}

/// Read half of a [`Connection`]
pub struct LineReader<S = TcpStream> {
    stream: SplitStream<Framed<S, LinesCodec>>,
}

impl<S> LineReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Read the next line; `None` at end of stream
    pub async fn receive(&mut self) -> Result<Option<String>, AppError> {
        match self.stream.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (a, b) = duplex(1024);
        let mut left = Connection::new(a);
        let mut right = Connection::new(b);

        left.send("Alice: hello").await.unwrap();
        left.send("stopTyping").await.unwrap();

        assert_eq!(right.receive().await.unwrap().as_deref(), Some("Alice: hello"));
        assert_eq!(right.receive().await.unwrap().as_deref(), Some("stopTyping"));
    }

    #[tokio::test]
    async fn test_receive_strips_crlf() {
        let (a, mut b) = duplex(1024);
        let mut conn = Connection::new(a);

        b.write_all(b"Bob: hi\r\n").await.unwrap();

        assert_eq!(conn.receive().await.unwrap().as_deref(), Some("Bob: hi"));
    }

    #[tokio::test]
    async fn test_receive_end_of_stream() {
        let (a, b) = duplex(1024);
        let mut conn = Connection::new(a);
        drop(b);

        assert!(conn.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (a, mut b) = duplex(1024);
        let mut conn = Connection::new(a);

        conn.send("bye").await.unwrap();
        conn.close().await;
        conn.close().await;

        let mut received = String::new();
        b.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "bye\n");
    }

    #[tokio::test]
    async fn test_line_too_long_is_stream_error() {
        let (a, mut b) = duplex(MAX_LINE_LENGTH * 2 + 16);
        let mut conn = Connection::new(a);

        let long = "x".repeat(MAX_LINE_LENGTH + 1);
        b.write_all(long.as_bytes()).await.unwrap();
        b.write_all(b"\n").await.unwrap();

        assert!(matches!(conn.receive().await, Err(AppError::Stream(_))));
    }
}
