//! Terminal front end for the binary
//!
//! Renders core events on stdout and feeds stdin lines to a [`Client`].

use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::client::Client;
use crate::error::AppError;
use crate::sink::Event;
use crate::transcript::{EntryKind, Transcript};

/// Input line that sends a typing notice instead of chat
pub const TYPING_COMMAND: &str = "/typing";

/// Input line that ends the session
pub const QUIT_COMMAND: &str = "/quit";

/// Print events until every sender is gone
pub async fn render(mut events: mpsc::UnboundedReceiver<Event>, json: bool) {
    let mut transcript = Transcript::new();

    while let Some(event) = events.recv().await {
        if let Some(line) = format_event(&mut transcript, &event, json) {
            println!("{}", line);
        }
    }
}

/// Text to print for one event, if any
///
/// Text mode shows appended entries, status changes and the user list.
/// A retracted typing indicator cannot be unprinted and shows nothing.
pub fn format_event(transcript: &mut Transcript, event: &Event, json: bool) -> Option<String> {
    let appended = transcript.apply(event).cloned();

    if json {
        return match serde_json::to_string(event) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        };
    }

    if let Some(entry) = appended {
        return Some(match (entry.kind, entry.local) {
            (EntryKind::Typing, _) => format!("  ({})", entry.text),
            (EntryKind::Message, true) => format!("> {}", entry.text),
            (EntryKind::Message, false) => entry.text,
        });
    }

    match event {
        Event::Status { message, is_error } => Some(if *is_error {
            format!("[error] {}", message)
        } else {
            format!("[status] {}", message)
        }),
        Event::Presence { .. } => Some(format!("[online] {}", transcript.users().join(", "))),
        _ => None,
    }
}

/// Send stdin lines as chat until EOF, `/quit`, or disconnect
pub async fn chat_from_stdin<S>(mut client: Client<S>) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if !client.is_connected() {
            break;
        }

        match line.trim() {
            QUIT_COMMAND => break,
            TYPING_COMMAND => client.notify_typing().await?,
            _ => {
                client.send_chat(&line).await?;
            }
        }
    }

    client.close().await;
    Ok(())
}
