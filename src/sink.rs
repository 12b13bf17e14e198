//! Collaborator interface between the relay core and a presentation layer
//!
//! The core never renders anything. It emits [`Event`]s into an [`EventSink`]
//! and the presentation layer dispatches them onto whatever thread it needs.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

/// Event handed to the presentation layer
///
/// Serialized as a tagged enum with snake_case naming for `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Chat line to display
    Display { text: String, local: bool },
    /// A peer started typing
    Typing { sender: String },
    /// Retract typing indicators
    StopTyping,
    /// Human-readable status
    Status { message: String, is_error: bool },
    /// Current connected identities, in registration order
    Presence { identities: Vec<String> },
}

impl Event {
    /// Informational status event
    pub fn status(message: impl Into<String>) -> Self {
        Event::Status {
            message: message.into(),
            is_error: false,
        }
    }

    /// Error status event
    pub fn error(message: impl Into<String>) -> Self {
        Event::Status {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Receiver of core events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink shared between tasks
pub type SharedSink = Arc<dyn EventSink>;

impl EventSink for mpsc::UnboundedSender<Event> {
    fn emit(&self, event: Event) {
        // A presentation layer that went away just stops receiving
        let _ = self.send(event);
    }
}
