//! Wire protocol definitions
//!
//! Newline-delimited UTF-8 text. Every line is one of:
//! - `typing:<identity>`: typing started
//! - `stopTyping`: typing stopped
//! - anything else: a chat line, conventionally `<identity>: <text>`
//!
//! The first line a client sends is its identity and is not parsed here.

use std::fmt;

/// Prefix of a typing-started control line
pub const TYPING_PREFIX: &str = "typing:";

/// Exact text of a typing-stopped control line
pub const STOP_TYPING: &str = "stopTyping";

/// Separator between the embedded sender and the chat text
pub const CHAT_SEPARATOR: &str = ": ";

/// One line on the wire
///
/// Parsing never fails and `parse(line).to_string() == line` holds for
/// every line, so relaying a parsed message is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Chat text, with the sender embedded by the client if present
    Chat {
        sender: Option<String>,
        text: String,
    },
    /// Sender started typing
    TypingStart { sender: String },
    /// Typing stopped (the wire carries no sender)
    TypingStop,
}

impl Message {
    /// Classify a received line
    pub fn parse(line: &str) -> Self {
        if let Some(sender) = line.strip_prefix(TYPING_PREFIX) {
            return Message::TypingStart {
                sender: sender.to_string(),
            };
        }

        if line == STOP_TYPING {
            return Message::TypingStop;
        }

        match line.split_once(CHAT_SEPARATOR) {
            Some((sender, text)) => Message::Chat {
                sender: Some(sender.to_string()),
                text: text.to_string(),
            },
            None => Message::Chat {
                sender: None,
                text: line.to_string(),
            },
        }
    }

    /// Build a chat message from a sender and text
    pub fn chat(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Message::Chat {
            sender: Some(sender.into()),
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Chat {
                sender: Some(sender),
                text,
            } => write!(f, "{}{}{}", sender, CHAT_SEPARATOR, text),
            Message::Chat { sender: None, text } => f.write_str(text),
            Message::TypingStart { sender } => write!(f, "{}{}", TYPING_PREFIX, sender),
            Message::TypingStop => f.write_str(STOP_TYPING),
        }
    }
}
