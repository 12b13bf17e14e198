//! Display model for a chat window
//!
//! Folds [`Event`]s into what a user would see: the message list with
//! typing indicators, the status line, and the online-user list.

use crate::sink::Event;

/// Suffix of a typing indicator entry
pub const TYPING_SUFFIX: &str = " is typing...";

/// What an entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message,
    /// Retracted by the next stop-typing notice
    Typing,
}

/// One displayed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub text: String,
    pub local: bool,
    pub kind: EntryKind,
    /// Typing sender, for typing entries
    sender: Option<String>,
}

/// Everything a chat window shows
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    status: Option<(String, bool)>,
    users: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event
    ///
    /// Returns the entry it appended, if any.
    pub fn apply(&mut self, event: &Event) -> Option<&Entry> {
        match event {
            Event::Display { text, local } => {
                self.entries.push(Entry {
                    text: text.clone(),
                    local: *local,
                    kind: EntryKind::Message,
                    sender: None,
                });
                self.entries.last()
            }
            Event::Typing { sender } => {
                self.entries
                    .retain(|e| e.kind != EntryKind::Typing || e.sender.as_ref() != Some(sender));
                self.entries.push(Entry {
                    text: format!("{}{}", sender, TYPING_SUFFIX),
                    local: false,
                    kind: EntryKind::Typing,
                    sender: Some(sender.clone()),
                });
                self.entries.last()
            }
            Event::StopTyping => {
                // stopTyping names no sender, so every indicator goes
                self.entries.retain(|e| e.kind != EntryKind::Typing);
                None
            }
            Event::Status { message, is_error } => {
                self.status = Some((message.clone(), *is_error));
                None
            }
            Event::Presence { identities } => {
                self.users = identities.clone();
                None
            }
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Senders currently shown as typing
    pub fn typing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| e.sender.as_deref())
            .collect()
    }

    /// Latest status message and whether it is an error
    pub fn status(&self) -> Option<(&str, bool)> {
        self.status.as_ref().map(|(m, e)| (m.as_str(), *e))
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }
}
