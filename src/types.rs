//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `Identity`: display name a connection registers with

use uuid::Uuid;

/// Identity assigned when a peer declares an empty name
pub const ANONYMOUS: &str = "Anonymous";

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 so that two connections declaring the same
/// display name are still distinct registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name of a connection
///
/// Never empty: blank input falls back to [`ANONYMOUS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Build an identity from the first line a peer sends
    pub fn from_line(line: &str) -> Self {
        let name = line.trim();
        if name.is_empty() {
            Self(ANONYMOUS.to_string())
        } else {
            Self(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
