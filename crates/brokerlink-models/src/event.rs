//! Session lifecycle events delivered by the underlying broker client.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// The connection dropped and the client is about to retry.
    Reconnecting,
    /// The session is (re)established.
    Up,
    /// The session went down and will not recover on its own.
    DownError,
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reconnecting => "RECONNECTING",
            Self::Up => "UP",
            Self::DownError => "DOWN_ERROR",
        })
    }
}

/// A session event plus the client's diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectEvent {
    /// Event kind.
    pub kind: SessionEventKind,
    /// Free-form diagnostic info from the client.
    pub info: String,
}

impl ReconnectEvent {
    /// Build an event of the given kind.
    pub fn new(kind: SessionEventKind, info: impl Into<String>) -> Self {
        Self {
            kind,
            info: info.into(),
        }
    }

    /// Shorthand for a [`SessionEventKind::Reconnecting`] event.
    pub fn reconnecting(info: impl Into<String>) -> Self {
        Self::new(SessionEventKind::Reconnecting, info)
    }

    /// Shorthand for a [`SessionEventKind::Up`] event.
    pub fn up(info: impl Into<String>) -> Self {
        Self::new(SessionEventKind::Up, info)
    }

    /// Shorthand for a [`SessionEventKind::DownError`] event.
    pub fn down_error(info: impl Into<String>) -> Self {
        Self::new(SessionEventKind::DownError, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_matches_wire_names() {
        assert_eq!(SessionEventKind::Reconnecting.to_string(), "RECONNECTING");
        assert_eq!(SessionEventKind::DownError.to_string(), "DOWN_ERROR");
        assert_eq!(
            serde_json::to_string(&SessionEventKind::DownError).unwrap(),
            "\"DOWN_ERROR\""
        );
    }

    #[test]
    fn shorthands_set_kind() {
        assert_eq!(
            ReconnectEvent::reconnecting("x").kind,
            SessionEventKind::Reconnecting
        );
        assert_eq!(ReconnectEvent::up("x").kind, SessionEventKind::Up);
        assert_eq!(ReconnectEvent::down_error("y").info, "y");
    }
}
