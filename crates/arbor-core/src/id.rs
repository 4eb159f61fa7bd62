//! Identity types for Arbor
//!
//! Sessions are named by the transport (a path segment, a room name), so
//! `SessionId` wraps a string. Listener handles are numbered.

use std::fmt;
use std::sync::Arc;

use crate::{ArborError, ArborResult};

/// Session identity - names one live tree in a registry
///
/// Cheap to clone; the string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Arc<str>);

impl SessionId {
    /// Create a session id, rejecting empty or blank names
    pub fn new(id: impl AsRef<str>) -> ArborResult<Self> {
        let id = id.as_ref();
        if id.trim().is_empty() {
            return Err(ArborError::InvalidSessionId(id.to_string()));
        }
        Ok(SessionId(Arc::from(id)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SessionId {
    type Error = ArborError;

    fn try_from(value: &str) -> ArborResult<Self> {
        SessionId::new(value)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ArborError;

    fn try_from(value: String) -> ArborResult<Self> {
        SessionId::new(value)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listener identity - unique within one registry
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ListenerId(pub u64);

impl ListenerId {
    pub const ZERO: ListenerId = ListenerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        ListenerId(id)
    }

    /// The id following this one
    #[inline]
    pub fn next(self) -> Self {
        ListenerId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({})", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_rejects_blank() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
        assert!(SessionId::try_from("\t\n").is_err());
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new("room-42").unwrap();
        assert_eq!(id.as_str(), "room-42");
        assert_eq!(id.to_string(), "room-42");
        assert_eq!(format!("{:?}", id), "Session(room-42)");

        let same = SessionId::try_from(String::from("room-42")).unwrap();
        assert_eq!(id, same);
    }

    #[test]
    fn test_listener_id_next() {
        let id = ListenerId::ZERO;
        assert_eq!(id.next(), ListenerId::new(1));
        assert_eq!(ListenerId::new(u64::MAX).next(), ListenerId::ZERO);
    }
}
