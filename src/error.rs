use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

use crate::core::message_types::EventKind;
use crate::core::validator::Rejection;

#[derive(Debug)]
pub enum RelayError {
    // Admission errors
    ValidationRejected(Rejection),
    RateLimited { event: EventKind },
    RoomFull { room: String, capacity: usize },

    // Messages errors
    MessageParseError(String),
    MessageTooLarge(usize),
    UnknownEvent(String),
    SerializationError(String),

    // Connections errors
    ConnectionClosed(String),

    // System errors
    LockPoisoned(String),

    // Configuration errors
    ConfigError(String),
}

impl RelayError {
    /// Text of the `error` event sent back to the client, if this error may be
    /// surfaced at all. Internal faults never leave the server.
    pub fn client_message(&self) -> Option<String> {
        match self {
            Self::ValidationRejected(reason) => Some(format!("Invalid request: {}", reason)),
            Self::RateLimited { .. } => {
                Some("Rate limit exceeded. Please slow down.".to_string())
            }
            Self::RoomFull { room, capacity } => Some(format!(
                "Room {} is full (maximum {} participants)",
                room, capacity
            )),
            _ => None,
        }
    }

    /// Whether this error is an expected admission outcome rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationRejected(_) | Self::RateLimited { .. } | Self::RoomFull { .. }
        )
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationRejected(reason) => write!(f, "Validation rejected: {}", reason),
            Self::RateLimited { event } => write!(f, "Rate limited on event '{}'", event),
            Self::RoomFull { room, capacity } => {
                write!(f, "Room {} is full ({} members)", room, capacity)
            }
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::UnknownEvent(name) => write!(f, "Unknown event: {}", name),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::ConnectionClosed(id) => write!(f, "Connection closed: {}", id),
            Self::LockPoisoned(msg) => write!(f, "Lock poisoned: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RelayError {}

impl From<Rejection> for RelayError {
    fn from(reason: Rejection) -> Self {
        RelayError::ValidationRejected(reason)
    }
}

// Converting from PoisonError to facilitate poisoned lock handling
impl<T> From<PoisonError<T>> for RelayError {
    fn from(err: PoisonError<T>) -> Self {
        RelayError::LockPoisoned(err.to_string())
    }
}

// Generic result type for the relay
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_faults_are_not_surfaced() {
        assert!(RelayError::LockPoisoned("rooms".into()).client_message().is_none());
        assert!(RelayError::MessageParseError("eof".into()).client_message().is_none());
        assert!(!RelayError::ConnectionClosed("abc".into()).is_rejection());
    }

    #[test]
    fn test_room_full_message_names_room_and_capacity() {
        let err = RelayError::RoomFull { room: "r1".into(), capacity: 2 };
        assert!(err.is_rejection());
        assert_eq!(
            err.client_message().as_deref(),
            Some("Room r1 is full (maximum 2 participants)")
        );
    }
}
