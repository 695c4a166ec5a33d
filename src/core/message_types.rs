//! Wire types for the signaling protocol
//!
//! Every frame is a JSON object `{ "event": <name>, "data": <payload> }`.
//! Inbound payloads stay as raw JSON until the validator turns them into typed
//! requests; outbound events are fully typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Inbound event names understood by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Subscribe,
    NewUserStart,
    Sdp,
    IceCandidates,
    Chat,
    LeaveRoom,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Subscribe,
        EventKind::NewUserStart,
        EventKind::Sdp,
        EventKind::IceCandidates,
        EventKind::Chat,
        EventKind::LeaveRoom,
    ];

    /// Name of the event on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Subscribe => "subscribe",
            EventKind::NewUserStart => "newUserStart",
            EventKind::Sdp => "sdp",
            EventKind::IceCandidates => "ice candidates",
            EventKind::Chat => "chat",
            EventKind::LeaveRoom => "leaveRoom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }

    /// User-initiated actions report rejections back to the sender; signaling
    /// primitives are fire-and-forget and fail silently.
    pub fn surfaces_errors(&self) -> bool {
        matches!(self, EventKind::Subscribe | EventKind::Chat)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound frame before validation
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// A relayed payload that has not yet been stamped with a server timestamp
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    NewUser { socket_id: String },
    UserLeft { socket_id: String },
    NewUserStart { sender: String },
    Sdp { description: Value, sender: String },
    IceCandidates { candidate: Value, sender: String },
    Chat { sender: String, msg: String },
}

impl Outbound {
    /// Attach the server-side timestamp (milliseconds since epoch)
    pub fn stamp(self, timestamp: i64) -> ServerEvent {
        match self {
            Outbound::NewUser { socket_id } => ServerEvent::NewUser { socket_id, timestamp },
            Outbound::UserLeft { socket_id } => ServerEvent::UserLeft { socket_id, timestamp },
            Outbound::NewUserStart { sender } => ServerEvent::NewUserStart { sender, timestamp },
            Outbound::Sdp { description, sender } => ServerEvent::Sdp {
                description,
                sender,
                timestamp,
            },
            Outbound::IceCandidates { candidate, sender } => ServerEvent::IceCandidates {
                candidate,
                sender,
                timestamp,
            },
            Outbound::Chat { sender, msg } => ServerEvent::Chat {
                sender,
                msg,
                timestamp,
            },
        }
    }
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Connection established; tells the client its connection id
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "socketId")]
        socket_id: String,
    },

    #[serde(rename = "new user")]
    NewUser {
        #[serde(rename = "socketId")]
        socket_id: String,
        timestamp: i64,
    },

    #[serde(rename = "userLeft")]
    UserLeft {
        #[serde(rename = "socketId")]
        socket_id: String,
        timestamp: i64,
    },

    #[serde(rename = "newUserStart")]
    NewUserStart { sender: String, timestamp: i64 },

    #[serde(rename = "sdp")]
    Sdp {
        description: Value,
        sender: String,
        timestamp: i64,
    },

    #[serde(rename = "ice candidates")]
    IceCandidates {
        candidate: Value,
        sender: String,
        timestamp: i64,
    },

    #[serde(rename = "chat")]
    Chat {
        sender: String,
        msg: String,
        timestamp: i64,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
