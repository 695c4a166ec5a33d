//! Core functionality of the signaling relay

pub mod connection;
pub mod dispatcher;
pub mod message_handler;
pub mod message_types;
pub mod rate_limiter;
pub mod relay;
pub mod room;
pub mod session;
pub mod validator;

// Re-export main components for convenience
pub use connection::Connection;
pub use dispatcher::Dispatcher;
pub use message_types::{EventKind, Outbound, ServerEvent};
pub use rate_limiter::EventRateLimiter;
pub use relay::{Relay, SharedRelay};
pub use room::RoomRegistry;
pub use session::{Session, SessionState};
pub use validator::Rejection;
