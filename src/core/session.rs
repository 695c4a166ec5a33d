//! Per-connection session state
//!
//! A session is `Connected` from registration until `disconnect`, after which
//! it is `Disconnected` for good. Its joined rooms and participant aliases are
//! owned here and need no cross-connection locking.

use std::collections::HashSet;
use std::time::Duration;

use crate::core::connection::Connection;
use crate::core::message_types::{Outbound, ServerEvent};
use crate::core::relay::SharedRelay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

pub struct Session {
    pub(crate) relay: SharedRelay,
    pub(crate) connection: Connection,
    /// Rooms joined through `subscribe`
    pub(crate) rooms: HashSet<String>,
    /// Participant identifiers this connection registered
    pub(crate) aliases: HashSet<String>,
    state: SessionState,
}

impl Session {
    pub(crate) fn new(relay: SharedRelay, connection: Connection) -> Self {
        Self {
            relay,
            connection,
            rooms: HashSet::new(),
            aliases: HashSet::new(),
            state: SessionState::Connected,
        }
    }

    /// Connection identifier assigned at connect time
    pub fn id(&self) -> &str {
        &self.connection.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Rooms joined through `subscribe` and not left since
    pub fn joined_rooms(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn connection_duration(&self) -> Duration {
        self.connection.connection_duration()
    }

    /// Tell the client which connection id it was given
    pub fn send_welcome(&self) -> bool {
        self.connection.send_event(&ServerEvent::Connected {
            socket_id: self.connection.id.clone(),
        })
    }

    /// Send an event to this connection only
    pub(crate) fn reply(&self, event: &ServerEvent) -> bool {
        self.connection.send_event(event)
    }

    /// Tear the session down: drop its rate-limit windows, leave every room and
    /// tell the remaining members. Safe to call more than once.
    pub fn disconnect(&mut self, reason: &str) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.state = SessionState::Disconnected;

        let relay = self.relay.clone();
        let timeline = relay.timeline();
        let id = self.connection.id.clone();

        match self.relay.rate_limiter().sweep(&id) {
            Ok(removed) => log::debug!("Swept {} rate-limit windows of {}", removed, id),
            Err(e) => log::error!("Failed to sweep rate-limit windows of {}: {}", id, e),
        }

        let rooms = match self.relay.rooms().remove_client(&id) {
            Ok(rooms) => rooms,
            Err(e) => {
                log::error!("Failed to remove {} from its rooms: {}", id, e);
                Vec::new()
            }
        };

        // The connection's own room has nobody else to notify
        for room in rooms.iter().filter(|room| room.as_str() != id) {
            let notice = Outbound::UserLeft {
                socket_id: id.clone(),
            };
            match self.relay.dispatcher().to_room(room, &id, notice) {
                Ok(count) => log::debug!("userLeft for {} sent to {} in room {}", id, count, room),
                Err(e) => log::warn!("Failed to announce departure of {} to {}: {}", id, room, e),
            }
        }

        if let Err(e) = self.relay.dispatcher().unregister(&id) {
            log::error!("Failed to unregister connection {}: {}", id, e);
        }

        self.rooms.clear();
        drop(timeline);
        log::info!(
            "Client disconnected: {} ({}) after {:?}",
            id,
            reason,
            self.connection_duration()
        );
        match self.relay.connection_count() {
            Ok(count) => log::info!("Current connections: {}", count),
            Err(e) => log::error!("Failed to read connection count: {}", e),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect("session dropped");
    }
}
