//! Relay dispatcher
//!
//! Resolves a target (participant alias or room) to connections through the
//! room registry and hands each one a server-stamped event.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::core::connection::Connection;
use crate::core::message_types::Outbound;
use crate::core::room::RoomRegistry;
use crate::error::{RelayError, Result};

/// Milliseconds since the Unix epoch, as stamped on relayed events
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Dispatcher {
    rooms: Arc<RoomRegistry>,
    /// Send handle of every live connection
    outbound: RwLock<HashMap<String, mpsc::UnboundedSender<WsMessage>>>,
}

impl Dispatcher {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self {
            rooms,
            outbound: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection's send handle
    pub fn register(&self, connection: &Connection) -> Result<()> {
        self.outbound
            .write()?
            .insert(connection.id.clone(), connection.sender.clone());
        Ok(())
    }

    /// Remove a connection's send handle
    pub fn unregister(&self, connection_id: &str) -> Result<bool> {
        Ok(self.outbound.write()?.remove(connection_id).is_some())
    }

    // Get current connections count
    pub fn connection_count(&self) -> Result<usize> {
        Ok(self.outbound.read()?.len())
    }

    /// Send to everyone addressable under a participant identifier. The sender
    /// is never excluded: a direct send always targets someone else.
    pub fn to_participant(&self, target: &str, payload: Outbound) -> Result<usize> {
        let recipients = self.rooms.members(target)?;
        if recipients.is_empty() {
            log::debug!("No connection reachable as participant {}", target);
        }
        self.deliver(&recipients, payload)
    }

    /// Send to every member of a room except the originating connection
    pub fn to_room(&self, room_id: &str, exclude: &str, payload: Outbound) -> Result<usize> {
        let recipients = self.rooms.members_except(room_id, exclude)?;
        self.deliver(&recipients, payload)
    }

    fn deliver(&self, recipients: &[String], payload: Outbound) -> Result<usize> {
        if recipients.is_empty() {
            return Ok(0);
        }

        // Stamped here, immediately before hand-off
        let event = payload.stamp(now_millis());
        let text = serde_json::to_string(&event)
            .map_err(|e| RelayError::SerializationError(e.to_string()))?;

        let outbound = self.outbound.read()?;
        let mut delivered = 0;
        for recipient in recipients {
            match outbound.get(recipient) {
                Some(sender) => {
                    if sender.send(WsMessage::text(text.clone())).is_ok() {
                        log::trace!("Event relayed to connection {}", recipient);
                        delivered += 1;
                    } else {
                        log::warn!("Failed to relay event to connection {}", recipient);
                    }
                }
                None => log::debug!("Connection {} has no send handle", recipient),
            }
        }

        Ok(delivered)
    }
}
