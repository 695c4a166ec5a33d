use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{RelayError, Result};

/// Both directions of the membership relation, guarded together so a join or
/// leave is never observed half-applied.
#[derive(Debug, Default)]
struct Memberships {
    /// Room id -> connection ids. A room exists iff its set is non-empty.
    rooms: HashMap<String, HashSet<String>>,
    /// Connection id -> room ids it belongs to
    client_rooms: HashMap<String, HashSet<String>>,
}

impl Memberships {
    fn size(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, HashSet::len)
    }

    fn is_member(&self, client_id: &str, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(client_id))
    }

    fn insert(&mut self, client_id: &str, room_id: &str) -> usize {
        let members = self.rooms.entry(room_id.to_string()).or_default();
        members.insert(client_id.to_string());
        let size = members.len();

        self.client_rooms
            .entry(client_id.to_string())
            .or_default()
            .insert(room_id.to_string());

        size
    }

    fn remove(&mut self, client_id: &str, room_id: &str) -> Option<usize> {
        let members = self.rooms.get_mut(room_id)?;
        if !members.remove(client_id) {
            return None;
        }
        let remaining = members.len();
        if remaining == 0 {
            self.rooms.remove(room_id);
        }

        if let Some(rooms) = self.client_rooms.get_mut(client_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.client_rooms.remove(client_id);
            }
        }

        Some(remaining)
    }
}

/// Authoritative mapping of rooms to the connections inside them
///
/// The registry only records membership; it never owns a connection.
pub struct RoomRegistry {
    inner: Mutex<Memberships>,
    max_room_size: usize,
}

impl RoomRegistry {
    pub fn new(max_room_size: usize) -> Self {
        Self {
            inner: Mutex::new(Memberships::default()),
            max_room_size,
        }
    }

    /// Maximum number of members per room
    pub fn capacity(&self) -> usize {
        self.max_room_size
    }

    /// Adds a client to a room, returning the room size afterwards.
    /// Joining a room twice is a successful no-op.
    pub fn join(&self, client_id: &str, room_id: &str) -> Result<usize> {
        let mut sizes = self.join_all(client_id, &[room_id])?;
        Ok(sizes.pop().unwrap_or(0))
    }

    /// Adds a client to several rooms atomically: either every room has space
    /// (or already contains the client) and all joins apply, or none do.
    pub fn join_all(&self, client_id: &str, room_ids: &[&str]) -> Result<Vec<usize>> {
        let mut inner = self.inner.lock()?;

        for room_id in room_ids {
            if !inner.is_member(client_id, room_id) && inner.size(room_id) >= self.max_room_size {
                return Err(RelayError::RoomFull {
                    room: room_id.to_string(),
                    capacity: self.max_room_size,
                });
            }
        }

        Ok(room_ids
            .iter()
            .map(|room_id| inner.insert(client_id, room_id))
            .collect())
    }

    /// Removes a client from a room. Returns the remaining size, or `None` if
    /// the client was not a member.
    pub fn leave(&self, client_id: &str, room_id: &str) -> Result<Option<usize>> {
        let mut inner = self.inner.lock()?;
        Ok(inner.remove(client_id, room_id))
    }

    /// Removes a client from every room (e.g., on disconnect), returning the
    /// rooms it was in
    pub fn remove_client(&self, client_id: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock()?;
        let rooms: Vec<String> = inner
            .client_rooms
            .get(client_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();

        for room_id in &rooms {
            inner.remove(client_id, room_id);
        }

        Ok(rooms)
    }

    /// Gets all members of a room
    pub fn members(&self, room_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Gets all members of a room except the given client
    pub fn members_except(&self, room_id: &str, client_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .rooms
            .get(room_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|member| member.as_str() != client_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Number of members in a room; 0 for unknown rooms
    pub fn size(&self, room_id: &str) -> Result<usize> {
        Ok(self.inner.lock()?.size(room_id))
    }

    /// Gets all rooms a client is in
    pub fn client_rooms(&self, client_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock()?;
        Ok(inner
            .client_rooms
            .get(client_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Check if a client is in a specific room
    pub fn is_member(&self, client_id: &str, room_id: &str) -> Result<bool> {
        Ok(self.inner.lock()?.is_member(client_id, room_id))
    }

    /// Number of rooms with at least one member
    pub fn room_count(&self) -> Result<usize> {
        Ok(self.inner.lock()?.rooms.len())
    }
}
