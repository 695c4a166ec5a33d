//! Relay service that coordinates connections, rooms and rate limits

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::config::RelayLimits;
use crate::core::connection::Connection;
use crate::core::dispatcher::Dispatcher;
use crate::core::rate_limiter::EventRateLimiter;
use crate::core::room::RoomRegistry;
use crate::core::session::Session;
use crate::error::Result;

/// Shared state of the relay: room membership, rate-limit windows and the
/// send handles of live connections
pub struct Relay {
    limits: RelayLimits,
    rooms: Arc<RoomRegistry>,
    rate_limiter: Arc<EventRateLimiter>,
    dispatcher: Dispatcher,
    /// Held for the whole of each handler so that membership changes, target
    /// resolution and hand-off form one step on a single event timeline
    timeline: Mutex<()>,
}

pub type SharedRelay = Arc<Relay>;

impl Relay {
    /// Create a new relay
    pub fn new(limits: RelayLimits) -> Self {
        let rooms = Arc::new(RoomRegistry::new(limits.max_room_size));
        let rate_limiter = Arc::new(EventRateLimiter::new(
            limits.rate_limit_window,
            limits.rate_limit_max_events,
        ));

        Self {
            dispatcher: Dispatcher::new(rooms.clone()),
            limits,
            rooms,
            rate_limiter,
            timeline: Mutex::new(()),
        }
    }

    /// Create a relay ready to be shared between connection tasks
    pub fn shared(limits: RelayLimits) -> SharedRelay {
        Arc::new(Self::new(limits))
    }

    /// Register a new connection and return its session.
    ///
    /// The connection joins a room named after its own id so it is directly
    /// addressable before it subscribes anywhere.
    pub fn connect(self: &Arc<Self>, sender: mpsc::UnboundedSender<WsMessage>) -> Result<Session> {
        let connection = Connection::new(sender);
        let _timeline = self.timeline();
        self.dispatcher.register(&connection)?;

        if let Err(e) = self.rooms.join(&connection.id, &connection.id) {
            // Undo the registration so a failed connect leaves nothing behind
            self.dispatcher.unregister(&connection.id)?;
            return Err(e);
        }

        log::info!("Client connected: {}", connection.id);
        Ok(Session::new(self.clone(), connection))
    }

    /// Enter the event timeline. Handlers of all connections run one at a
    /// time while the guard is held.
    pub(crate) fn timeline(&self) -> MutexGuard<'_, ()> {
        // The lock guards no data, so a poisoned guard is still sound
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limits(&self) -> &RelayLimits {
        &self.limits
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn rate_limiter(&self) -> &EventRateLimiter {
        &self.rate_limiter
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // Get current connections count
    pub fn connection_count(&self) -> Result<usize> {
        self.dispatcher.connection_count()
    }

    /// Number of members in a room; 0 for unknown rooms
    pub fn room_size(&self, room_id: &str) -> Result<usize> {
        self.rooms.size(room_id)
    }

    /// Start cleanup task for idle rate-limit windows
    pub fn start_cleanup_task(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        self.rate_limiter.clone().start_cleanup_task(period)
    }
}
