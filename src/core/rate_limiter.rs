//! Rate limiting module to prevent abuse
//!
//! Fixed windows keyed by (connection, event type). A window opens on the first
//! event of its key and admits up to `max_events` events until its reset time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::message_types::EventKind;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    connection_id: String,
    event: EventKind,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Rate limiter for inbound events per connection and event type
pub struct EventRateLimiter {
    windows: Mutex<HashMap<WindowKey, Window>>,
    window_duration: Duration,
    max_events: u32,
}

impl EventRateLimiter {
    pub fn new(window_duration: Duration, max_events: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_duration,
            max_events,
        }
    }

    /// Check if a connection may emit another event of this type
    pub fn admit(&self, connection_id: &str, event: EventKind) -> Result<bool> {
        self.admit_at(connection_id, event, Instant::now())
    }

    /// Same as [`admit`](Self::admit) with an explicit clock reading
    pub fn admit_at(&self, connection_id: &str, event: EventKind, now: Instant) -> Result<bool> {
        let mut windows = self.windows.lock()?;
        let key = WindowKey {
            connection_id: connection_id.to_string(),
            event,
        };

        let fresh = Window {
            count: 1,
            reset_at: now + self.window_duration,
        };

        match windows.get_mut(&key) {
            None => {
                windows.insert(key, fresh);
                Ok(true)
            }
            Some(window) if now >= window.reset_at => {
                *window = fresh;
                Ok(true)
            }
            Some(window) if window.count >= self.max_events => Ok(false),
            Some(window) => {
                window.count += 1;
                Ok(true)
            }
        }
    }

    /// Drop every window owned by a connection, returning how many were removed
    pub fn sweep(&self, connection_id: &str) -> Result<usize> {
        let mut windows = self.windows.lock()?;
        let before = windows.len();
        windows.retain(|key, _| key.connection_id != connection_id);
        Ok(before - windows.len())
    }

    /// Drop windows that have already expired. An expired window would be
    /// replaced on the next event anyway, so this only reclaims memory.
    pub fn purge_expired(&self, now: Instant) -> Result<usize> {
        let mut windows = self.windows.lock()?;
        let before = windows.len();
        windows.retain(|_, window| now < window.reset_at);
        Ok(before - windows.len())
    }

    /// Number of live windows owned by a connection
    pub fn window_count(&self, connection_id: &str) -> Result<usize> {
        let windows = self.windows.lock()?;
        Ok(windows
            .keys()
            .filter(|key| key.connection_id == connection_id)
            .count())
    }

    /// Number of tracked windows across all connections
    pub fn tracked_windows(&self) -> Result<usize> {
        Ok(self.windows.lock()?.len())
    }

    /// Start cleanup task for idle windows
    pub fn start_cleanup_task(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match self.purge_expired(Instant::now()) {
                    Ok(0) => {}
                    Ok(removed) => log::debug!("Purged {} expired rate-limit windows", removed),
                    Err(e) => log::error!("Rate-limit cleanup failed: {}", e),
                }
            }
        })
    }
}
