//! Client connection state tracking.

use std::time::{Duration, Instant};

use roomcast_protocol::ConnectionId;

/// Transport-side view of a connected client.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,
    /// When the client connected
    pub connected_at: Instant,
    /// Last time we received any frame (including pongs) from this client
    pub last_activity: Instant,
}

impl ClientConnection {
    pub fn new(id: ConnectionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            connected_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Nothing heard for longer than `timeout`.
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}
