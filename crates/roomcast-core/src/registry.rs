//! ConnectionRegistry: owns every live connection and its identity.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use roomcast_protocol::{ANONYMOUS, ConnectionId, DisplayName, RoomName};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

/// One live transport session.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub display_name: Option<DisplayName>,
    pub rooms: BTreeSet<RoomName>,
    /// Registration order, used to keep the presence roster stable.
    pub seq: u64,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    /// Name stamped on outgoing messages.
    pub fn sender_name(&self) -> String {
        self.display_name
            .as_ref()
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    next_seq: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection. A blank initial name counts
    /// as no name.
    pub fn register(&mut self, id: ConnectionId, initial_name: Option<&str>) -> ChatResult<()> {
        if self.connections.contains_key(&id) {
            return Err(ChatError::AlreadyRegistered(id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let connection = Connection {
            id: id.clone(),
            display_name: initial_name.and_then(DisplayName::parse),
            rooms: BTreeSet::new(),
            seq,
            connected_at: Utc::now(),
        };
        debug!("Registered connection {} (seq {})", id, seq);
        self.connections.insert(id, connection);
        Ok(())
    }

    /// Set or replace the display name. Returns `false` for an unknown id.
    pub fn set_display_name(&mut self, id: &ConnectionId, name: DisplayName) -> bool {
        match self.connections.get_mut(id) {
            Some(conn) => {
                conn.display_name = Some(name);
                true
            }
            None => false,
        }
    }

    /// Remove a connection, returning the rooms it belonged to.
    pub fn unregister(&mut self, id: &ConnectionId) -> Vec<RoomName> {
        self.connections
            .remove(id)
            .map(|conn| conn.rooms.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Connections in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        let mut all: Vec<&Connection> = self.connections.values().collect();
        all.sort_by_key(|c| c.seq);
        all.into_iter()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.iter().map(|c| c.id.clone()).collect()
    }

    pub fn record_join(&mut self, id: &ConnectionId, room: &RoomName) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.rooms.insert(room.clone());
        }
    }

    pub fn record_leave(&mut self, id: &ConnectionId, room: &RoomName) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.rooms.remove(room);
        }
    }
}
