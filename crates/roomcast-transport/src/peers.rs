//! Outbound delivery to individual connections.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use roomcast_protocol::ConnectionId;
use tokio::sync::mpsc;

pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Somewhere to push an encoded frame for one connection.
///
/// Delivery must not block: it is called while the chat state is locked.
pub trait Outbox: Send + Sync + 'static {
    /// Queue `frame` for `to`. Returns `false` if the connection is gone.
    fn deliver(&self, to: &ConnectionId, frame: &str) -> bool;
}

impl<T: Outbox> Outbox for Arc<T> {
    fn deliver(&self, to: &ConnectionId, frame: &str) -> bool {
        (**self).deliver(to, frame)
    }
}

/// Live connections and their outbound queues. The socket task owning each
/// queue drains it onto the WebSocket.
#[derive(Clone, Default)]
pub struct PeerTable {
    peers: Arc<DashMap<ConnectionId, ConnectionSender>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ConnectionId, tx: ConnectionSender) {
        self.peers.insert(id, tx);
    }

    pub fn remove(&self, id: &ConnectionId) {
        self.peers.remove(id);
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Outbox for PeerTable {
    fn deliver(&self, to: &ConnectionId, frame: &str) -> bool {
        match self.peers.get(to) {
            Some(tx) => tx.send(Message::Text(frame.to_owned().into())).is_ok(),
            None => false,
        }
    }
}
