//! PresenceDirectory: read-only view of who is connected.

use roomcast_protocol::PresenceEntry;

use crate::registry::ConnectionRegistry;

/// Derived on demand from the registry; holds no state of its own.
pub struct PresenceDirectory<'a> {
    registry: &'a ConnectionRegistry,
}

impl<'a> PresenceDirectory<'a> {
    pub fn new(registry: &'a ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Every registered connection, named or not, in connect order.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        self.registry
            .iter()
            .map(|conn| PresenceEntry {
                id: conn.id.clone(),
                display_name: conn.display_name.clone(),
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }
}
