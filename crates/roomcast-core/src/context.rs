//! ChatContext: the registry and the room manager, kept in step.
//!
//! Every operation that touches both (join, leave, disconnect) lives here so
//! that a connection's room set and the rooms' member lists can never drift
//! apart. Callers hold the context under one lock for the whole operation.

use chrono::Utc;
use roomcast_protocol::{ChatMessage, ConnectionId, DisplayName, RoomName};
use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::presence::PresenceDirectory;
use crate::registry::{Connection, ConnectionRegistry};
use crate::rooms::{JoinOutcome, LeaveOutcome, RoomManager};

/// Chat behavior settings.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Per-room history cap; `None` keeps everything
    pub history_limit: Option<usize>,
    /// Longest accepted message text in characters; 0 disables the check
    pub max_text_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            max_text_length: 2000,
        }
    }
}

/// Process-wide message id source.
#[derive(Debug)]
pub struct MessageSequence {
    next: u64,
}

impl MessageSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for MessageSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// A room the connection left, and what happened to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomName,
    pub outcome: LeaveOutcome,
}

pub struct ChatContext {
    registry: ConnectionRegistry,
    rooms: RoomManager,
    messages: MessageSequence,
}

impl ChatContext {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomManager::new(config.history_limit),
            messages: MessageSequence::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn presence(&self) -> PresenceDirectory<'_> {
        PresenceDirectory::new(&self.registry)
    }

    pub fn connection(&self, id: &ConnectionId) -> ChatResult<&Connection> {
        self.registry
            .get(id)
            .ok_or_else(|| ChatError::UnknownConnection(id.clone()))
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub fn connect(&mut self, id: ConnectionId, initial_name: Option<&str>) -> ChatResult<()> {
        self.registry.register(id, initial_name)
    }

    /// Remove a connection and every membership it held. `None` if the id
    /// was not registered, so cleanup never runs twice.
    pub fn disconnect(&mut self, id: &ConnectionId) -> Option<Vec<Departure>> {
        if !self.registry.contains(id) {
            return None;
        }

        let departures = self
            .registry
            .unregister(id)
            .into_iter()
            .map(|room| {
                let outcome = self.rooms.leave_room(id, &room);
                Departure { room, outcome }
            })
            .collect();
        Some(departures)
    }

    pub fn set_display_name(&mut self, id: &ConnectionId, raw: &str) -> ChatResult<DisplayName> {
        let name = DisplayName::parse(raw).ok_or(ChatError::InvalidDisplayName)?;
        if self.registry.set_display_name(id, name.clone()) {
            Ok(name)
        } else {
            Err(ChatError::UnknownConnection(id.clone()))
        }
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn join(&mut self, id: &ConnectionId, raw_room: &str) -> ChatResult<JoinOutcome> {
        self.connection(id)?;
        let room = RoomName::parse(raw_room).ok_or(ChatError::InvalidRoomName)?;
        let outcome = self.rooms.join_room(id, &room);
        self.registry.record_join(id, &room);
        Ok(outcome)
    }

    pub fn create(&mut self, id: &ConnectionId, raw_room: &str) -> ChatResult<JoinOutcome> {
        self.connection(id)?;
        let room = RoomName::parse(raw_room).ok_or(ChatError::InvalidRoomName)?;
        let outcome = self.rooms.create_room(id, &room)?;
        self.registry.record_join(id, &room);
        Ok(outcome)
    }

    pub fn leave(&mut self, id: &ConnectionId, raw_room: &str) -> ChatResult<Departure> {
        self.connection(id)?;
        let room = RoomName::parse(raw_room).ok_or(ChatError::InvalidRoomName)?;
        let outcome = self.rooms.leave_room(id, &room);
        self.registry.record_leave(id, &room);
        Ok(Departure { room, outcome })
    }

    /// Leave every room the connection is in.
    pub fn leave_all(&mut self, id: &ConnectionId) -> ChatResult<Vec<Departure>> {
        let rooms: Vec<RoomName> = self.connection(id)?.rooms.iter().cloned().collect();
        Ok(rooms
            .into_iter()
            .map(|room| {
                let outcome = self.rooms.leave_room(id, &room);
                self.registry.record_leave(id, &room);
                Departure { room, outcome }
            })
            .collect())
    }

    /// History of a room the connection belongs to.
    pub fn history(
        &self,
        id: &ConnectionId,
        raw_room: &str,
    ) -> ChatResult<(RoomName, Vec<ChatMessage>)> {
        self.connection(id)?;
        let room = RoomName::parse(raw_room).ok_or(ChatError::InvalidRoomName)?;
        let history = self.rooms.get_history(&room)?;
        if !self.rooms.is_member(&room, id) {
            return Err(ChatError::NotAMember(room));
        }
        Ok((room, history))
    }

    // ── Messaging ───────────────────────────────────────────────────────

    pub fn post_public(&mut self, id: &ConnectionId, text: &str) -> ChatResult<ChatMessage> {
        let sender_name = self.connection(id)?.sender_name();
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }

        Ok(ChatMessage {
            id: self.messages.next_id(),
            text: text.to_string(),
            sender_id: id.clone(),
            sender_name,
            timestamp: Utc::now(),
            room_name: None,
            target_id: None,
        })
    }

    pub fn post_room(
        &mut self,
        id: &ConnectionId,
        raw_room: &str,
        text: &str,
    ) -> ChatResult<ChatMessage> {
        let sender_name = self.connection(id)?.sender_name();
        if text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }
        let room = RoomName::parse(raw_room).ok_or(ChatError::InvalidRoomName)?;
        self.rooms
            .post_message(id, &sender_name, &room, text, &mut self.messages)
    }

    /// Direct message. Checked in order: empty text, self target, offline target.
    pub fn post_private(
        &mut self,
        id: &ConnectionId,
        target: &ConnectionId,
        text: &str,
    ) -> ChatResult<ChatMessage> {
        let sender_name = self.connection(id)?.sender_name();
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::DmEmptyText);
        }
        if target == id {
            return Err(ChatError::DmSelfTarget);
        }
        if !self.registry.contains(target) {
            debug!("Private message from {} to offline {}", id, target);
            return Err(ChatError::DmTargetOffline(target.clone()));
        }

        Ok(ChatMessage {
            id: self.messages.next_id(),
            text: text.to_string(),
            sender_id: id.clone(),
            sender_name,
            timestamp: Utc::now(),
            room_name: None,
            target_id: Some(target.clone()),
        })
    }
}
