//! RoomManager: named rooms, their members and their message history.
//!
//! A room exists exactly while it has at least one member. It is created by
//! the first join (or an explicit create) and removed in the same call that
//! removes its last member.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use roomcast_protocol::{ChatMessage, ConnectionId, RoomName};
use tracing::info;

use crate::context::MessageSequence;
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Default)]
struct Room {
    /// Join order
    members: Vec<ConnectionId>,
    history: VecDeque<ChatMessage>,
}

impl Room {
    fn has_member(&self, id: &ConnectionId) -> bool {
        self.members.iter().any(|m| m == id)
    }
}

/// What a joiner sees: the member list and the history so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    pub name: RoomName,
    pub members: Vec<ConnectionId>,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The room did not exist before this call.
    pub created: bool,
    /// The connection was not already a member.
    pub newly_joined: bool,
    pub state: RoomState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    NotMember,
    Left { remaining: Vec<ConnectionId> },
    /// The leaver was the last member and the room is gone.
    Deleted,
}

impl LeaveOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: BTreeMap<RoomName, Room>,
    history_limit: Option<usize>,
}

impl RoomManager {
    /// `history_limit` caps each room's history; `None` (or zero) keeps everything.
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            rooms: BTreeMap::new(),
            history_limit: history_limit.filter(|n| *n > 0),
        }
    }

    /// Room names in lexicographic order.
    pub fn list_rooms(&self) -> Vec<RoomName> {
        self.rooms.keys().cloned().collect()
    }

    pub fn contains(&self, room: &RoomName) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn members(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomName, id: &ConnectionId) -> bool {
        self.rooms.get(room).is_some_and(|r| r.has_member(id))
    }

    /// Join a room, creating it if needed. Joining twice is a no-op apart
    /// from returning the current state again.
    pub fn join_room(&mut self, id: &ConnectionId, room: &RoomName) -> JoinOutcome {
        let created = !self.rooms.contains_key(room);
        let entry = self.rooms.entry(room.clone()).or_default();

        let newly_joined = !entry.has_member(id);
        if newly_joined {
            entry.members.push(id.clone());
        }
        if created {
            info!("Room created: {}", room);
        }

        JoinOutcome {
            created,
            newly_joined,
            state: RoomState {
                name: room.clone(),
                members: entry.members.clone(),
                history: entry.history.iter().cloned().collect(),
            },
        }
    }

    /// Create a room that must not exist yet, with `id` as its first member.
    pub fn create_room(&mut self, id: &ConnectionId, room: &RoomName) -> ChatResult<JoinOutcome> {
        if self.rooms.contains_key(room) {
            return Err(ChatError::RoomExists(room.clone()));
        }
        Ok(self.join_room(id, room))
    }

    /// Leave a room. Unknown rooms and non-members are a no-op.
    pub fn leave_room(&mut self, id: &ConnectionId, room: &RoomName) -> LeaveOutcome {
        let Some(entry) = self.rooms.get_mut(room) else {
            return LeaveOutcome::NotMember;
        };
        let Some(pos) = entry.members.iter().position(|m| m == id) else {
            return LeaveOutcome::NotMember;
        };

        entry.members.remove(pos);
        if entry.members.is_empty() {
            self.rooms.remove(room);
            info!("Room deleted: {}", room);
            LeaveOutcome::Deleted
        } else {
            LeaveOutcome::Left {
                remaining: entry.members.clone(),
            }
        }
    }

    /// Append a message to a room's history. The sender must be a member;
    /// posting never creates a room.
    pub fn post_message(
        &mut self,
        sender_id: &ConnectionId,
        sender_name: &str,
        room: &RoomName,
        text: &str,
        sequence: &mut MessageSequence,
    ) -> ChatResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }

        let entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| ChatError::RoomNotFound(room.clone()))?;
        if !entry.has_member(sender_id) {
            return Err(ChatError::NotAMember(room.clone()));
        }

        let message = ChatMessage {
            id: sequence.next_id(),
            text: text.to_string(),
            sender_id: sender_id.clone(),
            sender_name: sender_name.to_string(),
            timestamp: Utc::now(),
            room_name: Some(room.clone()),
            target_id: None,
        };

        entry.history.push_back(message.clone());
        if let Some(limit) = self.history_limit {
            while entry.history.len() > limit {
                entry.history.pop_front();
            }
        }

        Ok(message)
    }

    /// Snapshot of a room's history, oldest first.
    pub fn get_history(&self, room: &RoomName) -> ChatResult<Vec<ChatMessage>> {
        self.rooms
            .get(room)
            .map(|r| r.history.iter().cloned().collect())
            .ok_or_else(|| ChatError::RoomNotFound(room.clone()))
    }
}
