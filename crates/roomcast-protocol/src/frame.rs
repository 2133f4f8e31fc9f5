//! Frame encoding: `{"event": "<name>", "data": { ... }}`.
//!
//! Inbound frames are decoded in two steps: first the envelope ([`Frame`]),
//! then the payload for the named event ([`ClientEvent`]). Splitting the two
//! lets the router tell an unknown event apart from a known event with a bad
//! payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::EventError;
use crate::events::{ClientEvents, EventName, ServerEvents};
use crate::types::{ChatMessage, ConnectionId, DisplayName, PresenceEntry, RoomName};

/// Raw frame envelope, before the payload is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Parse a text frame into its envelope.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        serde_json::from_str(text).map_err(|e| EventError::malformed(format!("Invalid frame: {e}")))
    }

    /// Interpret the payload according to the event name.
    pub fn into_client_event(self) -> Result<ClientEvent, EventError> {
        if !ClientEvents::is_known(&self.event) {
            return Err(EventError::unknown_event(&self.event));
        }

        let tagged = match self.data {
            Some(data) if !data.is_null() && ClientEvents::takes_payload(&self.event) => {
                json!({ "event": self.event, "data": data })
            }
            _ => json!({ "event": self.event }),
        };

        serde_json::from_value(tagged).map_err(|e| {
            EventError::malformed(format!("Invalid payload for {}: {e}", self.event))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded inbound event.
///
/// Text and names are carried exactly as received; trimming and validation
/// belong to the handlers so that a blank value can be reported with the
/// right error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    SetDisplayName {
        name: String,
    },
    Message {
        text: String,
    },
    RoomMessage {
        room_name: String,
        text: String,
    },
    PrivateMessage {
        target_id: ConnectionId,
        text: String,
    },
    Typing {
        display_name: String,
        room_name: Option<String>,
    },
    StopTyping {
        display_name: Option<String>,
        room_name: Option<String>,
    },
    JoinRoom {
        room_name: String,
    },
    LeaveRoom {
        room_name: String,
    },
    CreateRoom {
        room_name: String,
    },
    ListRooms,
    RoomHistory {
        room_name: String,
    },
    ListUsers,
    ConnectionState,
}

impl ClientEvent {
    /// Decode a text frame straight into an event.
    pub fn decode(text: &str) -> Result<Self, EventError> {
        Frame::parse(text)?.into_client_event()
    }

    pub fn name(&self) -> EventName {
        match self {
            Self::SetDisplayName { .. } => ClientEvents::SET_DISPLAY_NAME,
            Self::Message { .. } => ClientEvents::MESSAGE,
            Self::RoomMessage { .. } => ClientEvents::ROOM_MESSAGE,
            Self::PrivateMessage { .. } => ClientEvents::PRIVATE_MESSAGE,
            Self::Typing { .. } => ClientEvents::TYPING,
            Self::StopTyping { .. } => ClientEvents::STOP_TYPING,
            Self::JoinRoom { .. } => ClientEvents::JOIN_ROOM,
            Self::LeaveRoom { .. } => ClientEvents::LEAVE_ROOM,
            Self::CreateRoom { .. } => ClientEvents::CREATE_ROOM,
            Self::ListRooms => ClientEvents::LIST_ROOMS,
            Self::RoomHistory { .. } => ClientEvents::ROOM_HISTORY,
            Self::ListUsers => ClientEvents::LIST_USERS,
            Self::ConnectionState => ClientEvents::CONNECTION_STATE,
        }
    }

    /// Message text, for the events that carry one.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message { text }
            | Self::RoomMessage { text, .. }
            | Self::PrivateMessage { text, .. } => Some(text),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────────────────────────

/// An outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Sent once to a new connection with its assigned id.
    Connected {
        connection_id: ConnectionId,
        display_name: Option<DisplayName>,
    },
    PresenceChanged {
        count: usize,
        roster: Vec<PresenceEntry>,
    },
    Message(ChatMessage),
    RoomMessage(ChatMessage),
    PrivateMessage(ChatMessage),
    Typing {
        connection_id: ConnectionId,
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_name: Option<RoomName>,
    },
    StopTyping {
        connection_id: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_name: Option<RoomName>,
    },
    RoomListChanged {
        names: Vec<RoomName>,
    },
    RoomJoined {
        room_name: RoomName,
        members: Vec<ConnectionId>,
        history: Vec<ChatMessage>,
    },
    RoomLeft {
        room_name: RoomName,
    },
    RoomDeleted {
        room_name: RoomName,
    },
    RoomHistory {
        room_name: RoomName,
        history: Vec<ChatMessage>,
    },
    MemberJoined {
        room_name: RoomName,
        connection_id: ConnectionId,
        display_name: Option<DisplayName>,
    },
    MemberLeft {
        room_name: RoomName,
        connection_id: ConnectionId,
    },
    ConnectionState {
        connection_id: ConnectionId,
        display_name: Option<DisplayName>,
        rooms: Vec<RoomName>,
        connected_at: DateTime<Utc>,
    },
    Error(EventError),
}

impl ServerEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::Connected { .. } => ServerEvents::CONNECTED,
            Self::PresenceChanged { .. } => ServerEvents::PRESENCE_CHANGED,
            Self::Message(_) => ServerEvents::MESSAGE,
            Self::RoomMessage(_) => ServerEvents::ROOM_MESSAGE,
            Self::PrivateMessage(_) => ServerEvents::PRIVATE_MESSAGE,
            Self::Typing { .. } => ServerEvents::TYPING,
            Self::StopTyping { .. } => ServerEvents::STOP_TYPING,
            Self::RoomListChanged { .. } => ServerEvents::ROOM_LIST_CHANGED,
            Self::RoomJoined { .. } => ServerEvents::ROOM_JOINED,
            Self::RoomLeft { .. } => ServerEvents::ROOM_LEFT,
            Self::RoomDeleted { .. } => ServerEvents::ROOM_DELETED,
            Self::RoomHistory { .. } => ServerEvents::ROOM_HISTORY,
            Self::MemberJoined { .. } => ServerEvents::MEMBER_JOINED,
            Self::MemberLeft { .. } => ServerEvents::MEMBER_LEFT,
            Self::ConnectionState { .. } => ServerEvents::CONNECTION_STATE,
            Self::Error(_) => ServerEvents::ERROR,
        }
    }

    /// Serialize into a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn presence(roster: Vec<PresenceEntry>) -> Self {
        Self::PresenceChanged {
            count: roster.len(),
            roster,
        }
    }
}

impl From<EventError> for ServerEvent {
    fn from(err: EventError) -> Self {
        Self::Error(err)
    }
}
