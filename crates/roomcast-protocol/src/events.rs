//! Event name constants.
//!
//! Each constant is the exact string sent over the wire in the `event` field
//! of a frame.

/// Events a client may send.
pub struct ClientEvents;

impl ClientEvents {
    // ── Identity ────────────────────────────────────────────────────────
    pub const SET_DISPLAY_NAME: &str = "setDisplayName";

    // ── Messaging ───────────────────────────────────────────────────────
    pub const MESSAGE: &str = "message";
    pub const ROOM_MESSAGE: &str = "roomMessage";
    pub const PRIVATE_MESSAGE: &str = "privateMessage";

    // ── Typing ──────────────────────────────────────────────────────────
    pub const TYPING: &str = "typing";
    pub const STOP_TYPING: &str = "stopTyping";

    // ── Rooms ───────────────────────────────────────────────────────────
    pub const JOIN_ROOM: &str = "joinRoom";
    pub const LEAVE_ROOM: &str = "leaveRoom";
    pub const CREATE_ROOM: &str = "createRoom";
    pub const LIST_ROOMS: &str = "listRooms";
    pub const ROOM_HISTORY: &str = "roomHistory";

    // ── Introspection ───────────────────────────────────────────────────
    pub const LIST_USERS: &str = "listUsers";
    pub const CONNECTION_STATE: &str = "connectionState";

    pub const ALL: &[&str] = &[
        Self::SET_DISPLAY_NAME,
        Self::MESSAGE,
        Self::ROOM_MESSAGE,
        Self::PRIVATE_MESSAGE,
        Self::TYPING,
        Self::STOP_TYPING,
        Self::JOIN_ROOM,
        Self::LEAVE_ROOM,
        Self::CREATE_ROOM,
        Self::LIST_ROOMS,
        Self::ROOM_HISTORY,
        Self::LIST_USERS,
        Self::CONNECTION_STATE,
    ];

    /// Events that carry no payload; any `data` sent with them is ignored.
    pub const NO_PAYLOAD: &[&str] = &[
        Self::LIST_ROOMS,
        Self::LIST_USERS,
        Self::CONNECTION_STATE,
    ];

    pub fn is_known(event: &str) -> bool {
        Self::ALL.contains(&event)
    }

    pub fn takes_payload(event: &str) -> bool {
        !Self::NO_PAYLOAD.contains(&event)
    }
}

/// Events the server sends.
pub struct ServerEvents;

impl ServerEvents {
    // ── Connection lifecycle ────────────────────────────────────────────
    pub const CONNECTED: &str = "connected";
    pub const CONNECTION_STATE: &str = "connectionState";
    pub const PRESENCE_CHANGED: &str = "presenceChanged";

    // ── Messaging ───────────────────────────────────────────────────────
    pub const MESSAGE: &str = "message";
    pub const ROOM_MESSAGE: &str = "roomMessage";
    pub const PRIVATE_MESSAGE: &str = "privateMessage";

    // ── Typing ──────────────────────────────────────────────────────────
    pub const TYPING: &str = "typing";
    pub const STOP_TYPING: &str = "stopTyping";

    // ── Rooms ───────────────────────────────────────────────────────────
    pub const ROOM_LIST_CHANGED: &str = "roomListChanged";
    pub const ROOM_JOINED: &str = "roomJoined";
    pub const ROOM_LEFT: &str = "roomLeft";
    pub const ROOM_DELETED: &str = "roomDeleted";
    pub const ROOM_HISTORY: &str = "roomHistory";
    pub const MEMBER_JOINED: &str = "memberJoined";
    pub const MEMBER_LEFT: &str = "memberLeft";

    // ── Errors ──────────────────────────────────────────────────────────
    pub const ERROR: &str = "error";
}

/// Type alias for event names.
pub type EventName = &'static str;
