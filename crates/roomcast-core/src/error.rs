//! Domain errors for chat operations.

use roomcast_protocol::{ConnectionId, ErrorCode, EventError, RoomName};
use thiserror::Error;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Message text cannot be empty")]
    EmptyText,

    #[error("Private message text cannot be empty")]
    DmEmptyText,

    #[error("Cannot send a private message to yourself")]
    DmSelfTarget,

    #[error("Recipient {0} is not connected")]
    DmTargetOffline(ConnectionId),

    #[error("Room name cannot be empty")]
    InvalidRoomName,

    #[error("Display name cannot be empty")]
    InvalidDisplayName,

    #[error("Room not found: {0}")]
    RoomNotFound(RoomName),

    #[error("Not a member of room: {0}")]
    NotAMember(RoomName),

    #[error("Room already exists: {0}")]
    RoomExists(RoomName),

    #[error("Connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),

    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

impl ChatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyText => ErrorCode::EmptyText,
            Self::DmEmptyText => ErrorCode::DmEmptyText,
            Self::DmSelfTarget => ErrorCode::DmSelfTarget,
            Self::DmTargetOffline(_) => ErrorCode::DmTargetOffline,
            Self::InvalidRoomName => ErrorCode::InvalidRoomName,
            Self::InvalidDisplayName => ErrorCode::InvalidDisplayName,
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::NotAMember(_) => ErrorCode::NotAMember,
            Self::RoomExists(_) => ErrorCode::RoomExists,
            // Never reaches a client: the router drops events from unknown
            // connections and the transport never registers an id twice.
            Self::AlreadyRegistered(_) | Self::UnknownConnection(_) => ErrorCode::InternalError,
        }
    }
}

impl From<ChatError> for EventError {
    fn from(err: ChatError) -> Self {
        EventError::new(err.code(), err.to_string())
    }
}
