//! Error codes carried by the outbound `error` event.

use serde::{Deserialize, Serialize};

/// Machine-readable error code. Serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    EmptyText,
    DmEmptyText,
    DmSelfTarget,
    InvalidRoomName,
    InvalidDisplayName,
    TextTooLong,
    MalformedEvent,
    UnknownEvent,
    RoomExists,

    // Not found
    RoomNotFound,
    NotAMember,
    DmTargetOffline,

    // Handler failure
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyText => "EMPTY_TEXT",
            Self::DmEmptyText => "DM_EMPTY_TEXT",
            Self::DmSelfTarget => "DM_SELF_TARGET",
            Self::InvalidRoomName => "INVALID_ROOM_NAME",
            Self::InvalidDisplayName => "INVALID_DISPLAY_NAME",
            Self::TextTooLong => "TEXT_TOO_LONG",
            Self::MalformedEvent => "MALFORMED_EVENT",
            Self::UnknownEvent => "UNKNOWN_EVENT",
            Self::RoomExists => "ROOM_EXISTS",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::NotAMember => "NOT_A_MEMBER",
            Self::DmTargetOffline => "DM_TARGET_OFFLINE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the error reports a missing room or recipient rather than bad input.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoomNotFound | Self::NotAMember | Self::DmTargetOffline)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the outbound `error` event. Only ever sent to the connection
/// whose event caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    pub code: ErrorCode,
    pub message: String,
}

impl EventError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedEvent, message)
    }

    pub fn unknown_event(event: &str) -> Self {
        Self::new(ErrorCode::UnknownEvent, format!("Unknown event: {event}"))
    }

    pub fn text_too_long(max_chars: usize) -> Self {
        Self::new(
            ErrorCode::TextTooLong,
            format!("Text exceeds the maximum length of {max_chars} characters"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for EventError {}
