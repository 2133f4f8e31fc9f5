//! Roomcast wire protocol.
//!
//! Every frame exchanged over a connection is a JSON object of the form
//! `{"event": "<name>", "data": { ... }}`. This crate is the single source of
//! truth for event names, payload shapes, error codes and the value types
//! (`ConnectionId`, `RoomName`, `ChatMessage`) shared by every other crate.

pub mod error;
pub mod events;
pub mod frame;
pub mod types;

pub use error::{ErrorCode, EventError};
pub use events::{ClientEvents, EventName, ServerEvents};
pub use frame::{ClientEvent, Frame, ServerEvent};
pub use types::{ANONYMOUS, ChatMessage, ConnectionId, DisplayName, PresenceEntry, RoomName};
