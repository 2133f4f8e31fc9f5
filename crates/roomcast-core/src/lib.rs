//! Roomcast core: the in-memory chat state.
//!
//! Everything here is synchronous and lock-free on its own. The server wraps
//! a single [`ChatContext`] in a mutex and runs every event to completion
//! under it, so the registry and the room manager always agree.

pub mod context;
pub mod error;
pub mod presence;
pub mod registry;
pub mod rooms;

pub use context::{ChatConfig, ChatContext, Departure, MessageSequence};
pub use error::{ChatError, ChatResult};
pub use presence::PresenceDirectory;
pub use registry::{Connection, ConnectionRegistry};
pub use rooms::{JoinOutcome, LeaveOutcome, RoomManager, RoomState};
