//! Roomcast Server: routes client events to the chat state and fans out
//! the results.
//!
//! The server owns the single `ChatContext`, runs the middleware chain and
//! provides the `EventHandler` implementation for the transport layer.

pub mod middleware;
pub mod router;

pub use middleware::{Middleware, MiddlewareChain, MiddlewareResult, TextLengthLimit};
pub use router::EventRouter;
