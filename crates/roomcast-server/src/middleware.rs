//! Middleware chain for inbound events.
//!
//! Middleware inspects every decoded event before it is dispatched and may
//! block it with an error for the sender. They run in priority order, while
//! the chat state is locked, so they must not block.

use roomcast_protocol::{ClientEvent, ConnectionId, EventError};

/// Middleware result: whether to allow or block the event.
pub struct MiddlewareResult {
    /// Whether the event should proceed
    pub allowed: bool,
    /// Error sent back to the sender if blocked
    pub error: Option<EventError>,
}

impl MiddlewareResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            error: None,
        }
    }

    pub fn block(error: EventError) -> Self {
        Self {
            allowed: false,
            error: Some(error),
        }
    }
}

/// Trait for event middleware.
pub trait Middleware: Send + Sync {
    /// Inspect an event before it reaches its handler.
    fn before(&self, sender: &ConnectionId, event: &ClientEvent) -> MiddlewareResult;

    /// Middleware name for debugging.
    fn name(&self) -> &str;

    /// Priority (lower runs first).
    fn priority(&self) -> i32 {
        0
    }
}

/// A chain of middleware executed in priority order.
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
        self.middlewares.sort_by_key(|m| m.priority());
    }

    /// Run the chain, stopping at the first block.
    pub fn run_before(&self, sender: &ConnectionId, event: &ClientEvent) -> MiddlewareResult {
        for mw in &self.middlewares {
            let result = mw.before(sender, event);
            if !result.allowed {
                return result;
            }
        }
        MiddlewareResult::allow()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Rejects message text longer than a fixed number of characters.
pub struct TextLengthLimit {
    max_chars: usize,
}

impl TextLengthLimit {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Middleware for TextLengthLimit {
    fn before(&self, _sender: &ConnectionId, event: &ClientEvent) -> MiddlewareResult {
        match event.text() {
            Some(text) if text.trim().chars().count() > self.max_chars => {
                MiddlewareResult::block(EventError::text_too_long(self.max_chars))
            }
            _ => MiddlewareResult::allow(),
        }
    }

    fn name(&self) -> &str {
        "text-length-limit"
    }

    fn priority(&self) -> i32 {
        -10
    }
}
