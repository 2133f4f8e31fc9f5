//! Event Router: dispatches client events to the chat state and fans out
//! the resulting server events.
//!
//! Every connect, frame and disconnect runs to completion under one lock on
//! the `ChatContext`. Delivery inside the lock only pushes onto the outbox.

use std::panic::AssertUnwindSafe;

use parking_lot::Mutex;
use roomcast_archive::ArchiveWriter;
use roomcast_core::{ChatConfig, ChatContext, ChatResult, Departure, LeaveOutcome};
use roomcast_protocol::{ChatMessage, ClientEvent, ConnectionId, EventError, RoomName, ServerEvent};
use roomcast_transport::{EventHandler, Outbox};
use tracing::{debug, error, info};

use crate::middleware::{Middleware, MiddlewareChain, TextLengthLimit};

/// The chat server: owns the chat state and routes events.
pub struct EventRouter<O: Outbox> {
    context: Mutex<ChatContext>,
    outbox: O,
    middleware: MiddlewareChain,
    /// Optional room message archive
    archive: Mutex<Option<ArchiveWriter>>,
}

impl<O: Outbox> EventRouter<O> {
    pub fn new(config: ChatConfig, outbox: O) -> Self {
        let mut middleware = MiddlewareChain::new();
        if config.max_text_length > 0 {
            middleware.add(TextLengthLimit::new(config.max_text_length));
        }

        Self {
            context: Mutex::new(ChatContext::new(&config)),
            outbox,
            middleware,
            archive: Mutex::new(None),
        }
    }

    /// Archive every room message through `writer`.
    pub fn with_archive(self, writer: ArchiveWriter) -> Self {
        *self.archive.lock() = Some(writer);
        self
    }

    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        info!("Registering middleware: {}", middleware.name());
        self.middleware.add(middleware);
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.names()
    }

    /// Read-only access to the chat state.
    pub fn with_context<R>(&self, f: impl FnOnce(&ChatContext) -> R) -> R {
        f(&self.context.lock())
    }

    pub fn connection_count(&self) -> usize {
        self.context.lock().registry().len()
    }

    /// Detach the archive writer and wait for it to flush.
    pub async fn shutdown_archive(&self) {
        let writer = self.archive.lock().take();
        if let Some(writer) = writer {
            info!("Flushing message archive...");
            writer.shutdown().await;
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Register a new connection, greet it, and tell everyone.
    pub fn connect(&self, id: &ConnectionId, display_name: Option<&str>) {
        let mut ctx = self.context.lock();
        if let Err(e) = ctx.connect(id.clone(), display_name) {
            error!("Connect failed for {}: {}", id, e);
            return;
        }

        let display_name = ctx.connection(id).ok().and_then(|c| c.display_name.clone());
        info!(
            "Connection registered: {} ({}), total {}",
            id,
            display_name.as_ref().map(|n| n.as_str()).unwrap_or("anonymous"),
            ctx.registry().len()
        );

        self.send(
            id,
            &ServerEvent::Connected {
                connection_id: id.clone(),
                display_name,
            },
        );
        self.send(
            id,
            &ServerEvent::RoomListChanged {
                names: ctx.rooms().list_rooms(),
            },
        );
        self.broadcast_presence(&ctx);
    }

    /// Remove a connection and reconcile every room it was in. Unknown ids
    /// are ignored, so calling this twice is harmless.
    pub fn disconnect(&self, id: &ConnectionId) {
        let mut ctx = self.context.lock();
        let Some(departures) = ctx.disconnect(id) else {
            debug!("Disconnect for unknown connection {}", id);
            return;
        };

        let rooms_deleted = self.announce_departures(&ctx, id, &departures, false);
        self.broadcast_presence(&ctx);
        if rooms_deleted {
            self.broadcast_room_list(&ctx);
        }
        info!(
            "Connection removed: {} (left {} rooms), total {}",
            id,
            departures.len(),
            ctx.registry().len()
        );
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    /// Decode and handle one text frame. Never panics: a failing handler is
    /// reported to the sender as `INTERNAL_ERROR`.
    pub fn handle_frame(&self, id: &ConnectionId, text: &str) {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| self.process_frame(id, text)));
        if outcome.is_err() {
            error!("Handler panicked while processing a frame from {}", id);
            self.send(
                id,
                &EventError::internal("Internal error while handling event").into(),
            );
        }
    }

    fn process_frame(&self, id: &ConnectionId, text: &str) {
        match ClientEvent::decode(text) {
            Ok(event) => self.handle_event(id, event),
            Err(err) => self.reject_frame(id, err),
        }
    }

    /// Report an unreadable frame to its sender only.
    pub fn reject_frame(&self, id: &ConnectionId, err: EventError) {
        if self.context.lock().registry().contains(id) {
            debug!("Rejected frame from {}: {}", id, err);
            self.send(id, &err.into());
        }
    }

    /// Handle a decoded event. Events from unregistered connections are dropped.
    pub fn handle_event(&self, id: &ConnectionId, event: ClientEvent) {
        let mut ctx = self.context.lock();
        if !ctx.registry().contains(id) {
            debug!("Ignoring {} from unknown connection {}", event.name(), id);
            return;
        }

        let verdict = self.middleware.run_before(id, &event);
        if !verdict.allowed {
            if let Some(err) = verdict.error {
                debug!("Middleware blocked {} from {}: {}", event.name(), id, err);
                self.send(id, &err.into());
            }
            return;
        }

        let name = event.name();
        debug!("Dispatching {} from {}", name, id);
        if let Err(err) = self.dispatch(&mut ctx, id, event) {
            debug!("{} from {} failed: {}", name, id, err);
            self.send(id, &ServerEvent::Error(err.into()));
        }
    }

    fn dispatch(
        &self,
        ctx: &mut ChatContext,
        id: &ConnectionId,
        event: ClientEvent,
    ) -> ChatResult<()> {
        match event {
            ClientEvent::SetDisplayName { name } => {
                let name = ctx.set_display_name(id, &name)?;
                info!("Connection {} is now known as {}", id, name);
                self.broadcast_presence(ctx);
            }
            ClientEvent::Message { text } => {
                let msg = ctx.post_public(id, &text)?;
                self.send_many(&ctx.registry().ids(), &ServerEvent::Message(msg));
            }
            ClientEvent::RoomMessage { room_name, text } => {
                let msg = ctx.post_room(id, &room_name, &text)?;
                if let Some(room) = &msg.room_name {
                    let members = ctx.rooms().members(room);
                    self.send_many(&members, &ServerEvent::RoomMessage(msg.clone()));
                }
                self.archive_message(msg);
            }
            ClientEvent::PrivateMessage { target_id, text } => {
                let msg = ctx.post_private(id, &target_id, &text)?;
                let event = ServerEvent::PrivateMessage(msg);
                self.send(&target_id, &event);
                self.send(id, &event);
            }
            // The relayed name is the registered one, whatever the client claims
            ClientEvent::Typing { room_name, .. } => {
                let room = room_name.as_deref().and_then(RoomName::parse);
                let event = ServerEvent::Typing {
                    connection_id: id.clone(),
                    display_name: ctx.connection(id)?.sender_name(),
                    room_name: room.clone(),
                };
                self.relay_typing(ctx, id, room.as_ref(), &event);
            }
            ClientEvent::StopTyping { room_name, .. } => {
                let room = room_name.as_deref().and_then(RoomName::parse);
                let event = ServerEvent::StopTyping {
                    connection_id: id.clone(),
                    display_name: Some(ctx.connection(id)?.sender_name()),
                    room_name: room.clone(),
                };
                self.relay_typing(ctx, id, room.as_ref(), &event);
            }
            ClientEvent::JoinRoom { room_name } => {
                if RoomName::parse(&room_name).is_none() {
                    // A blank name means "leave every room"
                    let departures = ctx.leave_all(id)?;
                    if self.announce_departures(ctx, id, &departures, true) {
                        self.broadcast_room_list(ctx);
                    }
                } else {
                    self.join(ctx, id, &room_name)?;
                }
            }
            ClientEvent::CreateRoom { room_name } => {
                let outcome = ctx.create(id, &room_name)?;
                self.send(
                    id,
                    &ServerEvent::RoomJoined {
                        room_name: outcome.state.name,
                        members: outcome.state.members,
                        history: outcome.state.history,
                    },
                );
                self.broadcast_room_list(ctx);
            }
            ClientEvent::LeaveRoom { room_name } => {
                let departure = ctx.leave(id, &room_name)?;
                if self.announce_departures(ctx, id, std::slice::from_ref(&departure), true) {
                    self.broadcast_room_list(ctx);
                }
            }
            ClientEvent::ListRooms => {
                self.send(
                    id,
                    &ServerEvent::RoomListChanged {
                        names: ctx.rooms().list_rooms(),
                    },
                );
            }
            ClientEvent::RoomHistory { room_name } => {
                let (room_name, history) = ctx.history(id, &room_name)?;
                self.send(id, &ServerEvent::RoomHistory { room_name, history });
            }
            ClientEvent::ListUsers => {
                self.send(id, &ServerEvent::presence(ctx.presence().snapshot()));
            }
            ClientEvent::ConnectionState => {
                let conn = ctx.connection(id)?;
                self.send(
                    id,
                    &ServerEvent::ConnectionState {
                        connection_id: conn.id.clone(),
                        display_name: conn.display_name.clone(),
                        rooms: conn.rooms.iter().cloned().collect(),
                        connected_at: conn.connected_at,
                    },
                );
            }
        }
        Ok(())
    }

    fn join(&self, ctx: &mut ChatContext, id: &ConnectionId, room_name: &str) -> ChatResult<()> {
        let outcome = ctx.join(id, room_name)?;
        let room = outcome.state.name.clone();

        if outcome.newly_joined {
            let others: Vec<ConnectionId> = outcome
                .state
                .members
                .iter()
                .filter(|m| *m != id)
                .cloned()
                .collect();
            let display_name = ctx.connection(id)?.display_name.clone();
            self.send_many(
                &others,
                &ServerEvent::MemberJoined {
                    room_name: room.clone(),
                    connection_id: id.clone(),
                    display_name,
                },
            );
        }

        self.send(
            id,
            &ServerEvent::RoomJoined {
                room_name: room,
                members: outcome.state.members,
                history: outcome.state.history,
            },
        );
        if outcome.created {
            self.broadcast_room_list(ctx);
        }
        Ok(())
    }

    // ── Fan-out ─────────────────────────────────────────────────────────

    /// Tell the remaining members (or everyone, for a deleted room) that
    /// `id` is gone. `ack` also confirms each room to the leaver. Returns
    /// whether any room was deleted.
    fn announce_departures(
        &self,
        ctx: &ChatContext,
        id: &ConnectionId,
        departures: &[Departure],
        ack: bool,
    ) -> bool {
        let mut rooms_deleted = false;
        for Departure { room, outcome } in departures {
            if ack && *outcome != LeaveOutcome::NotMember {
                self.send(
                    id,
                    &ServerEvent::RoomLeft {
                        room_name: room.clone(),
                    },
                );
            }
            match outcome {
                LeaveOutcome::NotMember => {}
                LeaveOutcome::Left { remaining } => {
                    self.send_many(
                        remaining,
                        &ServerEvent::MemberLeft {
                            room_name: room.clone(),
                            connection_id: id.clone(),
                        },
                    );
                }
                LeaveOutcome::Deleted => {
                    rooms_deleted = true;
                    self.send_many(
                        &ctx.registry().ids(),
                        &ServerEvent::RoomDeleted {
                            room_name: room.clone(),
                        },
                    );
                }
            }
        }
        rooms_deleted
    }

    fn relay_typing(
        &self,
        ctx: &ChatContext,
        sender: &ConnectionId,
        room: Option<&RoomName>,
        event: &ServerEvent,
    ) {
        let audience = match room {
            Some(room) => ctx.rooms().members(room),
            None => ctx.registry().ids(),
        };
        let recipients: Vec<ConnectionId> = audience.into_iter().filter(|c| c != sender).collect();
        self.send_many(&recipients, event);
    }

    fn broadcast_presence(&self, ctx: &ChatContext) {
        let event = ServerEvent::presence(ctx.presence().snapshot());
        self.send_many(&ctx.registry().ids(), &event);
    }

    fn broadcast_room_list(&self, ctx: &ChatContext) {
        let event = ServerEvent::RoomListChanged {
            names: ctx.rooms().list_rooms(),
        };
        self.send_many(&ctx.registry().ids(), &event);
    }

    fn send(&self, to: &ConnectionId, event: &ServerEvent) {
        self.send_many(std::slice::from_ref(to), event);
    }

    fn send_many(&self, recipients: &[ConnectionId], event: &ServerEvent) {
        if recipients.is_empty() {
            return;
        }
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {}: {}", event.name(), e);
                return;
            }
        };
        for to in recipients {
            if !self.outbox.deliver(to, &frame) {
                debug!("Dropped {} for departed connection {}", event.name(), to);
            }
        }
    }

    fn archive_message(&self, msg: ChatMessage) {
        if let Some(writer) = self.archive.lock().as_ref() {
            writer.submit(msg);
        }
    }
}

impl<O: Outbox> EventHandler for EventRouter<O> {
    fn on_connect(&self, id: &ConnectionId, display_name: Option<&str>) {
        self.connect(id, display_name);
    }

    fn on_frame(&self, id: &ConnectionId, text: &str) {
        self.handle_frame(id, text);
    }

    fn on_malformed(&self, id: &ConnectionId, reason: &str) {
        self.reject_frame(id, EventError::malformed(reason));
    }

    fn on_disconnect(&self, id: &ConnectionId) {
        self.disconnect(id);
    }
}
