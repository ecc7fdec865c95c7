//! Realtime gateway.
//!
//! A transport-independent room registry plus the chat event dispatcher. The
//! WebSocket endpoint in `api::websocket` authenticates, registers a
//! [`Connection`] here, feeds incoming frames to [`Gateway::handle_text`] and
//! drains the connection's outgoing channel. REST handlers publish through the
//! same instance.
//!
//! Membership is an explicit two-way index:
//!
//! - room → connections, used for broadcasts;
//! - connection → rooms, used for teardown and membership checks.

mod handler;
pub mod protocol;

pub use protocol::{ClientEvent, ProtocolError, ServerEvent};

use crate::auth::AuthUser;
use crate::chat::{ChatRegistry, PostedMessage};
use crate::db::SenderType;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Broadcast scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every connection of one user.
    User(Uuid),
    /// Members of one chat session.
    Session(Uuid),
    /// Every admin connection.
    Admins,
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{id}"),
            Room::Session(id) => write!(f, "session:{id}"),
            Room::Admins => f.write_str("admin:all"),
        }
    }
}

/// Observable lifecycle of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Authenticated, in no session room.
    Idle,
    /// Member of at least one session room.
    RoomMember,
    /// Not registered (never connected or already torn down).
    Disconnected,
}

/// State for a single connected client.
pub struct Connection {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Identity verified at handshake.
    pub user: AuthUser,
    /// When the connection registered.
    pub connected_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    rooms: DashSet<Room>,
}

impl Connection {
    /// Queues an event for this connection. Returns false if the transport
    /// side has gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Room registry and chat event dispatcher.
pub struct Gateway {
    chat: ChatRegistry,
    connections: DashMap<ConnectionId, Arc<Connection>>,
    rooms: DashMap<Room, DashSet<ConnectionId>>,
}

impl Gateway {
    /// Creates an empty gateway dispatching to `chat`.
    #[must_use]
    pub fn new(chat: ChatRegistry) -> Self {
        Self {
            chat,
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Registers an authenticated connection and joins its personal room,
    /// plus the admin room for admins.
    ///
    /// Returns the connection id and the receiving end of its outgoing
    /// channel.
    pub fn connect(&self, user: AuthUser) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Connection {
            id: Uuid::new_v4(),
            user,
            connected_at: Utc::now(),
            tx,
            rooms: DashSet::new(),
        });
        let id = connection.id;
        self.connections.insert(id, connection);

        self.join(id, Room::User(user.user_id));
        if user.is_admin() {
            self.join(id, Room::Admins);
        }

        info!(
            "Connection {} registered for user {} ({})",
            id, user.user_id, user.role
        );
        (id, rx)
    }

    /// Tears down a connection and all its memberships.
    pub fn disconnect(&self, id: ConnectionId) {
        let Some((_, connection)) = self.connections.remove(&id) else {
            return;
        };
        for room in connection.rooms.iter() {
            self.remove_member(*room, id);
        }
        info!(
            "Connection {} unregistered after {}s",
            id,
            (Utc::now() - connection.connected_at).num_seconds()
        );
    }

    /// Adds a connection to a room. Returns false for unknown connections.
    pub fn join(&self, id: ConnectionId, room: Room) -> bool {
        let Some(connection) = self.connection(id) else {
            return false;
        };
        connection.rooms.insert(room);
        self.rooms.entry(room).or_default().insert(id);
        debug!("Connection {} joined {}", id, room);
        true
    }

    fn remove_member(&self, room: Room, id: ConnectionId) {
        if let Some(members) = self.rooms.get(&room) {
            members.remove(&id);
        }
        self.rooms.remove_if(&room, |_, members| members.is_empty());
    }

    /// Looks up a registered connection.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|c| Arc::clone(&c))
    }

    /// Whether a connection is a member of `room`.
    #[must_use]
    pub fn is_member(&self, id: ConnectionId, room: Room) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|c| c.rooms.contains(&room))
    }

    /// Current lifecycle phase of a connection.
    #[must_use]
    pub fn phase(&self, id: ConnectionId) -> ConnectionPhase {
        match self.connections.get(&id) {
            None => ConnectionPhase::Disconnected,
            Some(c) if c.rooms.iter().any(|r| matches!(*r, Room::Session(_))) => {
                ConnectionPhase::RoomMember
            }
            Some(_) => ConnectionPhase::Idle,
        }
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections in `room`.
    #[must_use]
    pub fn room_size(&self, room: Room) -> usize {
        self.rooms.get(&room).map_or(0, |members| members.len())
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Sends an event to one connection.
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) {
        if let Some(connection) = self.connection(id)
            && !connection.send(event)
        {
            debug!("Connection {} no longer accepts events", id);
        }
    }

    /// Sends an event to every member of `room`, optionally skipping one
    /// connection. Returns the number of connections reached.
    pub fn broadcast(&self, room: Room, event: &ServerEvent, except: Option<ConnectionId>) -> usize {
        // Snapshot members first so no map guard is held while sending.
        let members: Vec<ConnectionId> = match self.rooms.get(&room) {
            Some(set) => set.iter().map(|id| *id).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for id in members.into_iter().filter(|id| Some(*id) != except) {
            if let Some(connection) = self.connection(id)
                && connection.send(event.clone())
            {
                delivered += 1;
            }
        }
        delivered
    }

    // ========================================================================
    // Chat notifications
    // ========================================================================

    /// Announces a posted message to its session room and, for a customer
    /// message in an unassigned session, to every admin.
    pub fn publish_message(&self, posted: &PostedMessage) {
        let session_id = posted.session.id;
        self.broadcast(
            Room::Session(session_id),
            &ServerEvent::NewMessage {
                session_id,
                message: posted.message.clone(),
            },
            None,
        );

        if posted.message.sender_type == SenderType::User && posted.session.admin_id.is_none() {
            self.broadcast(
                Room::Admins,
                &ServerEvent::NewChatRequest {
                    session_id,
                    user_id: posted.message.user_id,
                },
                None,
            );
        }
    }

    /// Tells the other members of a session room that `reader` read it.
    pub fn publish_read(&self, session_id: Uuid, reader: Uuid, except: Option<ConnectionId>) {
        self.broadcast(
            Room::Session(session_id),
            &ServerEvent::MessagesRead {
                session_id,
                user_id: reader,
            },
            except,
        );
    }
}
