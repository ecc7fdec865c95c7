//! Dispatch of client events.

use super::protocol::{ClientEvent, SendMessage, SessionRef, Typing};
use super::{ConnectionId, Gateway, Room, ServerEvent};
use crate::auth::AuthUser;
use crate::chat::NewMessage;
use crate::error::ApiError;
use tracing::{debug, warn};

impl Gateway {
    /// Handles one text frame from a connection.
    ///
    /// Failures are reported to the sending connection only, as an `error`
    /// event. Callers process a connection's frames one at a time, which keeps
    /// each connection's events in arrival order.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => self.handle_event(id, event).await,
            Err(e) => {
                debug!("Connection {} sent an unusable frame: {}", id, e);
                self.send_to(id, ServerEvent::from(&e));
            }
        }
    }

    /// Handles one parsed client event.
    pub async fn handle_event(&self, id: ConnectionId, event: ClientEvent) {
        let Some(connection) = self.connection(id) else {
            return;
        };
        let user = connection.user;
        let name = event.name();

        let result = match event {
            ClientEvent::JoinSessions => self.join_sessions(id, &user).await,
            ClientEvent::JoinSession(target) => self.join_session(id, &user, target).await,
            ClientEvent::SendMessage(msg) => self.send_message(&user, msg).await,
            ClientEvent::MarkRead(target) => self.mark_read(id, &user, target).await,
            ClientEvent::Typing(typing) => {
                self.typing(id, &user, typing);
                Ok(())
            }
        };

        if let Err(e) = result {
            if e.is_retryable() || e.status().is_server_error() {
                warn!("{} from connection {} failed: {}", name, id, e);
            } else {
                debug!("{} from connection {} rejected: {}", name, id, e);
            }
            self.send_to(id, ServerEvent::from(&e));
        }
    }

    async fn join_sessions(&self, id: ConnectionId, user: &AuthUser) -> Result<(), ApiError> {
        let session_ids = self.chat.joinable_session_ids(user).await?;
        for session_id in &session_ids {
            self.join(id, Room::Session(*session_id));
        }
        self.send_to(
            id,
            ServerEvent::SessionsJoined {
                count: session_ids.len(),
            },
        );
        Ok(())
    }

    async fn join_session(
        &self,
        id: ConnectionId,
        user: &AuthUser,
        target: SessionRef,
    ) -> Result<(), ApiError> {
        let session = self.chat.accessible_session(target.session_id, user).await?;
        let room = Room::Session(session.id);

        self.join(id, room);
        self.send_to(
            id,
            ServerEvent::SessionJoined {
                session_id: session.id,
            },
        );
        self.broadcast(
            room,
            &ServerEvent::UserJoined {
                session_id: session.id,
                user_id: user.user_id,
            },
            Some(id),
        );
        Ok(())
    }

    async fn send_message(&self, user: &AuthUser, msg: SendMessage) -> Result<(), ApiError> {
        let posted = self
            .chat
            .append(
                msg.session_id,
                user,
                NewMessage {
                    body: msg.message,
                    image_url: msg.image_url,
                    audio_url: msg.audio_url,
                },
            )
            .await?;
        self.publish_message(&posted);
        Ok(())
    }

    async fn mark_read(
        &self,
        id: ConnectionId,
        user: &AuthUser,
        target: SessionRef,
    ) -> Result<(), ApiError> {
        // Announced to the room whether or not this connection joined it.
        if let Some(marked) = self.chat.mark_read(target.session_id, user).await? {
            debug!(
                "User {} marked {} messages read in session {}",
                user.user_id, marked, target.session_id
            );
            self.publish_read(target.session_id, user.user_id, Some(id));
        }
        Ok(())
    }

    fn typing(&self, id: ConnectionId, user: &AuthUser, typing: Typing) {
        let room = Room::Session(typing.session_id);
        if !self.is_member(id, room) {
            debug!("Connection {} typing outside joined room {}", id, room);
            return;
        }
        self.broadcast(
            room,
            &ServerEvent::UserTyping {
                session_id: typing.session_id,
                user_id: user.user_id,
                is_typing: typing.is_typing,
            },
            Some(id),
        );
    }
}
