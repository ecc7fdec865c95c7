//! Chat session registry.
//!
//! Owns the session and message rules shared by the REST API and the realtime
//! gateway. Access to a session is decided by [`can_access`] alone, and an
//! inaccessible session is reported exactly like a missing one.

use crate::auth::AuthUser;
use crate::config::ChatConfig;
use crate::db::{
    ChatMessage, ChatSession, ChatStatus, Role, SenderType, SessionFilter, Store, UnreadFilter,
};
use crate::error::ApiError;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Whether `user` may read and write `session`.
///
/// Admins may access every session; anyone else only sessions they own or
/// are assigned to.
#[must_use]
pub fn can_access(session: &ChatSession, user: &AuthUser) -> bool {
    user.role == Role::Admin
        || session.user_id == user.user_id
        || session.admin_id == Some(user.user_id)
}

/// A session with its latest message and the viewer's unread count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// The session.
    #[serde(flatten)]
    pub session: ChatSession,
    /// Latest message, if any.
    pub last_message: Option<ChatMessage>,
    /// Messages from the other side the viewer has not read.
    pub unread_count: u64,
}

/// Requested message page; omitted fields take the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Total messages in the session.
    pub total: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
}

/// One page of a session's messages, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages in ascending creation order.
    pub messages: Vec<ChatMessage>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// Content of a message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMessage {
    /// Text body.
    pub body: Option<String>,
    /// Image attachment URL.
    pub image_url: Option<String>,
    /// Audio attachment URL.
    pub audio_url: Option<String>,
}

/// A persisted message together with the session it was posted to.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    /// The stored message.
    pub message: ChatMessage,
    /// The session, with `last_message_at` bumped.
    pub session: ChatSession,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Chat sessions and messages.
#[derive(Clone)]
pub struct ChatRegistry {
    store: Arc<dyn Store>,
    limits: ChatConfig,
}

impl ChatRegistry {
    /// Creates a registry over `store` with the given limits.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, limits: ChatConfig) -> Self {
        Self { store, limits }
    }

    /// Returns the caller's most recent OPEN session, creating one if none
    /// exists.
    ///
    /// Two concurrent first calls may both create a session; later calls
    /// converge on the newest.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn get_or_create_open_session(&self, user_id: Uuid) -> Result<ChatSession, ApiError> {
        if let Some(session) = self.store.find_open_session(user_id).await? {
            return Ok(session);
        }

        let session = ChatSession::open(user_id, Utc::now());
        self.store.insert_session(&session).await?;
        info!("Opened chat session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Lists sessions visible to `viewer`, most recently active first.
    ///
    /// Customers see their own sessions. Admins see every session, optionally
    /// narrowed to one status.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn list_sessions_for(
        &self,
        viewer: &AuthUser,
        status: Option<ChatStatus>,
    ) -> Result<Vec<SessionSummary>, ApiError> {
        let filter = match viewer.role {
            Role::Admin => SessionFilter {
                participant: None,
                status,
            },
            Role::Customer => SessionFilter {
                participant: Some(viewer.user_id),
                status,
            },
        };
        let sessions = self.store.list_sessions(filter).await?;
        let unread_from = SenderType::counterpart_of(viewer.role);

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let last_message = self.store.last_message(session.id).await?;
            let unread_count = self
                .store
                .count_unread(UnreadFilter {
                    session_id: Some(session.id),
                    ..UnreadFilter::from_sender(unread_from)
                })
                .await?;
            summaries.push(SessionSummary {
                session,
                last_message,
                unread_count,
            });
        }
        Ok(summaries)
    }

    /// IDs of every session the realtime `join-sessions` event joins: owned or
    /// assigned sessions, or all sessions for an admin.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn joinable_session_ids(&self, user: &AuthUser) -> Result<Vec<Uuid>, ApiError> {
        let filter = SessionFilter {
            participant: (!user.is_admin()).then_some(user.user_id),
            status: None,
        };
        let sessions = self.store.list_sessions(filter).await?;
        Ok(sessions.into_iter().map(|s| s.id).collect())
    }

    /// Fetches a session the caller may access.
    ///
    /// # Errors
    /// `NotFound` if the session is absent or inaccessible.
    pub async fn accessible_session(
        &self,
        session_id: Uuid,
        user: &AuthUser,
    ) -> Result<ChatSession, ApiError> {
        match self.store.get_session(session_id).await? {
            Some(session) if can_access(&session, user) => Ok(session),
            Some(_) => {
                debug!("User {} denied access to session {}", user.user_id, session_id);
                Err(ApiError::session_not_found())
            }
            None => Err(ApiError::session_not_found()),
        }
    }

    /// Returns one page of a session's messages, oldest first.
    ///
    /// # Errors
    /// - `NotFound` if the session is absent or inaccessible.
    /// - `InvalidRequest` if `page < 1` or `limit` is outside
    ///   `1..=max_page_size`.
    pub async fn list_messages(
        &self,
        session_id: Uuid,
        user: &AuthUser,
        request: PageRequest,
    ) -> Result<MessagePage, ApiError> {
        self.accessible_session(session_id, user).await?;

        let page = request.page.unwrap_or(1);
        let limit = request.limit.unwrap_or(self.limits.default_page_size);
        if page < 1 {
            return Err(ApiError::InvalidRequest("page must be at least 1".to_string()));
        }
        if limit < 1 || limit > self.limits.max_page_size {
            return Err(ApiError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                self.limits.max_page_size
            )));
        }

        let offset = u64::from(page - 1) * u64::from(limit);
        let slice = self
            .store
            .list_messages(session_id, offset, u64::from(limit))
            .await?;

        Ok(MessagePage {
            messages: slice.messages,
            pagination: Pagination {
                page,
                limit,
                total: slice.total,
                total_pages: slice.total.div_ceil(u64::from(limit)),
            },
        })
    }

    /// Appends a message authored by `author` to an OPEN session.
    ///
    /// # Errors
    /// - `InvalidRequest` if all content is blank or the body is too long.
    /// - `NotFound` if the session is absent or inaccessible.
    /// - `InvalidState` if the session is not OPEN.
    pub async fn append(
        &self,
        session_id: Uuid,
        author: &AuthUser,
        content: NewMessage,
    ) -> Result<PostedMessage, ApiError> {
        let body = non_blank(content.body).unwrap_or_default();
        let image_url = non_blank(content.image_url);
        let audio_url = non_blank(content.audio_url);

        if body.is_empty() && image_url.is_none() && audio_url.is_none() {
            return Err(ApiError::InvalidRequest(
                "Message, image or audio is required".to_string(),
            ));
        }
        if body.chars().count() > self.limits.max_message_length {
            return Err(ApiError::InvalidRequest(format!(
                "Message exceeds {} characters",
                self.limits.max_message_length
            )));
        }

        let mut session = self.accessible_session(session_id, author).await?;
        if session.status != ChatStatus::Open {
            return Err(closed(&session));
        }

        let draft = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id: author.user_id,
            sender_type: SenderType::from(author.role),
            message: body,
            image_url,
            audio_url,
            is_read: false,
            read_at: None,
            is_active: true,
            created_at: Utc::now(),
        };

        // The store re-checks OPEN atomically; a close may have landed since
        // the read above. It also assigns the final `created_at`.
        let Some(message) = self.store.append_message(&draft).await? else {
            return Err(ApiError::InvalidState(format!(
                "Chat session {session_id} is not open"
            )));
        };

        session.last_message_at = message.created_at;
        debug!(
            "Message {} posted to session {} by {}",
            message.id, session_id, author.user_id
        );
        Ok(PostedMessage { message, session })
    }

    /// Marks every unread message in the session not authored by `reader` as
    /// read and returns how many were updated.
    ///
    /// `None` means the session is absent or inaccessible: nothing was
    /// marked and no receipt should be announced.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn mark_read(
        &self,
        session_id: Uuid,
        reader: &AuthUser,
    ) -> Result<Option<u64>, ApiError> {
        match self.store.get_session(session_id).await? {
            Some(session) if can_access(&session, reader) => Ok(Some(
                self.store
                    .mark_read(session_id, reader.user_id, Utc::now())
                    .await?,
            )),
            _ => Ok(None),
        }
    }

    /// Assigns an admin to a session and re-opens it.
    ///
    /// # Errors
    /// `NotFound` if `admin_id` is not an active admin or the session does
    /// not exist.
    pub async fn assign_admin(
        &self,
        session_id: Uuid,
        admin_id: Uuid,
    ) -> Result<ChatSession, ApiError> {
        match self.store.get_active_user(admin_id).await? {
            Some(user) if user.role == Role::Admin => {}
            _ => return Err(ApiError::NotFound("Admin not found".to_string())),
        }

        let session = self
            .store
            .assign_admin(session_id, admin_id)
            .await?
            .ok_or_else(ApiError::session_not_found)?;

        info!("Assigned admin {} to chat session {}", admin_id, session_id);
        Ok(session)
    }

    /// Closes a session the caller may access.
    ///
    /// # Errors
    /// `NotFound` if the session is absent or inaccessible.
    pub async fn close(&self, session_id: Uuid, user: &AuthUser) -> Result<ChatSession, ApiError> {
        let mut session = self.accessible_session(session_id, user).await?;
        if !self
            .store
            .set_session_status(session_id, ChatStatus::Closed)
            .await?
        {
            return Err(ApiError::session_not_found());
        }

        session.status = ChatStatus::Closed;
        info!("Chat session {} closed by {}", session_id, user.user_id);
        Ok(session)
    }

    /// Unread messages waiting for `user`.
    ///
    /// Admins count customer messages in OPEN sessions assigned to them;
    /// customers count admin messages across their own sessions.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn unread_count(&self, user: &AuthUser) -> Result<u64, ApiError> {
        let filter = match user.role {
            Role::Admin => UnreadFilter {
                admin: Some(user.user_id),
                open_only: true,
                ..UnreadFilter::from_sender(SenderType::User)
            },
            Role::Customer => UnreadFilter {
                owner: Some(user.user_id),
                ..UnreadFilter::from_sender(SenderType::Admin)
            },
        };
        Ok(self.store.count_unread(filter).await?)
    }
}

fn closed(session: &ChatSession) -> ApiError {
    ApiError::InvalidState(format!(
        "Chat session {} is {}",
        session.id, session.status
    ))
}

#[cfg(test)]
mod tests;
