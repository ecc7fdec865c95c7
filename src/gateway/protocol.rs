//! Realtime protocol message types.
//!
//! Frames are JSON text in both directions: `{"event": "<name>", "data": {...}}`
//! with camelCase payload fields.

use crate::db::ChatMessage;
use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Failure to interpret an incoming frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not a `{event, data}` JSON object.
    #[error("Malformed frame: {0}")]
    Malformed(String),
    /// Event name not recognised.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    /// Payload does not fit the named event.
    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name.
        event: String,
        /// Decoder message.
        reason: String,
    },
}

impl ProtocolError {
    /// Stable machine-readable classification.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "MALFORMED_FRAME",
            ProtocolError::UnknownEvent(_) => "UNKNOWN_EVENT",
            ProtocolError::InvalidPayload { .. } => "VALIDATION_ERROR",
        }
    }
}

// ============================================================================
// Client → Server Events
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// `join-session` and `mark-read` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    /// Target session.
    pub session_id: Uuid,
}

/// `send-message` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target session.
    pub session_id: Uuid,
    /// Text body.
    #[serde(default)]
    pub message: Option<String>,
    /// Image attachment URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Audio attachment URL.
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// `typing` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typing {
    /// Target session.
    pub session_id: Uuid,
    /// Whether the user started or stopped typing.
    pub is_typing: bool,
}

/// Event sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Join every accessible session room.
    JoinSessions,
    /// Join one session room.
    JoinSession(SessionRef),
    /// Post a message.
    SendMessage(SendMessage),
    /// Mark the session read.
    MarkRead(SessionRef),
    /// Typing indicator.
    Typing(Typing),
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

impl ClientEvent {
    /// Parses one text frame.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for malformed frames, unknown events and
    /// payloads that do not match the event.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let Envelope { event, data } =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        match event.as_str() {
            "join-sessions" => Ok(ClientEvent::JoinSessions),
            "join-session" => payload(&event, data).map(ClientEvent::JoinSession),
            "send-message" => payload(&event, data).map(ClientEvent::SendMessage),
            "mark-read" => payload(&event, data).map(ClientEvent::MarkRead),
            "typing" => payload(&event, data).map(ClientEvent::Typing),
            _ => Err(ProtocolError::UnknownEvent(event)),
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinSessions => "join-sessions",
            ClientEvent::JoinSession(_) => "join-session",
            ClientEvent::SendMessage(_) => "send-message",
            ClientEvent::MarkRead(_) => "mark-read",
            ClientEvent::Typing(_) => "typing",
        }
    }
}

// ============================================================================
// Server → Client Events
// ============================================================================

/// Event sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Reply to `join-sessions`.
    #[serde(rename_all = "camelCase")]
    SessionsJoined {
        /// Rooms joined.
        count: usize,
    },
    /// Reply to `join-session`.
    #[serde(rename_all = "camelCase")]
    SessionJoined {
        /// Joined session.
        session_id: Uuid,
    },
    /// Another user joined a session room.
    #[serde(rename_all = "camelCase")]
    UserJoined {
        /// Session.
        session_id: Uuid,
        /// Joining user.
        user_id: Uuid,
    },
    /// A message was posted.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        /// Session.
        session_id: Uuid,
        /// The stored message.
        message: ChatMessage,
    },
    /// A customer wrote in an unassigned session.
    #[serde(rename_all = "camelCase")]
    NewChatRequest {
        /// Session.
        session_id: Uuid,
        /// Customer.
        user_id: Uuid,
    },
    /// Another member read the session.
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        /// Session.
        session_id: Uuid,
        /// Reader.
        user_id: Uuid,
    },
    /// Another member started or stopped typing.
    #[serde(rename_all = "camelCase")]
    UserTyping {
        /// Session.
        session_id: Uuid,
        /// Typing user.
        user_id: Uuid,
        /// Typing state.
        is_typing: bool,
    },
    /// Failure of the caller's last event.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Human-readable message.
        message: String,
        /// Error code.
        code: String,
    },
}

impl From<&ApiError> for ServerEvent {
    fn from(err: &ApiError) -> Self {
        ServerEvent::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

impl From<&ProtocolError> for ServerEvent {
    fn from(err: &ProtocolError) -> Self {
        ServerEvent::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
