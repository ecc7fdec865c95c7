//! WebSocket client for the realtime chat gateway.

use crate::error::Error;
use crate::types::ChatMessage;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

/// Events received from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum WsEvent {
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
    /// Failure of the last command.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Error message.
        message: String,
        /// Error code.
        code: String,
    },
}

/// Commands that can be sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum WsCommand {
    /// Join the rooms of every session the caller may access.
    JoinSessions,
    /// Join one session room.
    #[serde(rename_all = "camelCase")]
    JoinSession {
        /// Session.
        session_id: Uuid,
    },
    /// Post a message.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// Session.
        session_id: Uuid,
        /// Text body.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Image attachment URL.
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        /// Audio attachment URL.
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
    },
    /// Mark the other side's messages read.
    #[serde(rename_all = "camelCase")]
    MarkRead {
        /// Session.
        session_id: Uuid,
    },
    /// Typing indicator.
    #[serde(rename_all = "camelCase")]
    Typing {
        /// Session.
        session_id: Uuid,
        /// Typing state.
        is_typing: bool,
    },
}

/// WebSocket client for the chat gateway.
pub struct WsClient {
    rx: mpsc::Receiver<WsEvent>,
    tx: mpsc::Sender<WsCommand>,
}

impl WsClient {
    /// Connects to the WebSocket server.
    ///
    /// # Arguments
    /// * `url` - WebSocket URL with the access token, e.g.
    ///   `ws://localhost:8080/ws?token=...`
    ///
    /// # Errors
    /// Returns error if the connection or handshake fails, including a
    /// rejected credential.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let (ws_stream, _) = connect_async(url).await.map_err(Box::new)?;
        let (mut write, mut read) = ws_stream.split();

        // Channel for receiving events
        let (event_tx, event_rx) = mpsc::channel::<WsEvent>(100);

        // Channel for sending commands
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(100);

        // Spawn task to read events
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(event) = serde_json::from_str::<WsEvent>(&text)
                            && event_tx.send(event).await.is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Err(_) => break,
                    _ => {}
                }
            }
        });

        // Spawn task to send commands
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                if let Ok(json) = serde_json::to_string(&cmd)
                    && write.send(Message::Text(json.into())).await.is_err()
                {
                    return;
                }
            }
            // Client dropped.
            let _ = write.send(Message::Close(None)).await;
        });

        Ok(Self {
            rx: event_rx,
            tx: cmd_tx,
        })
    }

    /// Receives the next event from the server.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn recv(&mut self) -> Option<WsEvent> {
        self.rx.recv().await
    }

    /// Sends a command to the server.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn send(&self, cmd: WsCommand) -> Result<(), Error> {
        self.tx.send(cmd).await.map_err(|_| Error::ConnectionClosed)
    }

    /// Joins every session room the caller may access.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn join_sessions(&self) -> Result<(), Error> {
        self.send(WsCommand::JoinSessions).await
    }

    /// Joins one session room.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn join_session(&self, session_id: Uuid) -> Result<(), Error> {
        self.send(WsCommand::JoinSession { session_id }).await
    }

    /// Posts a text message.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn send_text(&self, session_id: Uuid, message: &str) -> Result<(), Error> {
        self.send(WsCommand::SendMessage {
            session_id,
            message: Some(message.to_string()),
            image_url: None,
            audio_url: None,
        })
        .await
    }

    /// Marks a session read.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn mark_read(&self, session_id: Uuid) -> Result<(), Error> {
        self.send(WsCommand::MarkRead { session_id }).await
    }

    /// Sends a typing indicator.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn typing(&self, session_id: Uuid, is_typing: bool) -> Result<(), Error> {
        self.send(WsCommand::Typing {
            session_id,
            is_typing,
        })
        .await
    }
}
