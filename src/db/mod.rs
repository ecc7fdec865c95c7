//! Persistence layer.
//!
//! The [`Store`] trait is the single arbiter of consistency for the service:
//! every check-then-act sequence in the order and chat modules either relies on
//! a conditional primitive exposed here or tolerates the race explicitly.
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: in-process maps behind a `parking_lot` mutex.
//! - [`PgStore`]: PostgreSQL through `sqlx`.

mod memory;
mod pool;
mod postgres;
mod schema;

pub use memory::MemoryStore;
pub use pool::DatabasePool;
pub use postgres::PgStore;
pub use schema::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Store-level failures, classified so callers can tell retryable faults from
/// caller errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique, foreign key or check constraint violated.
    #[error("constraint violated: {0}")]
    Conflict(String),
    /// Store unreachable, pool exhausted or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A row the operation required does not exist.
    #[error("row not found")]
    RowNotFound,
    /// A stored value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Any other database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::Database(ref db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::CheckViolation => StoreError::Conflict(db_err.message().to_string()),
                _ => StoreError::Database(err.to_string()),
            },
            sqlx::Error::RowNotFound => StoreError::RowNotFound,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which chat sessions to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Only sessions where this user is the owner or the assigned admin.
    pub participant: Option<Uuid>,
    /// Only sessions in this status.
    pub status: Option<ChatStatus>,
}

/// Which unread messages to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadFilter {
    /// Messages authored by this side.
    pub sender_type: SenderType,
    /// Restrict to one session.
    pub session_id: Option<Uuid>,
    /// Restrict to sessions owned by this user.
    pub owner: Option<Uuid>,
    /// Restrict to sessions assigned to this admin.
    pub admin: Option<Uuid>,
    /// Restrict to OPEN sessions.
    pub open_only: bool,
}

impl UnreadFilter {
    /// Unread messages from `sender_type`, across all sessions.
    #[must_use]
    pub fn from_sender(sender_type: SenderType) -> Self {
        Self {
            sender_type,
            session_id: None,
            owner: None,
            admin: None,
            open_only: false,
        }
    }
}

/// One page of messages plus the total message count of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSlice {
    /// Messages in ascending creation order.
    pub messages: Vec<ChatMessage>,
    /// Total active messages in the session.
    pub total: u64,
}

/// Outcome of the atomic settlement primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledOrder {
    /// The order after the transition.
    pub order: Order,
    /// Owner balance after the credit.
    pub balance: Decimal,
}

/// Persistent store contract.
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a user.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Fetches an active user.
    async fn get_active_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Inserts an order.
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    /// Fetches an active (not soft-deleted) order.
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// Lists active orders owned by `user_id`, newest first.
    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

    /// Atomically moves an ACTIVE order to COMPLETED with `profit`, marks it
    /// won, and credits `profit` to the owner's balance.
    ///
    /// Returns `None` without mutating anything when the order is no longer
    /// ACTIVE. Of any number of concurrent calls for one order, at most one
    /// returns `Some`.
    async fn complete_order(
        &self,
        id: Uuid,
        profit: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<SettledOrder>>;

    // ------------------------------------------------------------------
    // Chat sessions
    // ------------------------------------------------------------------

    /// Inserts a chat session.
    async fn insert_session(&self, session: &ChatSession) -> StoreResult<()>;

    /// Fetches an active chat session.
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<ChatSession>>;

    /// Most recently created OPEN session owned by `user_id`.
    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<ChatSession>>;

    /// Lists active sessions, most recent `last_message_at` first.
    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<ChatSession>>;

    /// Sets the assigned admin and re-opens the session.
    async fn assign_admin(
        &self,
        session_id: Uuid,
        admin_id: Uuid,
    ) -> StoreResult<Option<ChatSession>>;

    /// Updates the session status. Returns whether a session was updated.
    async fn set_session_status(&self, session_id: Uuid, status: ChatStatus)
    -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Chat messages
    // ------------------------------------------------------------------

    /// Inserts `message` and bumps the session's `last_message_at`, but only
    /// if the session is active and OPEN.
    ///
    /// `created_at` is assigned while the session is locked and never runs
    /// behind `last_message_at`, so a session's messages are stamped in commit
    /// order. Returns the stored message, or `None` if nothing was inserted.
    async fn append_message(&self, message: &ChatMessage) -> StoreResult<Option<ChatMessage>>;

    /// One page of a session's messages in ascending creation order.
    async fn list_messages(
        &self,
        session_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<MessageSlice>;

    /// Latest message of a session.
    async fn last_message(&self, session_id: Uuid) -> StoreResult<Option<ChatMessage>>;

    /// Counts unread messages matching `filter`.
    async fn count_unread(&self, filter: UnreadFilter) -> StoreResult<u64>;

    /// Marks every unread message in the session not authored by `reader` as
    /// read. Returns the number of messages updated.
    async fn mark_read(
        &self,
        session_id: Uuid,
        reader: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct RejectedRow {
        message: String,
        kind: ErrorKind,
    }

    impl DatabaseError for RejectedRow {
        fn message(&self) -> &str {
            &self.message
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match &self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn database_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(RejectedRow {
            message: "rejected".to_string(),
            kind,
        }))
    }

    #[test]
    fn test_constraint_violations_are_conflicts() {
        for kind in [ErrorKind::UniqueViolation, ErrorKind::CheckViolation] {
            let err = StoreError::from(database_error(kind));
            assert!(matches!(err, StoreError::Conflict(ref m) if m == "rejected"));
        }
    }

    #[test]
    fn test_other_database_errors_stay_internal() {
        let err = StoreError::from(database_error(ErrorKind::Other));
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }
}
