//! PostgreSQL-backed store.

use crate::db::{
    ChatMessage, ChatSession, ChatStatus, DatabasePool, MessageSlice, Order, SessionFilter,
    SettledOrder, Store, StoreError, StoreResult, UnreadFilter, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

// ============================================================================
// Column lists
// ============================================================================

const USER_COLUMNS: &str = "id, email, role, account_balance, is_active, created_at";

const ORDER_COLUMNS: &str = "id, user_id, symbol, amount, currency, ror, entry_price, \
     duration_seconds, status, start_date, end_date, profit, is_won, description, \
     is_active, created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id, user_id, admin_id, status, last_message_at, is_active, created_at";

const MESSAGE_COLUMNS: &str = "id, session_id, user_id, sender_type, message, image_url, \
     audio_url, is_read, read_at, is_active, created_at";

// ============================================================================
// Row mapping
// ============================================================================

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        account_balance: row.try_get("account_balance")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        ror: row.try_get("ror")?,
        entry_price: row.try_get("entry_price")?,
        duration_seconds: row.try_get("duration_seconds")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        profit: row.try_get("profit")?,
        is_won: row.try_get("is_won")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> StoreResult<ChatSession> {
    Ok(ChatSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        admin_id: row.try_get("admin_id")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        last_message_at: row.try_get("last_message_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> StoreResult<ChatMessage> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        user_id: row.try_get("user_id")?,
        sender_type: row.try_get::<String, _>("sender_type")?.parse()?,
        message: row.try_get("message")?,
        image_url: row.try_get("image_url")?,
        audio_url: row.try_get("audio_url")?,
        is_read: row.try_get("is_read")?,
        read_at: row.try_get("read_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// Store
// ============================================================================

/// Store backed by PostgreSQL.
///
/// Conditional operations are expressed as single guarded statements (or one
/// transaction for settlement), so the database arbitrates concurrent callers.
#[derive(Clone)]
pub struct PgStore {
    db: DatabasePool,
}

impl PgStore {
    /// Wraps an established pool.
    #[must_use]
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, role, account_balance, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.account_balance)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_active_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        );
        sqlx::query(&sql)
            .bind(order.id)
            .bind(order.user_id)
            .bind(&order.symbol)
            .bind(order.amount)
            .bind(&order.currency)
            .bind(order.ror)
            .bind(order.entry_price)
            .bind(order.duration_seconds)
            .bind(order.status.as_str())
            .bind(order.start_date)
            .bind(order.end_date)
            .bind(order.profit)
            .bind(order.is_won)
            .bind(&order.description)
            .bind(order.is_active)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND is_active");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = $1 AND is_active ORDER BY created_at DESC"
        );
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?
            .iter()
            .map(order_from_row)
            .collect()
    }

    async fn complete_order(
        &self,
        id: Uuid,
        profit: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<SettledOrder>> {
        let mut tx = self.db.pool().begin().await?;

        // The status guard makes this UPDATE the serialization point: a
        // concurrent settle blocks on the row lock and then matches nothing.
        let sql = format!(
            "UPDATE orders SET status = 'COMPLETED', profit = $2, is_won = TRUE, updated_at = $3 \
             WHERE id = $1 AND status = 'ACTIVE' AND is_active \
             RETURNING {ORDER_COLUMNS}"
        );
        let Some(row) = sqlx::query(&sql)
            .bind(id)
            .bind(profit)
            .bind(at)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };
        let order = order_from_row(&row)?;

        let balance: Decimal = sqlx::query(
            "UPDATE users SET account_balance = account_balance + $2 \
             WHERE id = $1 RETURNING account_balance",
        )
        .bind(order.user_id)
        .bind(profit)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::RowNotFound)?
        .try_get("account_balance")?;

        tx.commit().await?;
        Ok(Some(SettledOrder { order, balance }))
    }

    async fn insert_session(&self, session: &ChatSession) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO chat_sessions ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        sqlx::query(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.admin_id)
            .bind(session.status.as_str())
            .bind(session.last_message_at)
            .bind(session.is_active)
            .bind(session.created_at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1 AND is_active");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(session_from_row)
            .transpose()
    }

    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<ChatSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE user_id = $1 AND status = 'OPEN' AND is_active \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(session_from_row)
            .transpose()
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<ChatSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE is_active \
               AND ($1::uuid IS NULL OR user_id = $1 OR admin_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY last_message_at DESC"
        );
        sqlx::query(&sql)
            .bind(filter.participant)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(self.db.pool())
            .await?
            .iter()
            .map(session_from_row)
            .collect()
    }

    async fn assign_admin(
        &self,
        session_id: Uuid,
        admin_id: Uuid,
    ) -> StoreResult<Option<ChatSession>> {
        let sql = format!(
            "UPDATE chat_sessions SET admin_id = $2, status = $3 \
             WHERE id = $1 AND is_active RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(session_id)
            .bind(admin_id)
            .bind(ChatStatus::Open.as_str())
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(session_from_row)
            .transpose()
    }

    async fn set_session_status(
        &self,
        session_id: Uuid,
        status: ChatStatus,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE chat_sessions SET status = $2 WHERE id = $1 AND is_active")
                .bind(session_id)
                .bind(status.as_str())
                .execute(self.db.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_message(&self, message: &ChatMessage) -> StoreResult<Option<ChatMessage>> {
        let mut tx = self.db.pool().begin().await?;

        // Locks the session row so a concurrent close cannot interleave
        // between the status check and the insert. The timestamp is taken
        // after the lock, so it follows commit order.
        let stamped: Option<DateTime<Utc>> = sqlx::query_scalar(
            "UPDATE chat_sessions \
             SET last_message_at = GREATEST(last_message_at, clock_timestamp()) \
             WHERE id = $1 AND status = 'OPEN' AND is_active \
             RETURNING last_message_at",
        )
        .bind(message.session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(created_at) = stamped else {
            tx.rollback().await?;
            return Ok(None);
        };

        let sql = format!(
            "INSERT INTO chat_messages ({MESSAGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(message.id)
            .bind(message.session_id)
            .bind(message.user_id)
            .bind(message.sender_type.as_str())
            .bind(&message.message)
            .bind(&message.image_url)
            .bind(&message.audio_url)
            .bind(message.is_read)
            .bind(message.read_at)
            .bind(message.is_active)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(ChatMessage {
            created_at,
            ..message.clone()
        }))
    }

    async fn list_messages(
        &self,
        session_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<MessageSlice> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE session_id = $1 AND is_active \
             ORDER BY created_at ASC, id ASC OFFSET $2 LIMIT $3"
        );
        let messages = sqlx::query(&sql)
            .bind(session_id)
            .bind(to_i64(offset))
            .bind(to_i64(limit))
            .fetch_all(self.db.pool())
            .await?
            .iter()
            .map(message_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM chat_messages WHERE session_id = $1 AND is_active",
        )
        .bind(session_id)
        .fetch_one(self.db.pool())
        .await?
        .try_get("total")?;

        Ok(MessageSlice {
            messages,
            total: count_to_u64(total),
        })
    }

    async fn last_message(&self, session_id: Uuid) -> StoreResult<Option<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE session_id = $1 AND is_active \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(session_id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(message_from_row)
            .transpose()
    }

    async fn count_unread(&self, filter: UnreadFilter) -> StoreResult<u64> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM chat_messages m \
             JOIN chat_sessions s ON s.id = m.session_id \
             WHERE m.is_active AND NOT m.is_read AND m.sender_type = $1 AND s.is_active \
               AND ($2::uuid IS NULL OR s.id = $2) \
               AND ($3::uuid IS NULL OR s.user_id = $3) \
               AND ($4::uuid IS NULL OR s.admin_id = $4) \
               AND (NOT $5 OR s.status = 'OPEN')",
        )
        .bind(filter.sender_type.as_str())
        .bind(filter.session_id)
        .bind(filter.owner)
        .bind(filter.admin)
        .bind(filter.open_only)
        .fetch_one(self.db.pool())
        .await?
        .try_get("total")?;
        Ok(count_to_u64(total))
    }

    async fn mark_read(
        &self,
        session_id: Uuid,
        reader: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = TRUE, read_at = $3 \
             WHERE session_id = $1 AND user_id <> $2 AND NOT is_read AND is_active",
        )
        .bind(session_id)
        .bind(reader)
        .bind(at)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
