//! Database schema types.

use crate::db::StoreError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Implements `as_str`, `Display` and `FromStr` for a text-backed enum column.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Column representation.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(StoreError::Decode(format!(
                        "unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular customer.
    Customer,
    /// Support/back-office administrator.
    Admin,
}

text_enum!(Role {
    Customer => "CUSTOMER",
    Admin => "ADMIN",
});

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Opened, awaiting settlement.
    Active,
    /// Settled and credited.
    Completed,
    /// Cancelled before settlement.
    Cancelled,
    /// Failed before settlement.
    Failed,
}

text_enum!(OrderStatus {
    Active => "ACTIVE",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Failed => "FAILED",
});

/// Chat session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatStatus {
    /// Accepting messages.
    Open,
    /// Closed; no further messages.
    Closed,
    /// Reserved. Never assigned by this service.
    Waiting,
}

text_enum!(ChatStatus {
    Open => "OPEN",
    Closed => "CLOSED",
    Waiting => "WAITING",
});

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    /// Customer-authored.
    User,
    /// Admin-authored.
    Admin,
}

text_enum!(SenderType {
    User => "USER",
    Admin => "ADMIN",
});

impl From<Role> for SenderType {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => SenderType::Admin,
            Role::Customer => SenderType::User,
        }
    }
}

impl SenderType {
    /// The sender type whose messages a viewer with `role` has to read.
    #[must_use]
    pub fn counterpart_of(role: Role) -> Self {
        match role {
            Role::Admin => SenderType::User,
            Role::Customer => SenderType::Admin,
        }
    }
}

/// User record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Role.
    pub role: Role,
    /// Spendable balance.
    pub account_balance: Decimal,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an active user with the given balance.
    #[must_use]
    pub fn new(email: impl Into<String>, role: Role, account_balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            role,
            account_balance,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Option order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Instrument, e.g. "BTC/USD".
    pub symbol: String,
    /// Stake.
    pub amount: Decimal,
    /// Settlement currency.
    pub currency: String,
    /// Rate of return in percent.
    pub ror: Decimal,
    /// Instrument price at open.
    pub entry_price: Decimal,
    /// Term in seconds.
    pub duration_seconds: i64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Open time.
    pub start_date: DateTime<Utc>,
    /// Maturity, `start_date + duration_seconds`.
    pub end_date: DateTime<Utc>,
    /// Credited profit, set on settlement.
    pub profit: Option<Decimal>,
    /// Outcome, set on settlement.
    pub is_won: Option<bool>,
    /// Human-readable summary.
    pub description: String,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Default settlement currency.
pub const DEFAULT_CURRENCY: &str = "USDT";

impl Order {
    /// Creates an ACTIVE order opened at `now`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        user_id: Uuid,
        symbol: String,
        amount: Decimal,
        ror: Decimal,
        entry_price: Decimal,
        duration_seconds: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let description = format!(
            "Option order: {} - {}% ROR for {}s",
            symbol, ror, duration_seconds
        );
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            ror,
            entry_price,
            duration_seconds,
            status: OrderStatus::Active,
            start_date: now,
            end_date: now + Duration::seconds(duration_seconds),
            profit: None,
            is_won: None,
            description,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Chat session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Unique identifier.
    pub id: Uuid,
    /// Customer who owns the session.
    pub user_id: Uuid,
    /// Assigned admin, if any.
    pub admin_id: Option<Uuid>,
    /// Status.
    pub status: ChatStatus,
    /// Time of the latest message (creation time until then).
    pub last_message_at: DateTime<Utc>,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates an OPEN, unassigned session.
    #[must_use]
    pub fn open(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            admin_id: None,
            status: ChatStatus::Open,
            last_message_at: now,
            is_active: true,
            created_at: now,
        }
    }
}

/// Chat message record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Author side at send time.
    pub sender_type: SenderType,
    /// Text body, possibly empty when an attachment is present.
    pub message: String,
    /// Image attachment.
    pub image_url: Option<String>,
    /// Audio attachment.
    pub audio_url: Option<String>,
    /// Read flag.
    pub is_read: bool,
    /// When the message was read.
    pub read_at: Option<DateTime<Utc>>,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
