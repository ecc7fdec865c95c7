//! Option order settlement engine.
//!
//! An order is opened ACTIVE against a balance check and later settled by its
//! owner. Settlement is exactly-once: the transition and the balance credit
//! happen in one conditional store operation, so of any number of concurrent
//! settle calls for one order exactly one succeeds.

use crate::db::{Order, OrderStatus, Store};
use crate::error::ApiError;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest accepted order term (ten years).
pub const MAX_DURATION_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Most decimal places accepted for `amount`.
pub const MAX_AMOUNT_SCALE: u32 = 8;

/// Most decimal places accepted for `ror`.
pub const MAX_ROR_SCALE: u32 = 4;

/// Most decimal places accepted for `entryPrice`.
pub const MAX_PRICE_SCALE: u32 = 10;

/// Largest accepted stake, 10^12. Together with the scale limits this keeps
/// `amount * ror / 100` inside `Decimal`'s exact range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Parameters for opening an option order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    /// Instrument, e.g. "BTC/USD".
    pub symbol: String,
    /// Stake.
    pub amount: Decimal,
    /// Term in seconds.
    pub duration_seconds: i64,
    /// Rate of return in percent, in (0, 100].
    pub ror: Decimal,
    /// Instrument price at open.
    pub entry_price: Decimal,
}

impl OpenOrder {
    fn validate(&self) -> Result<(), ApiError> {
        if self.symbol.trim().is_empty() {
            return Err(ApiError::InvalidRequest("symbol is required".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ApiError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }
        if self.amount > MAX_AMOUNT {
            return Err(ApiError::InvalidRequest(format!(
                "amount must be at most {MAX_AMOUNT}"
            )));
        }
        if self.amount.scale() > MAX_AMOUNT_SCALE {
            return Err(ApiError::InvalidRequest(format!(
                "amount allows at most {MAX_AMOUNT_SCALE} decimal places"
            )));
        }
        if self.ror <= Decimal::ZERO || self.ror > Decimal::ONE_HUNDRED {
            return Err(ApiError::InvalidRequest(
                "ror must be greater than 0 and at most 100".to_string(),
            ));
        }
        if self.ror.scale() > MAX_ROR_SCALE {
            return Err(ApiError::InvalidRequest(format!(
                "ror allows at most {MAX_ROR_SCALE} decimal places"
            )));
        }
        if self.duration_seconds <= 0 || self.duration_seconds > MAX_DURATION_SECONDS {
            return Err(ApiError::InvalidRequest(format!(
                "duration must be between 1 and {MAX_DURATION_SECONDS} seconds"
            )));
        }
        if self.entry_price <= Decimal::ZERO {
            return Err(ApiError::InvalidRequest(
                "entryPrice must be positive".to_string(),
            ));
        }
        if self.entry_price.scale() > MAX_PRICE_SCALE {
            return Err(ApiError::InvalidRequest(format!(
                "entryPrice allows at most {MAX_PRICE_SCALE} decimal places"
            )));
        }
        Ok(())
    }
}

/// Result of a successful settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// The completed order.
    pub order: Order,
    /// Owner balance after the credit.
    pub new_balance: Decimal,
}

/// Profit credited for a won order: `amount * ror / 100`, exact.
#[must_use]
pub fn profit_for(amount: Decimal, ror: Decimal) -> Decimal {
    amount * ror / Decimal::ONE_HUNDRED
}

/// Opens, settles and reads option orders.
#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn Store>,
}

impl OrderEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Opens an ACTIVE order for `user_id`.
    ///
    /// The balance is checked but not reserved.
    ///
    /// # Errors
    /// - `InvalidRequest` on bad parameters.
    /// - `UserNotFound` if the user is missing or inactive.
    /// - `InsufficientBalance` if the balance is below `amount`.
    pub async fn open(&self, user_id: Uuid, params: OpenOrder) -> Result<Order, ApiError> {
        params.validate()?;

        let user = self
            .store
            .get_active_user(user_id)
            .await?
            .ok_or_else(|| ApiError::UserNotFound(user_id.to_string()))?;

        if user.account_balance < params.amount {
            return Err(ApiError::InsufficientBalance {
                available: user.account_balance,
                required: params.amount,
            });
        }

        let order = Order::open(
            user_id,
            params.symbol.trim().to_string(),
            params.amount,
            params.ror,
            params.entry_price,
            params.duration_seconds,
            Utc::now(),
        );
        self.store.insert_order(&order).await?;

        info!(
            "Opened order {} for user {}: {} {} at {}% ROR, matures {}",
            order.id, user_id, order.amount, order.symbol, order.ror, order.end_date
        );
        Ok(order)
    }

    /// Settles an ACTIVE order owned by `user_id` and credits the profit.
    ///
    /// # Errors
    /// - `OrderNotFound` if the order is missing or deactivated.
    /// - `Forbidden` if the requester does not own it.
    /// - `InvalidState` if it is no longer ACTIVE, including when a
    ///   concurrent settle won the race.
    pub async fn settle(&self, user_id: Uuid, order_id: Uuid) -> Result<Settlement, ApiError> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Active {
            return Err(already_settled(&order));
        }

        let profit = profit_for(order.amount, order.ror);
        let Some(settled) = self
            .store
            .complete_order(order.id, profit, Utc::now())
            .await?
        else {
            warn!("Order {} lost a concurrent settlement race", order.id);
            return Err(ApiError::InvalidState(format!(
                "Order {} is not active",
                order.id
            )));
        };

        info!(
            "Settled order {}: profit {}, balance of user {} is now {}",
            settled.order.id, profit, user_id, settled.balance
        );
        Ok(Settlement {
            order: settled.order,
            new_balance: settled.balance,
        })
    }

    /// Returns an order owned by `user_id`.
    ///
    /// # Errors
    /// `OrderNotFound` or `Forbidden`.
    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ApiError> {
        self.owned_order(user_id, order_id).await
    }

    /// Lists the caller's orders, newest first.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn list_for(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
        Ok(self.store.list_orders(user_id).await?)
    }

    async fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ApiError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ApiError::OrderNotFound(order_id.to_string()))?;
        if order.user_id != user_id {
            return Err(ApiError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }
        Ok(order)
    }
}

fn already_settled(order: &Order) -> ApiError {
    ApiError::InvalidState(format!("Order {} is {}", order.id, order.status))
}
