//! In-process store used by tests and database-less deployments.

use crate::db::{
    ChatMessage, ChatSession, ChatStatus, MessageSlice, Order, OrderStatus, SessionFilter,
    SettledOrder, Store, StoreError, StoreResult, UnreadFilter, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    orders: HashMap<Uuid, Order>,
    sessions: HashMap<Uuid, ChatSession>,
    /// Messages per session in insertion (= creation) order.
    messages: HashMap<Uuid, Vec<ChatMessage>>,
}

/// Store backed by in-process maps.
///
/// All tables sit behind one mutex, so every trait method is a single
/// critical section. This is the memory equivalent of a database transaction
/// and gives `complete_order` and `append_message` their conditional,
/// all-or-nothing semantics.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of a user, if present.
    pub fn balance_of(&self, user_id: Uuid) -> Option<Decimal> {
        self.tables
            .lock()
            .users
            .get(&user_id)
            .map(|u| u.account_balance)
    }

    /// Soft-deactivates a user.
    pub fn deactivate_user(&self, user_id: Uuid) -> bool {
        match self.tables.lock().users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }

    /// Number of stored orders, active or not.
    pub fn order_count(&self) -> usize {
        self.tables.lock().orders.len()
    }
}

fn session_matches(session: &ChatSession, filter: &SessionFilter) -> bool {
    if !session.is_active {
        return false;
    }
    if let Some(participant) = filter.participant
        && session.user_id != participant
        && session.admin_id != Some(participant)
    {
        return false;
    }
    if let Some(status) = filter.status
        && session.status != status
    {
        return false;
    }
    true
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if tables.users.contains_key(&user.id)
            || tables.users.values().any(|u| u.email == user.email)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.email
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_active_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .users
            .get(&id)
            .filter(|u| u.is_active)
            .cloned())
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if !tables.users.contains_key(&order.user_id) {
            return Err(StoreError::Conflict(format!(
                "order owner {} does not exist",
                order.user_id
            )));
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self
            .tables
            .lock()
            .orders
            .get(&id)
            .filter(|o| o.is_active)
            .cloned())
    }

    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let tables = self.tables.lock();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.is_active)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn complete_order(
        &self,
        id: Uuid,
        profit: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<SettledOrder>> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;

        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        if order.status != OrderStatus::Active || !order.is_active {
            return Ok(None);
        }
        let Some(owner) = tables.users.get_mut(&order.user_id) else {
            return Err(StoreError::RowNotFound);
        };

        order.status = OrderStatus::Completed;
        order.profit = Some(profit);
        order.is_won = Some(true);
        order.updated_at = at;
        owner.account_balance += profit;

        Ok(Some(SettledOrder {
            order: order.clone(),
            balance: owner.account_balance,
        }))
    }

    async fn insert_session(&self, session: &ChatSession) -> StoreResult<()> {
        self.tables
            .lock()
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        Ok(self
            .tables
            .lock()
            .sessions
            .get(&id)
            .filter(|s| s.is_active)
            .cloned())
    }

    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<ChatSession>> {
        Ok(self
            .tables
            .lock()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active && s.status == ChatStatus::Open)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<ChatSession>> {
        let tables = self.tables.lock();
        let mut sessions: Vec<ChatSession> = tables
            .sessions
            .values()
            .filter(|s| session_matches(s, &filter))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(sessions)
    }

    async fn assign_admin(
        &self,
        session_id: Uuid,
        admin_id: Uuid,
    ) -> StoreResult<Option<ChatSession>> {
        let mut tables = self.tables.lock();
        Ok(tables
            .sessions
            .get_mut(&session_id)
            .filter(|s| s.is_active)
            .map(|session| {
                session.admin_id = Some(admin_id);
                session.status = ChatStatus::Open;
                session.clone()
            }))
    }

    async fn set_session_status(
        &self,
        session_id: Uuid,
        status: ChatStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock();
        match tables.sessions.get_mut(&session_id) {
            Some(session) if session.is_active => {
                session.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_message(&self, message: &ChatMessage) -> StoreResult<Option<ChatMessage>> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;

        let mut stored = message.clone();
        match tables.sessions.get_mut(&message.session_id) {
            Some(session) if session.is_active && session.status == ChatStatus::Open => {
                stored.created_at = Utc::now().max(session.last_message_at);
                session.last_message_at = stored.created_at;
            }
            _ => return Ok(None),
        }
        tables
            .messages
            .entry(message.session_id)
            .or_default()
            .push(stored.clone());
        Ok(Some(stored))
    }

    async fn list_messages(
        &self,
        session_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<MessageSlice> {
        let tables = self.tables.lock();
        let all: Vec<&ChatMessage> = tables
            .messages
            .get(&session_id)
            .map(|msgs| msgs.iter().filter(|m| m.is_active).collect())
            .unwrap_or_default();

        let total = all.len() as u64;
        let messages = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(MessageSlice { messages, total })
    }

    async fn last_message(&self, session_id: Uuid) -> StoreResult<Option<ChatMessage>> {
        Ok(self
            .tables
            .lock()
            .messages
            .get(&session_id)
            .and_then(|msgs| msgs.iter().rev().find(|m| m.is_active))
            .cloned())
    }

    async fn count_unread(&self, filter: UnreadFilter) -> StoreResult<u64> {
        let tables = self.tables.lock();
        let count = tables
            .messages
            .iter()
            .filter(|(session_id, _)| {
                if let Some(wanted) = filter.session_id
                    && **session_id != wanted
                {
                    return false;
                }
                let Some(session) = tables.sessions.get(*session_id) else {
                    return false;
                };
                session.is_active
                    && filter.owner.is_none_or(|owner| session.user_id == owner)
                    && filter.admin.is_none_or(|admin| session.admin_id == Some(admin))
                    && (!filter.open_only || session.status == ChatStatus::Open)
            })
            .flat_map(|(_, msgs)| msgs.iter())
            .filter(|m| m.is_active && !m.is_read && m.sender_type == filter.sender_type)
            .count();
        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        session_id: Uuid,
        reader: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.lock();
        let mut updated = 0;
        if let Some(msgs) = tables.messages.get_mut(&session_id) {
            for msg in msgs
                .iter_mut()
                .filter(|m| m.is_active && !m.is_read && m.user_id != reader)
            {
                msg.is_read = true;
                msg.read_at = Some(at);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Role, SenderType};
    use rust_decimal_macros::dec;

    fn message(session_id: Uuid, author: Uuid, sender_type: SenderType) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id: author,
            sender_type,
            message: "hi".to_string(),
            image_url: None,
            audio_url: None,
            is_read: false,
            read_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_complete_order_only_once() {
        let store = MemoryStore::new();
        let user = User::new("u@example.com", Role::Customer, dec!(100));
        store.insert_user(&user).await.unwrap();
        let order = Order::open(
            user.id,
            "BTC/USD".to_string(),
            dec!(50),
            dec!(10),
            dec!(30000),
            60,
            Utc::now(),
        );
        store.insert_order(&order).await.unwrap();

        let first = store
            .complete_order(order.id, dec!(5), Utc::now())
            .await
            .unwrap();
        let second = store
            .complete_order(order.id, dec!(5), Utc::now())
            .await
            .unwrap();

        let settled = first.expect("first completion succeeds");
        assert_eq!(settled.balance, dec!(105));
        assert_eq!(settled.order.status, OrderStatus::Completed);
        assert!(second.is_none());
        assert_eq!(store.balance_of(user.id), Some(dec!(105)));
    }

    #[tokio::test]
    async fn test_insert_order_requires_owner() {
        let store = MemoryStore::new();
        let order = Order::open(
            Uuid::new_v4(),
            "ETH/USD".to_string(),
            dec!(1),
            dec!(1),
            dec!(1),
            1,
            Utc::now(),
        );
        let result = store.insert_order(&order).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(&User::new("dup@example.com", Role::Customer, dec!(0)))
            .await
            .unwrap();
        let result = store
            .insert_user(&User::new("dup@example.com", Role::Admin, dec!(0)))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_append_rejected_on_closed_session() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let session = ChatSession::open(owner, Utc::now());
        store.insert_session(&session).await.unwrap();

        assert!(
            store
                .append_message(&message(session.id, owner, SenderType::User))
                .await
                .unwrap()
                .is_some()
        );
        store
            .set_session_status(session.id, ChatStatus::Closed)
            .await
            .unwrap();
        assert!(
            store
                .append_message(&message(session.id, owner, SenderType::User))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_append_stamps_in_commit_order() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let session = ChatSession::open(owner, Utc::now());
        store.insert_session(&session).await.unwrap();

        // Built first, committed last.
        let early = message(session.id, owner, SenderType::User);
        let late = message(session.id, owner, SenderType::User);
        let first = store.append_message(&late).await.unwrap().unwrap();
        let second = store.append_message(&early).await.unwrap().unwrap();

        assert!(second.created_at >= first.created_at);
        let slice = store.list_messages(session.id, 0, 10).await.unwrap();
        let ids: Vec<Uuid> = slice.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![late.id, early.id]);
        assert!(
            slice
                .messages
                .windows(2)
                .all(|pair| pair[0].created_at <= pair[1].created_at)
        );
        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.last_message_at, second.created_at);
    }

    #[tokio::test]
    async fn test_append_never_moves_last_message_backwards() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let future = Utc::now() + chrono::Duration::seconds(60);
        let session = ChatSession::open(owner, future);
        store.insert_session(&session).await.unwrap();

        let stored = store
            .append_message(&message(session.id, owner, SenderType::User))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.created_at, future);
    }

    #[tokio::test]
    async fn test_mark_read_skips_own_messages() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let session = ChatSession::open(owner, Utc::now());
        store.insert_session(&session).await.unwrap();
        store
            .append_message(&message(session.id, owner, SenderType::User))
            .await
            .unwrap();
        store
            .append_message(&message(session.id, admin, SenderType::Admin))
            .await
            .unwrap();

        let updated = store.mark_read(session.id, owner, Utc::now()).await.unwrap();
        assert_eq!(updated, 1);

        let unread_from_user = store
            .count_unread(UnreadFilter::from_sender(SenderType::User))
            .await
            .unwrap();
        assert_eq!(unread_from_user, 1);
    }

    #[tokio::test]
    async fn test_list_sessions_participant_filter() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let mine = ChatSession::open(owner, Utc::now());
        let other = ChatSession::open(Uuid::new_v4(), Utc::now());
        store.insert_session(&mine).await.unwrap();
        store.insert_session(&other).await.unwrap();
        store.assign_admin(other.id, admin).await.unwrap();

        let owned = store
            .list_sessions(SessionFilter {
                participant: Some(owner),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, mine.id);

        let assigned = store
            .list_sessions(SessionFilter {
                participant: Some(admin),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, other.id);

        let all = store.list_sessions(SessionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
