//! Unit tests for the chat session registry.

use super::*;
use crate::db::{MemoryStore, User};
use rust_decimal::Decimal;

struct Fixture {
    store: Arc<MemoryStore>,
    chat: ChatRegistry,
    customer: AuthUser,
    other_customer: AuthUser,
    admin: AuthUser,
}

async fn add_user(store: &MemoryStore, email: &str, role: Role) -> AuthUser {
    let user = User::new(email, role, Decimal::ZERO);
    store.insert_user(&user).await.unwrap();
    AuthUser {
        user_id: user.id,
        role,
    }
}

async fn fixture() -> Fixture {
    fixture_with(ChatConfig::default()).await
}

async fn fixture_with(limits: ChatConfig) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let customer = add_user(&store, "alice@example.com", Role::Customer).await;
    let other_customer = add_user(&store, "bob@example.com", Role::Customer).await;
    let admin = add_user(&store, "support@example.com", Role::Admin).await;
    let chat = ChatRegistry::new(store.clone(), limits);
    Fixture {
        store,
        chat,
        customer,
        other_customer,
        admin,
    }
}

fn text(body: &str) -> NewMessage {
    NewMessage {
        body: Some(body.to_string()),
        ..NewMessage::default()
    }
}

// ============================================================================
// Access check
// ============================================================================

#[test]
fn test_can_access_table() {
    let owner = Uuid::new_v4();
    let assigned = Uuid::new_v4();
    let mut session = ChatSession::open(owner, Utc::now());
    session.admin_id = Some(assigned);

    let as_customer = |user_id| AuthUser {
        user_id,
        role: Role::Customer,
    };
    let any_admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    };

    assert!(can_access(&session, &any_admin));
    assert!(can_access(&session, &as_customer(owner)));
    assert!(can_access(&session, &as_customer(assigned)));
    assert!(!can_access(&session, &as_customer(Uuid::new_v4())));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let f = fixture().await;

    let first = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    let second = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status, ChatStatus::Open);
    assert!(first.admin_id.is_none());
}

#[tokio::test]
async fn test_get_or_create_after_close_opens_new_session() {
    let f = fixture().await;
    let first = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.close(first.id, &f.customer).await.unwrap();

    let second = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_list_sessions_scoping_and_unread() {
    let f = fixture().await;
    let mine = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    let theirs = f
        .chat
        .get_or_create_open_session(f.other_customer.user_id)
        .await
        .unwrap();

    f.chat.append(mine.id, &f.customer, text("hello")).await.unwrap();
    f.chat.append(mine.id, &f.admin, text("hi, how can I help?")).await.unwrap();

    let customer_view = f.chat.list_sessions_for(&f.customer, None).await.unwrap();
    assert_eq!(customer_view.len(), 1);
    assert_eq!(customer_view[0].session.id, mine.id);
    assert_eq!(customer_view[0].unread_count, 1);
    assert_eq!(
        customer_view[0].last_message.as_ref().map(|m| m.message.as_str()),
        Some("hi, how can I help?")
    );

    let admin_view = f.chat.list_sessions_for(&f.admin, None).await.unwrap();
    assert_eq!(admin_view.len(), 2);
    // Most recent activity first.
    assert_eq!(admin_view[0].session.id, mine.id);
    assert_eq!(admin_view[0].unread_count, 1);
    assert_eq!(admin_view[1].session.id, theirs.id);
    assert_eq!(admin_view[1].unread_count, 0);
}

#[tokio::test]
async fn test_admin_status_filter() {
    let f = fixture().await;
    let closed_session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.close(closed_session.id, &f.customer).await.unwrap();
    let open_session = f
        .chat
        .get_or_create_open_session(f.other_customer.user_id)
        .await
        .unwrap();

    let closed = f
        .chat
        .list_sessions_for(&f.admin, Some(ChatStatus::Closed))
        .await
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].session.id, closed_session.id);

    let open = f
        .chat
        .list_sessions_for(&f.admin, Some(ChatStatus::Open))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].session.id, open_session.id);
}

#[tokio::test]
async fn test_joinable_session_ids() {
    let f = fixture().await;
    let mine = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat
        .get_or_create_open_session(f.other_customer.user_id)
        .await
        .unwrap();

    assert_eq!(f.chat.joinable_session_ids(&f.customer).await.unwrap(), vec![mine.id]);
    assert_eq!(f.chat.joinable_session_ids(&f.admin).await.unwrap().len(), 2);
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_append_sets_sender_type_and_bumps_session() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let posted = f.chat.append(session.id, &f.customer, text("  hello  ")).await.unwrap();
    assert_eq!(posted.message.sender_type, SenderType::User);
    assert_eq!(posted.message.message, "hello");
    assert!(!posted.message.is_read);
    assert_eq!(posted.session.last_message_at, posted.message.created_at);

    let reply = f.chat.append(session.id, &f.admin, text("hi")).await.unwrap();
    assert_eq!(reply.message.sender_type, SenderType::Admin);
    assert!(reply.message.created_at >= posted.message.created_at);
    assert_eq!(reply.session.last_message_at, reply.message.created_at);
}

#[tokio::test]
async fn test_append_requires_content() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let blank = NewMessage {
        body: Some("   ".to_string()),
        image_url: Some(" ".to_string()),
        audio_url: None,
    };
    assert!(matches!(
        f.chat.append(session.id, &f.customer, blank).await,
        Err(ApiError::InvalidRequest(_))
    ));

    let image_only = NewMessage {
        image_url: Some("https://cdn.example.com/a.png".to_string()),
        ..NewMessage::default()
    };
    let posted = f.chat.append(session.id, &f.customer, image_only).await.unwrap();
    assert_eq!(posted.message.message, "");
    assert!(posted.message.image_url.is_some());
}

#[tokio::test]
async fn test_append_rejects_long_body() {
    let f = fixture_with(ChatConfig {
        max_message_length: 10,
        ..ChatConfig::default()
    })
    .await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    assert!(f.chat.append(session.id, &f.customer, text("0123456789")).await.is_ok());
    assert!(matches!(
        f.chat.append(session.id, &f.customer, text("0123456789a")).await,
        Err(ApiError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_append_denied_looks_like_missing() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let denied = f.chat.append(session.id, &f.other_customer, text("hi")).await;
    let missing = f.chat.append(Uuid::new_v4(), &f.other_customer, text("hi")).await;

    match (denied, missing) {
        (Err(ApiError::NotFound(a)), Err(ApiError::NotFound(b))) => assert_eq!(a, b),
        other => panic!("expected two NotFound errors, got {other:?}"),
    }
}

#[tokio::test]
async fn test_append_to_closed_session_is_invalid_state() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.close(session.id, &f.customer).await.unwrap();

    let result = f.chat.append(session.id, &f.customer, text("anyone?")).await;
    assert!(matches!(result, Err(ApiError::InvalidState(_))));
}

#[tokio::test]
async fn test_list_messages_pagination() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    for i in 0..5 {
        f.chat
            .append(session.id, &f.customer, text(&format!("m{i}")))
            .await
            .unwrap();
    }

    let page = f
        .chat
        .list_messages(
            session.id,
            &f.customer,
            PageRequest {
                page: Some(2),
                limit: Some(2),
            },
        )
        .await
        .unwrap();

    let bodies: Vec<&str> = page.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["m2", "m3"]);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);

    let last = f
        .chat
        .list_messages(
            session.id,
            &f.customer,
            PageRequest {
                page: Some(3),
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(last.messages.len(), 1);
    assert_eq!(last.messages[0].message, "m4");
}

#[tokio::test]
async fn test_list_messages_defaults_and_validation() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let page = f
        .chat
        .list_messages(session.id, &f.customer, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 50);
    assert_eq!(page.pagination.total_pages, 0);

    for request in [
        PageRequest {
            page: Some(0),
            limit: None,
        },
        PageRequest {
            page: None,
            limit: Some(0),
        },
        PageRequest {
            page: None,
            limit: Some(101),
        },
    ] {
        assert!(matches!(
            f.chat.list_messages(session.id, &f.customer, request).await,
            Err(ApiError::InvalidRequest(_))
        ));
    }
}

#[tokio::test]
async fn test_admin_bypasses_ownership_on_list_messages() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.append(session.id, &f.customer, text("help")).await.unwrap();

    let page = f
        .chat
        .list_messages(session.id, &f.admin, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.messages.len(), 1);

    let denied = f
        .chat
        .list_messages(session.id, &f.other_customer, PageRequest::default())
        .await;
    assert!(matches!(denied, Err(ApiError::NotFound(_))));
}

// ============================================================================
// Read state
// ============================================================================

#[tokio::test]
async fn test_mark_read_marks_only_other_authors() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.append(session.id, &f.customer, text("q1")).await.unwrap();
    f.chat.append(session.id, &f.customer, text("q2")).await.unwrap();
    f.chat.append(session.id, &f.admin, text("a1")).await.unwrap();

    assert_eq!(f.chat.mark_read(session.id, &f.admin).await.unwrap(), Some(2));
    assert_eq!(f.chat.mark_read(session.id, &f.admin).await.unwrap(), Some(0));
    assert_eq!(f.chat.mark_read(session.id, &f.customer).await.unwrap(), Some(1));

    let page = f
        .chat
        .list_messages(session.id, &f.customer, PageRequest::default())
        .await
        .unwrap();
    assert!(page.messages.iter().all(|m| m.is_read && m.read_at.is_some()));
}

#[tokio::test]
async fn test_mark_read_on_inaccessible_session_is_noop() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.append(session.id, &f.customer, text("private")).await.unwrap();

    assert_eq!(f.chat.mark_read(session.id, &f.other_customer).await.unwrap(), None);
    assert_eq!(f.chat.mark_read(Uuid::new_v4(), &f.customer).await.unwrap(), None);
    assert_eq!(f.chat.unread_count(&f.customer).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unread_count_by_role() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.append(session.id, &f.customer, text("q1")).await.unwrap();
    f.chat.append(session.id, &f.customer, text("q2")).await.unwrap();

    // Unassigned sessions do not count for an admin.
    assert_eq!(f.chat.unread_count(&f.admin).await.unwrap(), 0);

    f.chat.assign_admin(session.id, f.admin.user_id).await.unwrap();
    assert_eq!(f.chat.unread_count(&f.admin).await.unwrap(), 2);

    f.chat.append(session.id, &f.admin, text("a1")).await.unwrap();
    assert_eq!(f.chat.unread_count(&f.customer).await.unwrap(), 1);

    f.chat.close(session.id, &f.admin).await.unwrap();
    assert_eq!(f.chat.unread_count(&f.admin).await.unwrap(), 0);
}

// ============================================================================
// Assignment and closing
// ============================================================================

#[tokio::test]
async fn test_assign_admin_reopens_session() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.close(session.id, &f.customer).await.unwrap();

    let assigned = f.chat.assign_admin(session.id, f.admin.user_id).await.unwrap();
    assert_eq!(assigned.admin_id, Some(f.admin.user_id));
    assert_eq!(assigned.status, ChatStatus::Open);
}

#[tokio::test]
async fn test_assign_requires_active_admin_and_session() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let not_admin = f.chat.assign_admin(session.id, f.other_customer.user_id).await;
    assert!(matches!(not_admin, Err(ApiError::NotFound(_))));

    let no_session = f.chat.assign_admin(Uuid::new_v4(), f.admin.user_id).await;
    assert!(matches!(no_session, Err(ApiError::NotFound(_))));

    f.store.deactivate_user(f.admin.user_id);
    let inactive = f.chat.assign_admin(session.id, f.admin.user_id).await;
    assert!(matches!(inactive, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_assigned_admin_keeps_access_after_role_change() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();
    f.chat.assign_admin(session.id, f.admin.user_id).await.unwrap();

    let demoted = AuthUser {
        user_id: f.admin.user_id,
        role: Role::Customer,
    };
    assert!(f.chat.accessible_session(session.id, &demoted).await.is_ok());
}

#[tokio::test]
async fn test_close_requires_access() {
    let f = fixture().await;
    let session = f.chat.get_or_create_open_session(f.customer.user_id).await.unwrap();

    let denied = f.chat.close(session.id, &f.other_customer).await;
    assert!(matches!(denied, Err(ApiError::NotFound(_))));

    let closed = f.chat.close(session.id, &f.customer).await.unwrap();
    assert_eq!(closed.status, ChatStatus::Closed);
}
