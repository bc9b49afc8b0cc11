//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `huddle_test`)
//!   `TEST_DB_PASSWORD` (default: `huddle_test`)
//!   `TEST_DB_NAME` (default: `huddle_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use huddle_db::entities::{direct_message, group, group_member, org_member, organization, user};
use huddle_db::repositories::{
    DirectMessageRepository, GroupMessageRepository, GroupRepository, OrganizationRepository,
    UserRepository,
};
use huddle_db::test_utils::TestDatabase;
use sea_orm::Set;
use std::sync::Arc;
use ulid::Ulid;

fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

fn user_model(username: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(new_id()),
        username: Set(username.to_string()),
        email: Set(Some(format!("{username}@example.com"))),
        password_hash: Set("$argon2id$stub".to_string()),
        token: Set(Some(new_id())),
        first_name: Set(Some(username.to_string())),
        last_name: Set(Some("Test".to_string())),
        avatar_url: Set(None),
        active_org_id: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn dm_model(sender: &user::Model, receiver: &user::Model, body: &str) -> direct_message::ActiveModel {
    direct_message::ActiveModel {
        id: Set(new_id()),
        sender_id: Set(sender.id.clone()),
        sender_name: Set(sender.display_name()),
        receiver_id: Set(receiver.id.clone()),
        receiver_name: Set(receiver.display_name()),
        body: Set(body.to_string()),
        message_type: Set(direct_message::MessageKind::Text),
        file_url: Set(None),
        seen: Set(false),
        created_at: Set(Utc::now().into()),
    }
}

async fn setup() -> (Arc<sea_orm::DatabaseConnection>, Arc<sea_orm::DatabaseConnection>) {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.expect("Failed to clean test database");
    let conn = Arc::new(db.conn);
    (Arc::clone(&conn), conn)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_send_direct_message_persists_unseen() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let messages = DirectMessageRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();
    let bob = users.create(user_model("bob")).await.unwrap();

    let message = messages.create(dm_model(&alice, &bob, "hi")).await.unwrap();
    assert!(!message.seen);
    assert_eq!(message.sender_name, "alice Test");

    let conversation = messages
        .find_conversation(&alice.id, &bob.id, 50, 0)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].body, "hi");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_mark_seen_is_idempotent_and_direction_scoped() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let messages = DirectMessageRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();
    let bob = users.create(user_model("bob")).await.unwrap();

    messages.create(dm_model(&alice, &bob, "one")).await.unwrap();
    messages.create(dm_model(&alice, &bob, "two")).await.unwrap();
    // Opposite direction must not be affected
    messages.create(dm_model(&bob, &alice, "reply")).await.unwrap();

    let first = messages.mark_seen(&bob.id, &alice.id).await.unwrap();
    assert_eq!(first, 2);

    let second = messages.mark_seen(&bob.id, &alice.id).await.unwrap();
    assert_eq!(second, 0);

    // Bob's reply to Alice stays unseen
    let unseen = messages.count_unseen_from(&alice.id, &bob.id).await.unwrap();
    assert_eq!(unseen, 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_counterparties_union_both_directions() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let messages = DirectMessageRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();
    let bob = users.create(user_model("bob")).await.unwrap();
    let carol = users.create(user_model("carol")).await.unwrap();

    messages.create(dm_model(&alice, &bob, "to bob")).await.unwrap();
    messages.create(dm_model(&carol, &alice, "from carol")).await.unwrap();

    let mut partners = messages.find_counterparties(&alice.id).await.unwrap();
    partners.sort();
    let mut expected = vec![bob.id, carol.id];
    expected.sort();
    assert_eq!(partners, expected);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_shared_org_check() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let orgs = OrganizationRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();
    let bob = users.create(user_model("bob")).await.unwrap();
    let eve = users.create(user_model("eve")).await.unwrap();

    let org = orgs
        .create(organization::ActiveModel {
            id: Set(new_id()),
            name: Set("acme".to_string()),
            owner_id: Set(alice.id.clone()),
            industry: Set(None),
            logo_url: Set(None),
            allow_guest_users: Set(false),
            default_role: Set(org_member::OrgRole::Member),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    for (uid, role) in [
        (&alice.id, org_member::OrgRole::Admin),
        (&bob.id, org_member::OrgRole::Member),
    ] {
        orgs.add_member(org_member::ActiveModel {
            id: Set(new_id()),
            org_id: Set(org.id.clone()),
            user_id: Set(uid.clone()),
            role: Set(role),
            joined_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();
    }

    assert!(orgs.users_share_org(&alice.id, &bob.id).await.unwrap());
    assert!(!orgs.users_share_org(&alice.id, &eve.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_group_membership_unique_and_counted() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let orgs = OrganizationRepository::new(Arc::clone(&conn));
    let groups = GroupRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();

    let org = orgs
        .create(organization::ActiveModel {
            id: Set(new_id()),
            name: Set("acme".to_string()),
            owner_id: Set(alice.id.clone()),
            industry: Set(None),
            logo_url: Set(None),
            allow_guest_users: Set(false),
            default_role: Set(org_member::OrgRole::Member),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    let group = groups
        .create(group::ActiveModel {
            id: Set(new_id()),
            org_id: Set(org.id.clone()),
            name: Set("general".to_string()),
            description: Set(None),
            creator_id: Set(alice.id.clone()),
            is_private: Set(false),
            category: Set(None),
            members_count: Set(1),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    groups
        .add_member(group_member::ActiveModel {
            id: Set(new_id()),
            group_id: Set(group.id.clone()),
            user_id: Set(alice.id.clone()),
            role: Set(group_member::GroupRole::Admin),
            joined_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    // Second membership row for the same (group, user) violates the unique index
    let duplicate = groups
        .add_member(group_member::ActiveModel {
            id: Set(new_id()),
            group_id: Set(group.id.clone()),
            user_id: Set(alice.id.clone()),
            role: Set(group_member::GroupRole::Member),
            joined_at: Set(Utc::now().into()),
        })
        .await;
    assert!(duplicate.is_err());

    assert!(groups.is_member(&group.id, &alice.id).await.unwrap());
    assert_eq!(groups.count_members(&group.id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_group_message_seen_set_semantics() {
    let (_db, conn) = setup().await;
    let users = UserRepository::new(Arc::clone(&conn));
    let orgs = OrganizationRepository::new(Arc::clone(&conn));
    let groups = GroupRepository::new(Arc::clone(&conn));
    let messages = GroupMessageRepository::new(Arc::clone(&conn));

    let alice = users.create(user_model("alice")).await.unwrap();
    let bob = users.create(user_model("bob")).await.unwrap();

    let org = orgs
        .create(organization::ActiveModel {
            id: Set(new_id()),
            name: Set("acme".to_string()),
            owner_id: Set(alice.id.clone()),
            industry: Set(None),
            logo_url: Set(None),
            allow_guest_users: Set(false),
            default_role: Set(org_member::OrgRole::Member),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    let group = groups
        .create(group::ActiveModel {
            id: Set(new_id()),
            org_id: Set(org.id.clone()),
            name: Set("general".to_string()),
            description: Set(None),
            creator_id: Set(alice.id.clone()),
            is_private: Set(false),
            category: Set(None),
            members_count: Set(1),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    use huddle_db::entities::group_message;
    let message = messages
        .create(group_message::ActiveModel {
            id: Set(new_id()),
            group_id: Set(group.id.clone()),
            sender_id: Set(alice.id.clone()),
            body: Set("hello group".to_string()),
            message_type: Set(group_message::MessageKind::Text),
            file_url: Set(None),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    // Bob marks the group seen: one row added
    let added = messages.mark_seen(&group.id, &bob.id).await.unwrap();
    assert_eq!(added, 1);

    // Second call is a no-op
    let again = messages.mark_seen(&group.id, &bob.id).await.unwrap();
    assert_eq!(again, 0);

    // The author never enters their own seen-set
    let seen_by = messages.seen_user_ids(&message.id).await.unwrap();
    assert_eq!(seen_by, vec![bob.id.clone()]);

    let by_author = messages.mark_seen(&group.id, &alice.id).await.unwrap();
    assert_eq!(by_author, 0);
}
