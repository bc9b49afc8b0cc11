//! Message service.
//!
//! The authoritative place where a message becomes durable. Authorization is
//! checked before any mutation; persistence and cache invalidation are one
//! logical unit, with invalidation failure logged but never rolled back.

use chrono::Utc;
use huddle_cache::{Cache, Invalidator, Mutation, keys};
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::{
    entities::{direct_message, direct_message::MessageKind, group_message},
    repositories::{
        DirectMessageRepository, GroupMessageRepository, GroupRepository, OrganizationRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;

/// Server-side clamp on caller-supplied page sizes.
pub const MAX_PAGE_SIZE: u64 = 50;

/// Clamp a caller-supplied page size into `1..=MAX_PAGE_SIZE`.
#[must_use]
pub fn clamp_page_size(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Input for sending a direct message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDirectMessageInput {
    pub receiver_id: String,
    pub message: String,
    #[serde(default)]
    pub message_type: MessageKind,
    pub file_url: Option<String>,
}

/// Input for sending a group message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMessageInput {
    pub group_id: String,
    pub message: String,
    #[serde(default)]
    pub message_type: MessageKind,
    pub file_url: Option<String>,
}

#[derive(Clone)]
struct CacheHandles {
    cache: Cache,
    invalidator: Invalidator,
    page_ttl_secs: i64,
}

/// Message service for direct and group messages.
#[derive(Clone)]
pub struct MessageService {
    dm_repo: DirectMessageRepository,
    gm_repo: GroupMessageRepository,
    group_repo: GroupRepository,
    org_repo: OrganizationRepository,
    user_repo: UserRepository,
    cache: Option<CacheHandles>,
    id_gen: IdGenerator,
}

impl MessageService {
    /// Create a new message service.
    #[must_use]
    pub const fn new(
        dm_repo: DirectMessageRepository,
        gm_repo: GroupMessageRepository,
        group_repo: GroupRepository,
        org_repo: OrganizationRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            dm_repo,
            gm_repo,
            group_repo,
            org_repo,
            user_repo,
            cache: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Attach the cache layer.
    pub fn set_cache(&mut self, cache: Cache, invalidator: Invalidator, page_ttl_secs: i64) {
        self.cache = Some(CacheHandles {
            cache,
            invalidator,
            page_ttl_secs,
        });
    }

    async fn invalidate(&self, mutation: Mutation) {
        if let Some(ref handles) = self.cache {
            handles.invalidator.apply(&mutation).await;
        }
    }

    // ==================== Direct Messages ====================

    /// Send a direct message. The sender identity comes from the
    /// authenticated connection or session, never from the payload.
    pub async fn send_direct(
        &self,
        sender_id: &str,
        input: SendDirectMessageInput,
    ) -> AppResult<direct_message::Model> {
        if input.message.trim().is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }

        if input.message_type == MessageKind::Image {
            return Err(AppError::Validation(
                "Direct messages accept text or file".to_string(),
            ));
        }

        if sender_id == input.receiver_id {
            return Err(AppError::BadRequest(
                "Cannot send message to yourself".to_string(),
            ));
        }

        // Check that the receiver exists
        let receiver = self
            .user_repo
            .find_by_id(&input.receiver_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(input.receiver_id.clone()))?;

        let sender = self.user_repo.get_by_id(sender_id).await?;

        // Tenant boundary: sender and receiver must share an organization
        if !self
            .org_repo
            .users_share_org(sender_id, &receiver.id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Sender and receiver share no organization".to_string(),
            ));
        }

        let model = direct_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            sender_id: Set(sender.id.clone()),
            sender_name: Set(sender.display_name()),
            receiver_id: Set(receiver.id.clone()),
            receiver_name: Set(receiver.display_name()),
            body: Set(input.message),
            message_type: Set(input.message_type),
            file_url: Set(input.file_url),
            seen: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let message = self.dm_repo.create(model).await?;

        self.invalidate(Mutation::DirectMessage {
            sender_id: sender.id,
            receiver_id: receiver.id,
        })
        .await;

        tracing::debug!(message_id = %message.id, "Direct message persisted");

        Ok(message)
    }

    /// Mark every unseen message from `sender_id` to `receiver_id` as seen.
    /// One bulk update; idempotent. Returns the number of messages that
    /// transitioned.
    pub async fn mark_direct_seen(&self, receiver_id: &str, sender_id: &str) -> AppResult<u64> {
        let updated = self.dm_repo.mark_seen(receiver_id, sender_id).await?;

        if updated > 0 {
            self.invalidate(Mutation::DirectMessage {
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
            })
            .await;
        }

        Ok(updated)
    }

    /// Conversation history between two users, newest first. Page size is
    /// clamped; pages are cached per conversation.
    pub async fn direct_history(
        &self,
        user_id: &str,
        partner_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<Vec<direct_message::Model>> {
        let page = page.max(1);
        let limit = clamp_page_size(limit);
        let key = keys::conversation_page(user_id, partner_id, page, limit);

        if let Some(cached) = self.read_page(&key).await {
            return Ok(cached);
        }

        let messages = self
            .dm_repo
            .find_conversation(user_id, partner_id, limit, (page - 1) * limit)
            .await?;

        self.store_page(
            &keys::conversation_index(user_id, partner_id),
            &key,
            &messages,
        )
        .await;

        Ok(messages)
    }

    // ==================== Group Messages ====================

    /// Send a message to a group. Requires a current membership row.
    pub async fn send_group(
        &self,
        sender_id: &str,
        input: SendGroupMessageInput,
    ) -> AppResult<group_message::Model> {
        if input.message.trim().is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }

        let group = self
            .group_repo
            .find_by_id(&input.group_id)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(input.group_id.clone()))?;

        if !self.group_repo.is_member(&group.id, sender_id).await? {
            return Err(AppError::Forbidden(
                "Not a member of this group".to_string(),
            ));
        }

        let model = group_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group.id.clone()),
            sender_id: Set(sender_id.to_string()),
            body: Set(input.message),
            message_type: Set(input.message_type),
            file_url: Set(input.file_url),
            created_at: Set(Utc::now().into()),
        };

        let message = self.gm_repo.create(model).await?;

        self.invalidate(Mutation::GroupMessage { group_id: group.id }).await;

        tracing::debug!(message_id = %message.id, group_id = %message.group_id, "Group message persisted");

        Ok(message)
    }

    /// Add `user_id` to the seen-set of every message in the group authored
    /// by someone else. Set semantics; idempotent.
    pub async fn mark_group_seen(&self, user_id: &str, group_id: &str) -> AppResult<u64> {
        if !self.group_repo.is_member(group_id, user_id).await? {
            return Err(AppError::Forbidden(
                "Not a member of this group".to_string(),
            ));
        }

        let added = self.gm_repo.mark_seen(group_id, user_id).await?;

        if added > 0 {
            self.invalidate(Mutation::GroupMessage {
                group_id: group_id.to_string(),
            })
            .await;
        }

        Ok(added)
    }

    /// Group message history, newest first. Membership-gated; pages are
    /// cached per group.
    pub async fn group_history(
        &self,
        user_id: &str,
        group_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<Vec<group_message::Model>> {
        if !self.group_repo.is_member(group_id, user_id).await? {
            return Err(AppError::Forbidden(
                "Not a member of this group".to_string(),
            ));
        }

        let page = page.max(1);
        let limit = clamp_page_size(limit);
        let key = keys::group_page(group_id, page, limit);

        if let Some(cached) = self.read_page(&key).await {
            return Ok(cached);
        }

        let messages = self
            .gm_repo
            .find_by_group(group_id, limit, (page - 1) * limit)
            .await?;

        self.store_page(&keys::group_index(group_id), &key, &messages)
            .await;

        Ok(messages)
    }

    /// Membership check used by the gateway to validate room joins.
    pub async fn is_group_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        self.group_repo.is_member(group_id, user_id).await
    }

    // ==================== Cache helpers ====================

    /// Cache read. Failure is non-fatal; the caller falls through to the
    /// database.
    async fn read_page<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let handles = self.cache.as_ref()?;
        match handles.cache.get_json(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling through");
                None
            }
        }
    }

    /// Cache fill. Failure is non-fatal; the page is served from the
    /// database either way.
    async fn store_page<T: serde::Serialize>(&self, index_key: &str, key: &str, value: &T) {
        if let Some(ref handles) = self.cache
            && let Err(e) = handles
                .cache
                .set_page(index_key, key, value, handles.page_ttl_secs)
                .await
        {
            tracing::warn!(key = %key, error = %e, "Cache fill failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::{group, org_member, user};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            email: None,
            password_hash: String::new(),
            token: None,
            first_name: None,
            last_name: None,
            avatar_url: None,
            active_org_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_group(id: &str) -> group::Model {
        group::Model {
            id: id.to_string(),
            org_id: "org1".to_string(),
            name: "general".to_string(),
            description: None,
            creator_id: "creator".to_string(),
            is_private: false,
            category: None,
            members_count: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_on(db: Arc<sea_orm::DatabaseConnection>) -> MessageService {
        MessageService::new(
            DirectMessageRepository::new(Arc::clone(&db)),
            GroupMessageRepository::new(Arc::clone(&db)),
            GroupRepository::new(Arc::clone(&db)),
            OrganizationRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        )
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut row = std::collections::BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn input(receiver: &str, message: &str) -> SendDirectMessageInput {
        SendDirectMessageInput {
            receiver_id: receiver.to_string(),
            message: message.to_string(),
            message_type: MessageKind::Text,
            file_url: None,
        }
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(20), 20);
        assert_eq!(clamp_page_size(50), 50);
        assert_eq!(clamp_page_size(500), 50);
    }

    #[tokio::test]
    async fn test_send_direct_rejects_empty_body() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_on(db);

        let result = service.send_direct("a", input("b", "   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_direct_rejects_image_kind() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_on(db);

        let mut bad = input("b", "hi");
        bad.message_type = MessageKind::Image;

        let result = service.send_direct("a", bad).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_direct_rejects_self_message() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_on(db);

        let result = service.send_direct("a", input("a", "hi")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_send_direct_receiver_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.send_direct("a", input("ghost", "hi")).await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_send_direct_cross_tenant_denied() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // receiver lookup
                .append_query_results([[test_user("b")]])
                // sender lookup
                .append_query_results([[test_user("a")]])
                // sender's memberships
                .append_query_results([vec![org_member::Model {
                    id: "m1".to_string(),
                    org_id: "org1".to_string(),
                    user_id: "a".to_string(),
                    role: org_member::OrgRole::Member,
                    joined_at: Utc::now().into(),
                }]])
                // receiver shares none of them
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.send_direct("a", input("b", "hi")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_send_group_not_a_member_persists_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // group lookup succeeds
                .append_query_results([[test_group("g1")]])
                // membership count is zero
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .send_group(
                "outsider",
                SendGroupMessageInput {
                    group_id: "g1".to_string(),
                    message: "hi".to_string(),
                    message_type: MessageKind::Text,
                    file_url: None,
                },
            )
            .await;

        // No insert was mocked: reaching persistence would have errored
        // differently. The membership gate fires first.
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_mark_group_seen_requires_membership() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.mark_group_seen("outsider", "g1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
