//! Chat list aggregator.
//!
//! Derives, per user, one row per counterparty with the most recent direct
//! message and the count of unseen messages from them. The result is cached
//! per user with a short TTL and invalidated by every direct-message write
//! involving that user.

use huddle_cache::{Cache, keys};
use huddle_common::AppResult;
use huddle_db::{
    entities::direct_message,
    repositories::{DirectMessageRepository, UserRepository},
};
use serde::{Deserialize, Serialize};

/// One row of a user's chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListEntry {
    /// The counterparty.
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Most recent message in either direction.
    pub last_message: direct_message::Model,
    /// Messages from the counterparty the user has not seen.
    pub unseen_count: u64,
}

#[derive(Clone)]
struct CacheHandles {
    cache: Cache,
    ttl_secs: i64,
}

/// Chat list aggregation service.
#[derive(Clone)]
pub struct ChatListService {
    dm_repo: DirectMessageRepository,
    user_repo: UserRepository,
    cache: Option<CacheHandles>,
}

impl ChatListService {
    /// Create a new chat list service.
    #[must_use]
    pub const fn new(dm_repo: DirectMessageRepository, user_repo: UserRepository) -> Self {
        Self {
            dm_repo,
            user_repo,
            cache: None,
        }
    }

    /// Attach the cache layer.
    pub fn set_cache(&mut self, cache: Cache, ttl_secs: i64) {
        self.cache = Some(CacheHandles { cache, ttl_secs });
    }

    /// Build the chat list for a user, newest conversation first.
    pub async fn chat_list(&self, user_id: &str) -> AppResult<Vec<ChatListEntry>> {
        let key = keys::chat_list(user_id);

        if let Some(ref handles) = self.cache {
            match handles.cache.get_json::<Vec<ChatListEntry>>(&key).await {
                Ok(Some(cached)) => return Ok(cached),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache read failed, falling through");
                }
            }
        }

        let counterparties = self.dm_repo.find_counterparties(user_id).await?;

        let mut entries = Vec::with_capacity(counterparties.len());

        for partner_id in counterparties {
            // Counterparty rows joined to the user record; skip dangling ids
            let Some(partner) = self.user_repo.find_by_id(&partner_id).await? else {
                continue;
            };

            let Some(last_message) = self
                .dm_repo
                .find_latest_in_conversation(user_id, &partner_id)
                .await?
            else {
                continue;
            };

            let unseen_count = self.dm_repo.count_unseen_from(user_id, &partner_id).await?;

            entries.push(ChatListEntry {
                user_id: partner.id,
                username: partner.username,
                email: partner.email,
                first_name: partner.first_name,
                last_name: partner.last_name,
                avatar_url: partner.avatar_url,
                last_message,
                unseen_count,
            });
        }

        // Most recent conversation first
        entries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));

        if let Some(ref handles) = self.cache
            && let Err(e) = handles.cache.set_json(&key, &entries, handles.ttl_secs).await
        {
            tracing::warn!(key = %key, error = %e, "Cache fill failed");
        }

        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use huddle_db::entities::{direct_message::MessageKind, user};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn partner_row(id: &str) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert("partner_id", Value::String(Some(Box::new(id.to_string()))));
        row
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", Value::BigInt(Some(n)));
        row
    }

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            email: Some(format!("{id}@example.com")),
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

    fn message(
        id: &str,
        sender: &str,
        receiver: &str,
        age: Duration,
    ) -> direct_message::Model {
        direct_message::Model {
            id: id.to_string(),
            sender_id: sender.to_string(),
            sender_name: sender.to_string(),
            receiver_id: receiver.to_string(),
            receiver_name: receiver.to_string(),
            body: "hello".to_string(),
            message_type: MessageKind::Text,
            file_url: None,
            seen: false,
            created_at: (Utc::now() - age).into(),
        }
    }

    #[tokio::test]
    async fn test_chat_list_sorted_by_latest_message() {
        let me = "me";

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // counterparties
                .append_query_results([vec![partner_row("p1"), partner_row("p2")]])
                // p1: user, latest (older), unseen count
                .append_query_results([[test_user("p1")]])
                .append_query_results([[message("m1", "p1", me, Duration::hours(2))]])
                .append_query_results([[count_row(2)]])
                // p2: user, latest (newer), unseen count
                .append_query_results([[test_user("p2")]])
                .append_query_results([[message("m2", me, "p2", Duration::minutes(5))]])
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let service = ChatListService::new(
            DirectMessageRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        );

        let entries = service.chat_list(me).await.unwrap();

        assert_eq!(entries.len(), 2);
        // p2's conversation is newer, so it sorts first
        assert_eq!(entries[0].user_id, "p2");
        assert_eq!(entries[0].unseen_count, 0);
        assert_eq!(entries[1].user_id, "p1");
        assert_eq!(entries[1].unseen_count, 2);
    }

    #[tokio::test]
    async fn test_chat_list_empty_for_no_conversations() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
                .into_connection(),
        );

        let service = ChatListService::new(
            DirectMessageRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        );

        let entries = service.chat_list("me").await.unwrap();
        assert!(entries.is_empty());
    }
}
