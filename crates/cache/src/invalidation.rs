//! Centralized cache invalidation policy.
//!
//! One table maps each mutation to the cache entries it affects; the message
//! and user services call [`Invalidator::apply`] after every successful
//! write. Invalidation failure after a durable write is logged and
//! swallowed: a stale entry expires within one TTL window, while failing the
//! request would tell the user a persisted message did not exist.

use crate::client::Cache;
use crate::keys;
use tracing::warn;

/// A mutation that may have cached derivations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A direct message between two users was written (send or mark-seen).
    DirectMessage {
        sender_id: String,
        receiver_id: String,
    },
    /// A group's messages changed (send or mark-seen).
    GroupMessage { group_id: String },
    /// A user's profile changed.
    UserProfile { user_id: String },
}

impl Mutation {
    /// Exact keys to delete.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::DirectMessage {
                sender_id,
                receiver_id,
            } => vec![keys::chat_list(sender_id), keys::chat_list(receiver_id)],
            Self::GroupMessage { .. } => vec![],
            Self::UserProfile { user_id } => {
                vec![keys::user_profile(user_id), keys::user_list()]
            }
        }
    }

    /// Page scopes to purge wholesale.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        match self {
            Self::DirectMessage {
                sender_id,
                receiver_id,
            } => vec![keys::conversation_index(sender_id, receiver_id)],
            Self::GroupMessage { group_id } => vec![keys::group_index(group_id)],
            Self::UserProfile { .. } => vec![],
        }
    }
}

/// Applies the invalidation policy after successful mutations.
#[derive(Clone)]
pub struct Invalidator {
    cache: Cache,
}

impl Invalidator {
    /// Create a new invalidator.
    #[must_use]
    pub const fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Invalidate everything the mutation affects. Never fails; the write
    /// this follows is already durable.
    pub async fn apply(&self, mutation: &Mutation) {
        for key in mutation.keys() {
            if let Err(e) = self.cache.delete(&key).await {
                warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }

        for scope in mutation.scopes() {
            if let Err(e) = self.cache.purge_scope(&scope).await {
                warn!(scope = %scope, error = %e, "Cache scope purge failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_message_invalidates_both_chat_lists() {
        let mutation = Mutation::DirectMessage {
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
        };

        let keys = mutation.keys();
        assert!(keys.contains(&"chat_list:a".to_string()));
        assert!(keys.contains(&"chat_list:b".to_string()));
    }

    #[test]
    fn test_direct_message_scope_covers_both_directions() {
        let forward = Mutation::DirectMessage {
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
        };
        let backward = Mutation::DirectMessage {
            sender_id: "b".to_string(),
            receiver_id: "a".to_string(),
        };

        assert_eq!(forward.scopes(), backward.scopes());
    }

    #[test]
    fn test_group_message_purges_all_pages() {
        let mutation = Mutation::GroupMessage {
            group_id: "g1".to_string(),
        };

        assert!(mutation.keys().is_empty());
        assert_eq!(mutation.scopes(), vec!["group:g1:messages".to_string()]);
    }

    #[test]
    fn test_profile_update_drops_profile_and_list() {
        let mutation = Mutation::UserProfile {
            user_id: "u1".to_string(),
        };

        let keys = mutation.keys();
        assert!(keys.contains(&"user:u1".to_string()));
        assert!(keys.contains(&"user:all".to_string()));
        assert!(mutation.scopes().is_empty());
    }
}
