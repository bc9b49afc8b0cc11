//! Cache key construction.
//!
//! All keys are built here so the invalidation table and the read paths can
//! never disagree on spelling. Keys are logical; the [`crate::Cache`] client
//! prepends the configured prefix.

/// Cached profile of a single user.
#[must_use]
pub fn user_profile(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Cached list of all users.
#[must_use]
pub fn user_list() -> String {
    "user:all".to_string()
}

/// Cached chat list of a user.
#[must_use]
pub fn chat_list(user_id: &str) -> String {
    format!("chat_list:{user_id}")
}

/// Canonical unordered pair for a direct conversation. Covers both
/// directions with a single scope.
fn conversation_pair(user_a: &str, user_b: &str) -> (String, String) {
    if user_a <= user_b {
        (user_a.to_string(), user_b.to_string())
    } else {
        (user_b.to_string(), user_a.to_string())
    }
}

/// One cached page of a direct conversation.
#[must_use]
pub fn conversation_page(user_a: &str, user_b: &str, page: u64, limit: u64) -> String {
    let (lo, hi) = conversation_pair(user_a, user_b);
    format!("dm:{lo}:{hi}:messages:{page}:{limit}")
}

/// Index set tracking every cached page of a direct conversation.
#[must_use]
pub fn conversation_index(user_a: &str, user_b: &str) -> String {
    let (lo, hi) = conversation_pair(user_a, user_b);
    format!("dm:{lo}:{hi}:messages")
}

/// One cached page of a group's messages.
#[must_use]
pub fn group_page(group_id: &str, page: u64, limit: u64) -> String {
    format!("group:{group_id}:messages:{page}:{limit}")
}

/// Index set tracking every cached page of a group's messages.
#[must_use]
pub fn group_index(group_id: &str) -> String {
    format!("group:{group_id}:messages")
}
