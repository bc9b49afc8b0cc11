//! User service.
//!
//! Profile reads are cache-aside: the cached entry is dropped on every
//! profile write through the invalidation policy.

use chrono::Utc;
use huddle_cache::{Cache, Invalidator, Mutation, keys};
use huddle_common::{AppError, AppResult};
use huddle_db::{
    entities::user,
    repositories::{OrganizationRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Number of users returned by the directory listing.
const USER_LIST_LIMIT: u64 = 100;

/// Public view of a user, safe to cache and return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub active_org_id: Option<String>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            avatar_url: model.avatar_url,
            active_org_id: model.active_org_id,
        }
    }
}

/// Input for updating a profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 128))]
    pub username: Option<String>,
    #[validate(length(max = 128))]
    pub first_name: Option<String>,
    #[validate(length(max = 128))]
    pub last_name: Option<String>,
    #[validate(length(max = 512))]
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
struct CacheHandles {
    cache: Cache,
    invalidator: Invalidator,
    ttl_secs: i64,
}

/// User service.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    org_repo: OrganizationRepository,
    cache: Option<CacheHandles>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, org_repo: OrganizationRepository) -> Self {
        Self {
            user_repo,
            org_repo,
            cache: None,
        }
    }

    /// Attach the cache layer.
    pub fn set_cache(&mut self, cache: Cache, invalidator: Invalidator, ttl_secs: i64) {
        self.cache = Some(CacheHandles {
            cache,
            invalidator,
            ttl_secs,
        });
    }

    /// Get a user's profile, cache-aside.
    pub async fn get_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let key = keys::user_profile(user_id);

        if let Some(cached) = self.read_cached::<UserProfile>(&key).await {
            return Ok(cached);
        }

        let profile = UserProfile::from(self.user_repo.get_by_id(user_id).await?);

        self.fill_cache(&key, &profile).await;

        Ok(profile)
    }

    /// Update a user's profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<UserProfile> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;

        if let Some(ref username) = input.username
            && *username != user.username
            && self.user_repo.find_by_username(username).await?.is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;

        if let Some(ref handles) = self.cache {
            handles
                .invalidator
                .apply(&Mutation::UserProfile {
                    user_id: user_id.to_string(),
                })
                .await;
        }

        Ok(UserProfile::from(updated))
    }

    /// Directory listing of users, cache-aside.
    pub async fn list_users(&self) -> AppResult<Vec<UserProfile>> {
        let key = keys::user_list();

        if let Some(cached) = self.read_cached::<Vec<UserProfile>>(&key).await {
            return Ok(cached);
        }

        let users: Vec<UserProfile> = self
            .user_repo
            .list(USER_LIST_LIMIT, 0)
            .await?
            .into_iter()
            .map(UserProfile::from)
            .collect();

        self.fill_cache(&key, &users).await;

        Ok(users)
    }

    /// Switch the user's active organization. The target must be one of
    /// their memberships.
    pub async fn set_active_org(&self, user_id: &str, org_id: &str) -> AppResult<UserProfile> {
        if self.org_repo.find_member(org_id, user_id).await?.is_none() {
            return Err(AppError::Forbidden(
                "Not a member of this organization".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.active_org_id = Set(Some(org_id.to_string()));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;

        if let Some(ref handles) = self.cache {
            handles
                .invalidator
                .apply(&Mutation::UserProfile {
                    user_id: user_id.to_string(),
                })
                .await;
        }

        Ok(UserProfile::from(updated))
    }

    async fn read_cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let handles = self.cache.as_ref()?;
        match handles.cache.get_json(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling through");
                None
            }
        }
    }

    async fn fill_cache<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Some(ref handles) = self.cache
            && let Err(e) = handles.cache.set_json(key, value, handles.ttl_secs).await
        {
            tracing::warn!(key = %key, error = %e, "Cache fill failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::org_member;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            email: None,
            password_hash: String::new(),
            token: None,
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            avatar_url: None,
            active_org_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_on(db: Arc<sea_orm::DatabaseConnection>) -> UserService {
        UserService::new(
            UserRepository::new(Arc::clone(&db)),
            OrganizationRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_get_profile_maps_model() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("u1")]])
                .into_connection(),
        );
        let service = service_on(db);

        let profile = service.get_profile("u1").await.unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.first_name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.get_profile("ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_active_org_requires_membership() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<org_member::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.set_active_org("u1", "org1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
