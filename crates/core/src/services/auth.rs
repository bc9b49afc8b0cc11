//! Authentication service.
//!
//! Registration, login, and bearer-token verification. The credential is an
//! opaque per-user token; every authenticated surface (REST and the realtime
//! gateway) resolves it to an [`AuthIdentity`] through this service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::{
    entities::user,
    repositories::{OrganizationRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// The resolved identity of an authenticated caller.
///
/// One stable shape carried through request extensions and the gateway
/// handshake.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub id: String,
    pub email: Option<String>,
    /// Organizations the user belongs to.
    pub org_ids: Vec<String>,
    /// The organization currently operated under, if any.
    pub active_org_id: Option<String>,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 128))]
    pub first_name: Option<String>,

    #[validate(length(max = 128))]
    pub last_name: Option<String>,
}

/// Input for logging in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    org_repo: OrganizationRepository,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, org_repo: OrganizationRepository) -> Self {
        Self {
            user_repo,
            org_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and issue their bearer token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if let Some(ref email) = input.email
            && self.user_repo.find_by_email(email).await?.is_some()
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let user_id = self.id_gen.generate();
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(user_id),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(token)),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            avatar_url: Set(None),
            active_org_id: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Authenticate by username and password, returning the user with a
    /// valid token (issuing one if the account has none).
    pub async fn login(&self, input: LoginInput) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token));
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Resolve a bearer token to an authenticated identity.
    pub async fn verify_token(&self, token: &str) -> AppResult<AuthIdentity> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let org_ids = self.org_repo.member_org_ids(&user.id).await?;

        Ok(AuthIdentity {
            id: user.id,
            email: user.email,
            org_ids,
            active_org_id: user.active_org_id,
        })
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::org_member;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            password_hash: hash_password("correct horse").unwrap(),
            token: token.map(String::from),
            first_name: Some("Alice".to_string()),
            last_name: None,
            avatar_url: None,
            active_org_id: Some("org1".to_string()),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[tokio::test]
    async fn test_verify_token_resolves_identity() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user1", Some("tok"))]])
                .append_query_results([vec![org_member::Model {
                    id: "m1".to_string(),
                    org_id: "org1".to_string(),
                    user_id: "user1".to_string(),
                    role: org_member::OrgRole::Member,
                    joined_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        let service = AuthService::new(
            UserRepository::new(Arc::clone(&user_db)),
            OrganizationRepository::new(user_db),
        );

        let identity = service.verify_token("tok").await.unwrap();
        assert_eq!(identity.id, "user1");
        assert_eq!(identity.org_ids, vec!["org1".to_string()]);
        assert_eq!(identity.active_org_id.as_deref(), Some("org1"));
    }

    #[tokio::test]
    async fn test_verify_token_unknown_is_unauthorized() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = AuthService::new(
            UserRepository::new(Arc::clone(&user_db)),
            OrganizationRepository::new(user_db),
        );

        let result = service.verify_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
