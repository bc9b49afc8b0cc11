//! Organization service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::{
    entities::{org_member, org_member::OrgRole, organization},
    repositories::{OrganizationRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating an organization.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 128))]
    pub industry: Option<String>,
    #[validate(length(max = 512))]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub allow_guest_users: bool,
    #[serde(default)]
    pub default_role: OrgRole,
}

/// Organization service.
#[derive(Clone)]
pub struct OrganizationService {
    org_repo: OrganizationRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl OrganizationService {
    /// Create a new organization service.
    #[must_use]
    pub const fn new(org_repo: OrganizationRepository, user_repo: UserRepository) -> Self {
        Self {
            org_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an organization. The creator becomes its admin member, and
    /// their active organization if they had none.
    pub async fn create(
        &self,
        creator_id: &str,
        input: CreateOrganizationInput,
    ) -> AppResult<organization::Model> {
        input.validate()?;

        if self.org_repo.find_by_name(&input.name).await?.is_some() {
            return Err(AppError::Conflict(
                "Organization name already taken".to_string(),
            ));
        }

        let creator = self.user_repo.get_by_id(creator_id).await?;

        let org = self
            .org_repo
            .create(organization::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(input.name),
                owner_id: Set(creator.id.clone()),
                industry: Set(input.industry),
                logo_url: Set(input.logo_url),
                allow_guest_users: Set(input.allow_guest_users),
                default_role: Set(input.default_role),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        self.org_repo
            .add_member(org_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                org_id: Set(org.id.clone()),
                user_id: Set(creator.id.clone()),
                role: Set(OrgRole::Admin),
                joined_at: Set(Utc::now().into()),
            })
            .await?;

        // Joining a first organization makes it the active one
        if creator.active_org_id.is_none() {
            let mut active: huddle_db::entities::user::ActiveModel = creator.into();
            active.active_org_id = Set(Some(org.id.clone()));
            active.updated_at = Set(Some(Utc::now().into()));
            self.user_repo.update(active).await?;
        }

        tracing::info!(org_id = %org.id, name = %org.name, "Organization created");

        Ok(org)
    }

    /// Get an organization; members only.
    pub async fn get(&self, caller_id: &str, org_id: &str) -> AppResult<organization::Model> {
        let org = self.org_repo.get_by_id(org_id).await?;

        if self.org_repo.find_member(org_id, caller_id).await?.is_none() {
            return Err(AppError::Forbidden(
                "Not a member of this organization".to_string(),
            ));
        }

        Ok(org)
    }

    /// List the organizations a user belongs to.
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<org_member::Model>> {
        self.org_repo.find_memberships_for_user(user_id).await
    }

    /// Add a member. Only admins may add; guest roles require the
    /// organization to allow guest users.
    pub async fn add_member(
        &self,
        actor_id: &str,
        org_id: &str,
        user_id: &str,
        role: Option<OrgRole>,
    ) -> AppResult<org_member::Model> {
        let org = self.org_repo.get_by_id(org_id).await?;

        let actor = self
            .org_repo
            .find_member(org_id, actor_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("Not a member of this organization".to_string())
            })?;

        if !actor.role.can_manage() {
            return Err(AppError::Forbidden(
                "Only organization admins can add members".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;

        if self.org_repo.find_member(org_id, user_id).await?.is_some() {
            return Err(AppError::Conflict("User is already a member".to_string()));
        }

        let role = role.unwrap_or(org.default_role);
        if role == OrgRole::Guest && !org.allow_guest_users {
            return Err(AppError::Forbidden(
                "Organization does not allow guest users".to_string(),
            ));
        }

        let member = self
            .org_repo
            .add_member(org_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                org_id: Set(org.id.clone()),
                user_id: Set(user.id.clone()),
                role: Set(role),
                joined_at: Set(Utc::now().into()),
            })
            .await?;

        if user.active_org_id.is_none() {
            let mut active: huddle_db::entities::user::ActiveModel = user.into();
            active.active_org_id = Set(Some(org.id.clone()));
            active.updated_at = Set(Some(Utc::now().into()));
            self.user_repo.update(active).await?;
        }

        Ok(member)
    }

    /// Remove a member; admins may remove anyone, members may remove
    /// themselves. Keeps the leaver's active organization pointing at a
    /// remaining membership.
    pub async fn remove_member(
        &self,
        actor_id: &str,
        org_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let actor = self
            .org_repo
            .find_member(org_id, actor_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("Not a member of this organization".to_string())
            })?;

        if actor_id != user_id && !actor.role.can_manage() {
            return Err(AppError::Forbidden(
                "Only organization admins can remove members".to_string(),
            ));
        }

        self.org_repo.remove_member(org_id, user_id).await?;

        // The active organization must reference a current membership
        let user = self.user_repo.get_by_id(user_id).await?;
        if user.active_org_id.as_deref() == Some(org_id) {
            let next = self
                .org_repo
                .find_memberships_for_user(user_id)
                .await?
                .into_iter()
                .next()
                .map(|m| m.org_id);

            let mut active: huddle_db::entities::user::ActiveModel = user.into();
            active.active_org_id = Set(next);
            active.updated_at = Set(Some(Utc::now().into()));
            self.user_repo.update(active).await?;
        }

        Ok(())
    }

    /// List the members of an organization; members only.
    pub async fn list_members(
        &self,
        caller_id: &str,
        org_id: &str,
    ) -> AppResult<Vec<org_member::Model>> {
        if self.org_repo.find_member(org_id, caller_id).await?.is_none() {
            return Err(AppError::Forbidden(
                "Not a member of this organization".to_string(),
            ));
        }

        self.org_repo.list_members(org_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_org(id: &str) -> organization::Model {
        organization::Model {
            id: id.to_string(),
            name: "acme".to_string(),
            owner_id: "owner".to_string(),
            industry: None,
            logo_url: None,
            allow_guest_users: false,
            default_role: OrgRole::Member,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn member(org: &str, user: &str, role: OrgRole) -> org_member::Model {
        org_member::Model {
            id: format!("{org}:{user}"),
            org_id: org.to_string(),
            user_id: user.to_string(),
            role,
            joined_at: Utc::now().into(),
        }
    }

    fn service_on(db: Arc<sea_orm::DatabaseConnection>) -> OrganizationService {
        OrganizationService::new(
            OrganizationRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_org("existing")]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .create(
                "u1",
                CreateOrganizationInput {
                    name: "acme".to_string(),
                    industry: None,
                    logo_url: None,
                    allow_guest_users: false,
                    default_role: OrgRole::Member,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_add_member_requires_admin() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // org lookup
                .append_query_results([[test_org("org1")]])
                // actor is only a regular member
                .append_query_results([[member("org1", "actor", OrgRole::Member)]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service.add_member("actor", "org1", "newbie", None).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_guest_requires_allowance() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_org("org1")]])
                .append_query_results([[member("org1", "actor", OrgRole::Admin)]])
                // target user exists
                .append_query_results([[user::Model {
                    id: "newbie".to_string(),
                    username: "newbie".to_string(),
                    email: None,
                    password_hash: String::new(),
                    token: None,
                    first_name: None,
                    last_name: None,
                    avatar_url: None,
                    active_org_id: None,
                    created_at: Utc::now().into(),
                    updated_at: None,
                }]])
                // not yet a member
                .append_query_results([Vec::<org_member::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .add_member("actor", "org1", "newbie", Some(OrgRole::Guest))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
