//! Group service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::{
    entities::{group, group_member, group_member::GroupRole, user},
    repositories::{GroupRepository, OrganizationRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    pub org_id: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[validate(length(max = 128))]
    pub category: Option<String>,
}

/// Input for adding a group member.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGroupMemberInput {
    pub user_id: String,
    #[serde(default)]
    pub role: GroupRole,
}

/// A group member joined to their user record.
#[derive(Debug, Clone)]
pub struct GroupMemberEntry {
    pub member: group_member::Model,
    pub user: user::Model,
}

/// Group service.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    org_repo: OrganizationRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(
        group_repo: GroupRepository,
        org_repo: OrganizationRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            group_repo,
            org_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a group. The creator must belong to the organization and is
    /// auto-added as admin member.
    pub async fn create(&self, creator_id: &str, input: CreateGroupInput) -> AppResult<group::Model> {
        input.validate()?;

        if self
            .org_repo
            .find_member(&input.org_id, creator_id)
            .await?
            .is_none()
        {
            return Err(AppError::Forbidden(
                "Not a member of this organization".to_string(),
            ));
        }

        // Names are unique per organization
        if self
            .group_repo
            .find_by_name_in_org(&input.org_id, &input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Group name already taken in this organization".to_string(),
            ));
        }

        let group = self
            .group_repo
            .create(group::ActiveModel {
                id: Set(self.id_gen.generate()),
                org_id: Set(input.org_id),
                name: Set(input.name),
                description: Set(input.description),
                creator_id: Set(creator_id.to_string()),
                is_private: Set(input.is_private),
                category: Set(input.category),
                members_count: Set(1),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        self.group_repo
            .add_member(group_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(group.id.clone()),
                user_id: Set(creator_id.to_string()),
                role: Set(GroupRole::Admin),
                joined_at: Set(Utc::now().into()),
            })
            .await?;

        tracing::info!(group_id = %group.id, org_id = %group.org_id, "Group created");

        Ok(group)
    }

    /// Get a group by ID.
    pub async fn get(&self, id: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_id(id).await
    }

    /// List an organization's groups; members of the organization only.
    pub async fn list_for_org(
        &self,
        caller_id: &str,
        org_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<group::Model>> {
        if self.org_repo.find_member(org_id, caller_id).await?.is_none() {
            return Err(AppError::Forbidden(
                "Not a member of this organization".to_string(),
            ));
        }

        self.group_repo.find_by_org(org_id, limit, offset).await
    }

    /// Add a member. Group admins only; the target must belong to the
    /// group's organization.
    pub async fn add_member(
        &self,
        actor_id: &str,
        group_id: &str,
        input: AddGroupMemberInput,
    ) -> AppResult<group_member::Model> {
        let group = self.group_repo.get_by_id(group_id).await?;

        let actor = self
            .group_repo
            .get_member(group_id, actor_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Not a member of this group".to_string()))?;

        if !actor.role.can_manage_members() {
            return Err(AppError::Forbidden(
                "Only group admins can add members".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(&input.user_id).await?;

        if self
            .org_repo
            .find_member(&group.org_id, &user.id)
            .await?
            .is_none()
        {
            return Err(AppError::Forbidden(
                "User does not belong to the group's organization".to_string(),
            ));
        }

        if self.group_repo.get_member(group_id, &user.id).await?.is_some() {
            return Err(AppError::Conflict("User is already a member".to_string()));
        }

        let member = self
            .group_repo
            .add_member(group_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(group.id.clone()),
                user_id: Set(user.id),
                role: Set(input.role),
                joined_at: Set(Utc::now().into()),
            })
            .await?;

        self.group_repo.increment_members_count(&group.id).await?;

        Ok(member)
    }

    /// Remove a member; admins may remove anyone, members may leave.
    pub async fn remove_member(
        &self,
        actor_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let actor = self
            .group_repo
            .get_member(group_id, actor_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Not a member of this group".to_string()))?;

        if actor_id != user_id && !actor.role.can_manage_members() {
            return Err(AppError::Forbidden(
                "Only group admins can remove members".to_string(),
            ));
        }

        if self.group_repo.get_member(group_id, user_id).await?.is_none() {
            return Err(AppError::NotFound("Membership not found".to_string()));
        }

        self.group_repo.remove_member(group_id, user_id).await?;
        self.group_repo.decrement_members_count(group_id).await?;

        Ok(())
    }

    /// List the members of a group joined to their user records; members
    /// only.
    pub async fn list_members(
        &self,
        caller_id: &str,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<GroupMemberEntry>> {
        if !self.group_repo.is_member(group_id, caller_id).await? {
            return Err(AppError::Forbidden(
                "Not a member of this group".to_string(),
            ));
        }

        let members = self.group_repo.list_members(group_id, limit, offset).await?;

        let user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        let entries = members
            .into_iter()
            .filter_map(|member| {
                users
                    .iter()
                    .find(|u| u.id == member.user_id)
                    .cloned()
                    .map(|user| GroupMemberEntry { member, user })
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::org_member;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

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

    fn group_member(group: &str, user: &str, role: GroupRole) -> group_member::Model {
        group_member::Model {
            id: format!("{group}:{user}"),
            group_id: group.to_string(),
            user_id: user.to_string(),
            role,
            joined_at: Utc::now().into(),
        }
    }

    fn service_on(db: Arc<sea_orm::DatabaseConnection>) -> GroupService {
        GroupService::new(
            GroupRepository::new(Arc::clone(&db)),
            OrganizationRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_create_requires_org_membership() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<org_member::Model>::new()])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .create(
                "outsider",
                CreateGroupInput {
                    org_id: "org1".to_string(),
                    name: "general".to_string(),
                    description: None,
                    is_private: false,
                    category: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name_in_org() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[org_member::Model {
                    id: "m1".to_string(),
                    org_id: "org1".to_string(),
                    user_id: "creator".to_string(),
                    role: org_member::OrgRole::Member,
                    joined_at: Utc::now().into(),
                }]])
                .append_query_results([[test_group("existing")]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .create(
                "creator",
                CreateGroupInput {
                    org_id: "org1".to_string(),
                    name: "general".to_string(),
                    description: None,
                    is_private: false,
                    category: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_add_member_requires_group_admin() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_group("g1")]])
                .append_query_results([[group_member("g1", "actor", GroupRole::Member)]])
                .into_connection(),
        );
        let service = service_on(db);

        let result = service
            .add_member(
                "actor",
                "g1",
                AddGroupMemberInput {
                    user_id: "newbie".to_string(),
                    role: GroupRole::Member,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
