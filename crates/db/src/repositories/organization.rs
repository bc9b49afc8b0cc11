//! Organization repository.

use std::sync::Arc;

use crate::entities::{OrgMember, Organization, org_member, organization};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Repository for organization and membership operations.
#[derive(Clone)]
pub struct OrganizationRepository {
    db: Arc<DatabaseConnection>,
}

impl OrganizationRepository {
    /// Create a new organization repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Organization Operations ====================

    /// Create an organization.
    pub async fn create(&self, model: organization::ActiveModel) -> AppResult<organization::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an organization by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<organization::Model>> {
        Organization::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an organization by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<organization::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::OrganizationNotFound(id.to_string()))
    }

    /// Find an organization by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<organization::Model>> {
        Organization::find()
            .filter(organization::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an organization.
    pub async fn update(&self, model: organization::ActiveModel) -> AppResult<organization::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Membership Operations ====================

    /// Add a member.
    pub async fn add_member(&self, model: org_member::ActiveModel) -> AppResult<org_member::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a member.
    pub async fn remove_member(&self, org_id: &str, user_id: &str) -> AppResult<()> {
        OrgMember::delete_many()
            .filter(org_member::Column::OrgId.eq(org_id))
            .filter(org_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find a membership row.
    pub async fn find_member(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> AppResult<Option<org_member::Model>> {
        OrgMember::find()
            .filter(org_member::Column::OrgId.eq(org_id))
            .filter(org_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a user's memberships, oldest first.
    pub async fn find_memberships_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<org_member::Model>> {
        OrgMember::find()
            .filter(org_member::Column::UserId.eq(user_id))
            .order_by_asc(org_member::Column::JoinedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the members of an organization.
    pub async fn list_members(&self, org_id: &str) -> AppResult<Vec<org_member::Model>> {
        OrgMember::find()
            .filter(org_member::Column::OrgId.eq(org_id))
            .order_by_asc(org_member::Column::JoinedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of the organizations a user belongs to.
    pub async fn member_org_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .find_memberships_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.org_id)
            .collect())
    }

    /// Whether two users share at least one organization. The tenant
    /// boundary check for direct messages.
    pub async fn users_share_org(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let org_ids = self.member_org_ids(user_a).await?;
        if org_ids.is_empty() {
            return Ok(false);
        }

        let count = OrgMember::find()
            .filter(org_member::Column::UserId.eq(user_b))
            .filter(org_member::Column::OrgId.is_in(org_ids))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}
