//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique, nullable)]
    pub email: Option<String>,

    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Access token (bearer credential)
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    #[sea_orm(nullable)]
    pub first_name: Option<String>,

    #[sea_orm(nullable)]
    pub last_name: Option<String>,

    /// Avatar URL
    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// The organization the user currently operates under. NULL until the
    /// user joins or creates one; must reference one of their memberships.
    #[sea_orm(nullable)]
    pub active_org_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Display name as snapshotted into messages: "First Last", falling back
    /// to the username when name parts are missing.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::org_member::Entity")]
    OrgMemberships,

    #[sea_orm(has_many = "super::group_member::Entity")]
    GroupMemberships,
}

impl Related<super::org_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrgMemberships.def()
    }
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMemberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(first: Option<&str>, last: Option<&str>) -> Model {
        Model {
            id: "u1".to_string(),
            username: "jdoe".to_string(),
            email: None,
            password_hash: String::new(),
            token: None,
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            avatar_url: None,
            active_org_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_display_name_full() {
        assert_eq!(user(Some("Jane"), Some("Doe")).display_name(), "Jane Doe");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user(None, None).display_name(), "jdoe");
    }
}
