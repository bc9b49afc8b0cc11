//! Group message repository.

use std::sync::Arc;

use crate::entities::group_message::{self, Column, Entity as GroupMessage};
use crate::entities::group_message_seen::{self, Entity as GroupMessageSeen};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Repository for group message operations.
#[derive(Clone)]
pub struct GroupMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupMessageRepository {
    /// Create a new group message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new message.
    pub async fn create(
        &self,
        model: group_message::ActiveModel,
    ) -> AppResult<group_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages of a group, newest first.
    pub async fn find_by_group(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<group_message::Model>> {
        GroupMessage::find()
            .filter(Column::GroupId.eq(group_id))
            .order_by_desc(Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of users who have seen a message.
    pub async fn seen_user_ids(&self, message_id: &str) -> AppResult<Vec<String>> {
        let rows = GroupMessageSeen::find()
            .filter(group_message_seen::Column::MessageId.eq(message_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }

    /// Add `user_id` to the seen-set of every message in the group authored
    /// by someone else and not already seen by them. One bulk statement;
    /// set semantics make this idempotent. Returns the number of rows added.
    pub async fn mark_seen(&self, group_id: &str, user_id: &str) -> AppResult<u64> {
        use sea_orm::{ConnectionTrait, Statement};

        // Seen-marker IDs piggyback on the message ULID; uniqueness comes
        // from the (message_id, user_id) constraint either way.
        let sql = r"
            INSERT INTO group_message_seen (id, message_id, user_id, seen_at)
            SELECT m.id || ':' || $2, m.id, $2, NOW()
            FROM group_message m
            WHERE m.group_id = $1
              AND m.sender_id <> $2
              AND NOT EXISTS (
                  SELECT 1 FROM group_message_seen s
                  WHERE s.message_id = m.id AND s.user_id = $2
              )
        ";

        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                sql,
                [group_id.into(), user_id.into()],
            ))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
