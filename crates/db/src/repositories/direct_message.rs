//! Direct message repository.

use std::sync::Arc;

use crate::entities::direct_message::{self, Column, Entity as DirectMessage};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// Repository for direct message operations.
#[derive(Clone)]
pub struct DirectMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl DirectMessageRepository {
    /// Create a new direct message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new message.
    pub async fn create(
        &self,
        model: direct_message::ActiveModel,
    ) -> AppResult<direct_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages between two users, newest first.
    pub async fn find_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<direct_message::Model>> {
        DirectMessage::find()
            .filter(
                // Messages sent by user to partner OR by partner to user
                Condition::any()
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(user_id))
                            .add(Column::ReceiverId.eq(partner_id)),
                    )
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(partner_id))
                            .add(Column::ReceiverId.eq(user_id)),
                    ),
            )
            .order_by_desc(Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Latest message between two users, if any.
    pub async fn find_latest_in_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<Option<direct_message::Model>> {
        DirectMessage::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(user_id))
                            .add(Column::ReceiverId.eq(partner_id)),
                    )
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(partner_id))
                            .add(Column::ReceiverId.eq(user_id)),
                    ),
            )
            .order_by_desc(Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Distinct counterparties of a user (users they've messaged or been
    /// messaged by).
    pub async fn find_counterparties(&self, user_id: &str) -> AppResult<Vec<String>> {
        use sea_orm::{ConnectionTrait, Statement};

        let sql = r"
            SELECT DISTINCT partner_id FROM (
                SELECT receiver_id AS partner_id FROM direct_message
                WHERE sender_id = $1
                UNION
                SELECT sender_id AS partner_id FROM direct_message
                WHERE receiver_id = $1
            ) AS partners
        ";

        let result = self
            .db
            .query_all(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                sql,
                [user_id.into()],
            ))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut partners = Vec::new();
        for row in result {
            if let Ok(partner_id) = row.try_get::<String>("", "partner_id") {
                partners.push(partner_id);
            }
        }

        Ok(partners)
    }

    /// Count of unseen messages from a specific sender to a receiver.
    pub async fn count_unseen_from(&self, receiver_id: &str, sender_id: &str) -> AppResult<u64> {
        DirectMessage::find()
            .filter(Column::SenderId.eq(sender_id))
            .filter(Column::ReceiverId.eq(receiver_id))
            .filter(Column::Seen.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark every unseen (sender -> receiver) message as seen in one bulk
    /// update. Idempotent; returns the number of rows that transitioned.
    pub async fn mark_seen(&self, receiver_id: &str, sender_id: &str) -> AppResult<u64> {
        let result = DirectMessage::update_many()
            .col_expr(Column::Seen, Expr::value(true))
            .filter(Column::SenderId.eq(sender_id))
            .filter(Column::ReceiverId.eq(receiver_id))
            .filter(Column::Seen.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
