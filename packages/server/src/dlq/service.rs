use chrono::Utc;
use common::entity::dead_letter_message;
use common::{DlqEnvelope, DlqErrorCode, DlqMessageType};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// Result of attempting to resolve a DLQ message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveResult {
    /// Message was successfully resolved.
    Resolved,
    /// Message was not found.
    NotFound,
    /// Message was already resolved.
    AlreadyResolved,
}

/// A persisted DLQ row and whether this call created it.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry: dead_letter_message::Model,
    /// False when the same message id was already stored.
    pub created: bool,
}

pub struct DlqService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DlqService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Persist a dead-lettered job. Re-delivery of the same envelope returns
    /// the existing row with `created` unset.
    pub async fn send_to_dlq(&self, envelope: &DlqEnvelope) -> Result<StoredEntry, DbErr> {
        let first_failed_at = envelope
            .retry_history
            .first()
            .map(|r| r.timestamp)
            .unwrap_or_else(Utc::now);
        let retry_history = serde_json::to_value(&envelope.retry_history)
            .map_err(|e| DbErr::Custom(format!("Failed to serialize retry history: {e}")))?;

        let model = dead_letter_message::ActiveModel {
            message_id: Set(envelope.message_id.clone()),
            message_type: Set(envelope.message_type.to_string()),
            asset_id: Set(envelope.asset_id),
            payload: Set(envelope.payload.clone()),
            error_message: Set(envelope.error_message.clone()),
            error_code: Set(envelope.error_code.to_string()),
            retry_count: Set(envelope.retry_history.len() as i32),
            retry_history: Set(retry_history),
            first_failed_at: Set(first_failed_at),
            created_at: Set(Utc::now()),
            resolved: Set(false),
            resolved_at: Set(None),
            resolved_by: Set(None),
            ..Default::default()
        };

        self.insert_entry(&envelope.message_id, model).await
    }

    /// Create a DLQ entry for a failure the server detected itself.
    pub async fn create_entry(
        &self,
        message_id: String,
        message_type: DlqMessageType,
        asset_id: Option<Uuid>,
        payload: serde_json::Value,
        error_code: DlqErrorCode,
        error_message: String,
    ) -> Result<StoredEntry, DbErr> {
        let now = Utc::now();
        let model = dead_letter_message::ActiveModel {
            message_id: Set(message_id.clone()),
            message_type: Set(message_type.to_string()),
            asset_id: Set(asset_id),
            payload: Set(payload),
            error_message: Set(error_message),
            error_code: Set(error_code.to_string()),
            retry_count: Set(0),
            retry_history: Set(serde_json::json!([])),
            first_failed_at: Set(now),
            created_at: Set(now),
            resolved: Set(false),
            resolved_at: Set(None),
            resolved_by: Set(None),
            ..Default::default()
        };

        self.insert_entry(&message_id, model).await
    }

    async fn insert_entry(
        &self,
        message_id: &str,
        model: dead_letter_message::ActiveModel,
    ) -> Result<StoredEntry, DbErr> {
        // ON CONFLICT keeps an enclosing transaction usable on duplicates.
        let inserted = dead_letter_message::Entity::insert(model)
            .on_conflict(
                OnConflict::column(dead_letter_message::Column::MessageId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        let entry = dead_letter_message::Entity::find()
            .filter(dead_letter_message::Column::MessageId.eq(message_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("DLQ message {message_id}")))?;

        Ok(StoredEntry {
            entry,
            created: inserted > 0,
        })
    }

    /// List DLQ messages, newest first.
    pub async fn list(
        &self,
        resolved: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<dead_letter_message::Model>, u64), DbErr> {
        let mut query = dead_letter_message::Entity::find();

        if let Some(res) = resolved {
            query = query.filter(dead_letter_message::Column::Resolved.eq(res));
        }

        let total = query.clone().count(self.conn).await?;

        let messages = query
            .order_by_desc(dead_letter_message::Column::CreatedAt)
            .order_by_desc(dead_letter_message::Column::Id)
            .offset((page.saturating_sub(1)) * per_page)
            .limit(per_page)
            .all(self.conn)
            .await?;

        Ok((messages, total))
    }

    /// Mark a message as resolved.
    pub async fn resolve(
        &self,
        id: i32,
        resolved_by: Option<String>,
    ) -> Result<ResolveResult, DbErr> {
        let update_result = dead_letter_message::Entity::update_many()
            .col_expr(dead_letter_message::Column::Resolved, Expr::value(true))
            .col_expr(dead_letter_message::Column::ResolvedAt, Expr::value(Utc::now()))
            .col_expr(dead_letter_message::Column::ResolvedBy, Expr::value(resolved_by))
            .filter(dead_letter_message::Column::Id.eq(id))
            .filter(dead_letter_message::Column::Resolved.eq(false))
            .exec(self.conn)
            .await?;

        if update_result.rows_affected > 0 {
            return Ok(ResolveResult::Resolved);
        }

        let exists = dead_letter_message::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .is_some();

        if exists {
            Ok(ResolveResult::AlreadyResolved)
        } else {
            Ok(ResolveResult::NotFound)
        }
    }
}

/// Create a DlqService with a DatabaseConnection.
pub fn dlq_service(db: &DatabaseConnection) -> DlqService<'_, DatabaseConnection> {
    DlqService::new(db)
}
