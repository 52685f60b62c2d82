use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durable per-user ordering flow state.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Serialized flow step, e.g. `{"step": "awaiting_age", "child_name": "Маша"}`.
    #[sea_orm(column_type = "JsonBinary")]
    pub state: serde_json::Value,

    /// Set by "order another" so the next start skips the welcome-back message.
    #[sea_orm(default_value = false)]
    pub reordering: bool,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
