use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bot_user")]
pub struct Model {
    /// Chat id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub username: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
