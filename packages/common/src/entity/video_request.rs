use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::status::RequestStatus;

/// One user's order against an asset.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Chat id of the requesting user.
    #[sea_orm(indexed)]
    pub user_id: i64,

    #[sea_orm(indexed)]
    pub asset_id: Uuid,
    #[sea_orm(belongs_to, from = "asset_id", to = "id")]
    pub asset: HasOne<super::asset::Entity>,

    #[sea_orm(indexed)]
    pub status: RequestStatus,

    /// Name as the user typed it, used in notices.
    pub child_name: String,

    pub child_age: Option<i32>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
