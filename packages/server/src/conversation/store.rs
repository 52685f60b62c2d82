use chrono::Utc;
use common::entity::{bot_user, conversation_session};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};
use tracing::warn;

use super::machine::{FlowState, Session};

/// Load the session for `user_id`, starting fresh when none is stored.
pub async fn load_session<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<Session, DbErr> {
    let Some(row) = conversation_session::Entity::find_by_id(user_id)
        .one(conn)
        .await?
    else {
        return Ok(Session::default());
    };

    let state = serde_json::from_value(row.state).unwrap_or_else(|e| {
        warn!(user_id, error = %e, "Unreadable conversation state, resetting");
        FlowState::Idle
    });
    Ok(Session {
        state,
        reordering: row.reordering,
    })
}

pub async fn save_session<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    session: &Session,
) -> Result<(), DbErr> {
    let state = serde_json::to_value(&session.state)
        .map_err(|e| DbErr::Custom(format!("Failed to serialize conversation state: {e}")))?;

    let row = conversation_session::ActiveModel {
        user_id: Set(user_id),
        state: Set(state),
        reordering: Set(session.reordering),
        updated_at: Set(Utc::now()),
    };
    conversation_session::Entity::insert(row)
        .on_conflict(
            OnConflict::column(conversation_session::Column::UserId)
                .update_columns([
                    conversation_session::Column::State,
                    conversation_session::Column::Reordering,
                    conversation_session::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn has_phone<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<bool, DbErr> {
    Ok(bot_user::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .and_then(|user| user.phone_number)
        .is_some_and(|phone| !phone.is_empty()))
}

/// Create or update the user with their shared contact.
pub async fn save_phone<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    phone_number: &str,
    first_name: Option<&str>,
    username: Option<&str>,
) -> Result<(), DbErr> {
    let now = Utc::now();
    let row = bot_user::ActiveModel {
        id: Set(user_id),
        phone_number: Set(Some(phone_number.to_string())),
        first_name: Set(first_name.map(str::to_string)),
        username: Set(username.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    bot_user::Entity::insert(row)
        .on_conflict(
            OnConflict::column(bot_user::Column::Id)
                .update_columns([
                    bot_user::Column::PhoneNumber,
                    bot_user::Column::FirstName,
                    bot_user::Column::Username,
                    bot_user::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;
    Ok(())
}
