//! Durable ordering dialogue: phone, child name, age, confirmation.

pub mod machine;
pub mod store;

pub use machine::{Effect, FlowInput, FlowState, Reply, Session, Transition, advance};

use common::database::{DEFAULT_CONFLICT_RETRIES, serializable};
use common::delivery::Notice;
use common::validation::NameValidator;
use sea_orm::{ConnectionTrait, DbErr};
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::ordering::place_order;
use crate::state::AppState;

/// What the user sees after one event, and where the dialogue now stands.
#[derive(Debug, Clone)]
pub struct EventResult {
    pub state: FlowState,
    pub replies: Vec<Reply>,
}

/// Apply one user event: load the session, advance, persist, then run the effect.
///
/// Loading, advancing and saving form one serializable unit, so two copies
/// of the same event (a double-tapped confirm) serialize: the second one
/// sees the state the first committed. An order is placed only after the
/// transition that produced it has committed.
#[instrument(skip(state, input))]
pub async fn handle_event(
    state: &AppState,
    user_id: i64,
    input: FlowInput,
) -> Result<EventResult, AppError> {
    let validator = state.validator.clone();
    let Transition {
        session: next,
        mut replies,
        effect,
    } = serializable(&state.db, DEFAULT_CONFLICT_RETRIES, |txn| {
        let validator = validator.clone();
        let input = input.clone();
        Box::pin(async move { apply(txn, user_id, input, &validator).await })
    })
    .await?;

    match effect {
        Some(Effect::SavePhone { .. }) => info!("Phone number saved"),
        Some(Effect::PlaceOrder {
            child_name,
            child_age,
        }) => match place_order(state, user_id, &child_name, Some(child_age)).await {
            Ok(outcome) => replies.extend(outcome.reply().as_ref().map(Reply::from_notice)),
            Err(e) => {
                warn!(error = %e, "Order from conversation failed");
                replies.push(Reply::from_notice(&Notice::OrderFailed));
            }
        },
        None => {}
    }

    Ok(EventResult {
        state: next.state,
        replies,
    })
}

async fn apply<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    input: FlowInput,
    validator: &NameValidator,
) -> Result<Transition, DbErr> {
    let session = store::load_session(conn, user_id).await?;
    let has_phone = store::has_phone(conn, user_id).await?;
    let transition = advance(&session, has_phone, input, validator);

    if let Some(Effect::SavePhone {
        phone_number,
        first_name,
        username,
    }) = &transition.effect
    {
        store::save_phone(
            conn,
            user_id,
            phone_number,
            first_name.as_deref(),
            username.as_deref(),
        )
        .await?;
    }

    store::save_session(conn, user_id, &transition.session).await?;
    Ok(transition)
}
