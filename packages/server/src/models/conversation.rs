use serde::Serialize;

use crate::conversation::{EventResult, FlowState, Reply};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationEventResponse {
    /// Dialogue step after the event.
    pub state: FlowState,
    /// Messages to show, in order.
    pub replies: Vec<Reply>,
}

impl From<EventResult> for ConversationEventResponse {
    fn from(result: EventResult) -> Self {
        Self {
            state: result.state,
            replies: result.replies,
        }
    }
}
