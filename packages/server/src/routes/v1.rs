use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::order::create_order))
        .routes(routes!(handlers::asset::get_asset))
        .routes(routes!(handlers::asset::retry_generation))
        .routes(routes!(handlers::conversation::post_event))
        .routes(routes!(handlers::dlq::list_dlq_messages))
        .routes(routes!(handlers::dlq::resolve_dlq_message))
}
