pub mod asset;
pub mod bot_user;
pub mod conversation_session;
pub mod dead_letter_message;
pub mod system_asset;
pub mod video_request;
