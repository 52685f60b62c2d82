pub mod admin;
pub mod json;

pub use admin::AdminToken;
pub use json::AppJson;
