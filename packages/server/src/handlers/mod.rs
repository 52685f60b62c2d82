pub mod asset;
pub mod conversation;
pub mod dlq;
pub mod order;
