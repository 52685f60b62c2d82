pub mod config;
pub mod delivery;
pub mod dlq;
pub mod generation_job;
pub mod mq;
pub mod retry;
pub mod status;
pub mod validation;
pub mod worker;

#[cfg(feature = "sea-orm")]
pub mod database;
#[cfg(feature = "sea-orm")]
pub mod entity;
#[cfg(feature = "sea-orm")]
pub mod ledger;

pub use dlq::{DlqEnvelope, DlqErrorCode, DlqMessageType};
pub use generation_job::GenerationJob;
pub use retry::{RetryAttempt, RetryDecision, RetryPolicy};
pub use status::{AssetStatus, RequestStatus};
