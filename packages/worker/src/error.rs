use common::delivery::DeliveryError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::media::MediaError;

/// Startup failures.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("MQ error: {0}")]
    Mq(String),

    #[error("Media setup error: {0}")]
    Media(#[from] MediaError),
}

impl From<mq::MqError> for WorkerError {
    fn from(e: mq::MqError) -> Self {
        WorkerError::Mq(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Why a single generation attempt failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Asset {0} not found")]
    AssetNotFound(Uuid),

    #[error("Media generation failed: {0}")]
    Media(#[from] MediaError),

    #[error("No subscriber accepted the upload: {0}")]
    NoRecipient(DeliveryError),

    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

impl GenerationError {
    /// Fatal errors skip the remaining attempts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AssetNotFound(_))
    }
}
