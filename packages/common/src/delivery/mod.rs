//! Delivery Gateway: sends artifacts and messages to end users.
//!
//! The first delivery of a file uploads it and yields a reusable handle;
//! every later delivery of the same file goes by handle without re-upload.

#[cfg(feature = "sea-orm")]
pub mod coupons;
#[cfg(feature = "sea-orm")]
pub mod fanout;
#[cfg(feature = "telegram")]
pub mod telegram;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "sea-orm")]
pub use coupons::CouponDispatcher;
#[cfg(feature = "sea-orm")]
pub use fanout::Fanout;
#[cfg(feature = "telegram")]
pub use telegram::TelegramGateway;

/// Caption attached to every delivered video.
pub const VIDEO_CAPTION: &str = "Вот ваше персональное новогоднее поздравление! 🎉";

/// Callback payload of the "order another" button.
pub const ORDER_ANOTHER_ACTION: &str = "order_another_video";

/// Callback payload prefix of the manual retry button.
pub const RETRY_ACTION_PREFIX: &str = "retry_video_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Photo,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to read artifact {path}: {source}")]
    Artifact {
        path: String,
        source: std::io::Error,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Gateway rejected request ({status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("Gateway response had no reusable handle")]
    MissingHandle,
}

/// A button attached to a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoticeAction {
    pub label: String,
    pub callback_data: String,
}

/// User-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Sent after a video and its coupons were delivered.
    VideoReady { child_name: String },
    /// Terminal generation failure, with the manual-retry button.
    GenerationFailed { asset_id: Uuid },
    /// The name is already being generated for someone else.
    Subscribed,
    /// This order started a new generation.
    Queued,
    /// A retry was requested for an asset that is already done.
    AlreadyAvailable,
    /// A retry was requested while generation is still running.
    StillGenerating,
    /// A failed asset was re-armed by the retry button.
    Requeued,
    /// The order could not be recorded.
    OrderFailed,
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Self::VideoReady { child_name } => {
                format!("Ваше видеопоздравление для {child_name} готово! 🎊")
            }
            Self::GenerationFailed { .. } => {
                "❌ К сожалению, не удалось создать видео из-за проблем на стороннем сервере.\n\n\
                 Вы можете попробовать еще раз, нажав на кнопку ниже:"
                    .to_string()
            }
            Self::Subscribed => "⏳ Видео для этого имени уже генерируется! Мы отправим его вам, \
                                 как только оно будет готово."
                .to_string(),
            Self::Queued => {
                "Ваше видеопоздравление готовится. Открытка будет готова в ближайшее время! 🌲"
                    .to_string()
            }
            Self::AlreadyAvailable => "✅ Видео уже готово! Сейчас отправлю...".to_string(),
            Self::StillGenerating => "⏳ Видео уже генерируется. Пожалуйста, подождите.".to_string(),
            Self::Requeued => {
                "✅ Запрос отправлен повторно! Я сообщу вам, когда видео будет готово.".to_string()
            }
            Self::OrderFailed => "Произошла ошибка при создании заказа. Пожалуйста, попробуйте \
                                  позже, используя команду /start"
                .to_string(),
        }
    }

    pub fn action(&self) -> Option<NoticeAction> {
        match self {
            Self::VideoReady { .. } => Some(NoticeAction {
                label: "🎄 Заказать еще одно видео".into(),
                callback_data: ORDER_ANOTHER_ACTION.into(),
            }),
            Self::GenerationFailed { asset_id } => Some(NoticeAction {
                label: "🔄 Попробовать еще раз".into(),
                callback_data: format!("{RETRY_ACTION_PREFIX}{asset_id}"),
            }),
            _ => None,
        }
    }
}

#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Upload a local file to `user_id` and return its reusable handle.
    async fn deliver_new(
        &self,
        user_id: i64,
        kind: MediaKind,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<String, DeliveryError>;

    /// Send a previously uploaded file by handle.
    async fn deliver_by_handle(
        &self,
        user_id: i64,
        kind: MediaKind,
        handle: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError>;

    async fn notify(&self, user_id: i64, notice: &Notice) -> Result<(), DeliveryError>;
}
