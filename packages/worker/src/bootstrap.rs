use std::path::PathBuf;
use std::sync::Arc;

use common::database::init_db;
use common::delivery::{CouponDispatcher, DeliveryGateway, Fanout, TelegramGateway};
use mq::{JobQueue, MqConfig, MqQueue, init_mq};
use tracing::info;

use crate::config::{MediaConfig, WorkerAppConfig};
use crate::error::Result;
use crate::media::{ElevenLabsSynthesizer, FfmpegMuxer, MediaError, MediaPipeline, Timecode};
use crate::orchestrator::Orchestrator;

pub async fn connect_mq(config: &WorkerAppConfig) -> Result<Arc<MqQueue>> {
    let mq = init_mq(MqConfig::from(&config.mq)).await?;
    Ok(Arc::new(mq))
}

/// Where the greeting starts relative to the template's first frame.
pub fn insertion_offset(media: &MediaConfig) -> std::result::Result<std::time::Duration, MediaError> {
    let origin: Timecode = media.timeline_origin.parse()?;
    let insert_at: Timecode = media.audio_insert_timecode.parse()?;
    insert_at.offset_from(&origin, media.frame_rate)
}

/// Wire the production orchestrator: Postgres, Telegram, ElevenLabs and ffmpeg.
pub async fn build_orchestrator(
    config: &WorkerAppConfig,
    queue: Arc<dyn JobQueue>,
) -> Result<Orchestrator> {
    let db = init_db(&config.database).await?;

    let offset = insertion_offset(&config.media)?;
    info!(?offset, "Greeting insertion point resolved");

    let pipeline = MediaPipeline::new(
        Arc::new(ElevenLabsSynthesizer::new(&config.media)?),
        Arc::new(FfmpegMuxer::new(&config.media)),
        PathBuf::from(&config.media.source_video_path),
        offset,
    );

    let gateway: Arc<dyn DeliveryGateway> = Arc::new(TelegramGateway::new(&config.telegram));
    let coupons = CouponDispatcher::new(db.clone(), gateway.clone(), config.coupons.clone());

    Ok(Orchestrator::new(
        db,
        Fanout::new(gateway, coupons),
        pipeline,
        queue,
        config.mq.dlq_queue_name.clone(),
        config.generation.retry_policy(),
    ))
}
