use config::{Config, ConfigError};
use serde::Deserialize;

pub use common::config::{
    CouponConfig, DatabaseConfig, GenerationConfig, MqAppConfig, TelegramConfig,
};

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
}

fn default_worker_id() -> String {
    "worker-1".into()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
        }
    }
}

/// Text-to-speech and muxing settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default)]
    pub elevenlabs_api_key: String,
    #[serde(default)]
    pub elevenlabs_voice_id: String,
    #[serde(default = "default_elevenlabs_api_base")]
    pub elevenlabs_api_base: String,
    /// Extra fields merged into the TTS request body, as a JSON object string.
    #[serde(default = "default_voice_settings")]
    pub elevenlabs_voice_settings: String,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    /// Template video the greeting is mixed into.
    #[serde(default = "default_source_video_path")]
    pub source_video_path: String,
    /// Where the name is spoken, as `H:MM:SS:FF` on the template's timeline.
    #[serde(default = "default_audio_insert_timecode")]
    pub audio_insert_timecode: String,
    /// Timecode of the template's first frame.
    #[serde(default = "default_timeline_origin")]
    pub timeline_origin: String,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
}

fn default_elevenlabs_api_base() -> String {
    "https://api.elevenlabs.io".into()
}
fn default_voice_settings() -> String {
    "{}".into()
}
fn default_ffmpeg_bin() -> String {
    "ffmpeg".into()
}
fn default_source_video_path() -> String {
    "./assets/template.mp4".into()
}
fn default_audio_insert_timecode() -> String {
    "1:00:28:21".into()
}
fn default_timeline_origin() -> String {
    "1:00:00:00".into()
}
fn default_frame_rate() -> u32 {
    25
}
fn default_temp_dir() -> String {
    "./temp".into()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: String::new(),
            elevenlabs_voice_id: String::new(),
            elevenlabs_api_base: default_elevenlabs_api_base(),
            elevenlabs_voice_settings: default_voice_settings(),
            ffmpeg_bin: default_ffmpeg_bin(),
            source_video_path: default_source_video_path(),
            audio_insert_timecode: default_audio_insert_timecode(),
            timeline_origin: default_timeline_origin(),
            frame_rate: default_frame_rate(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.queue_name", "video_generation")?
            .set_default("mq.dlq_queue_name", "video_generation_dlq")?
            .set_default("generation.max_attempts", 3_i64)?
            .set_default("generation.concurrency", 5_i64)?;

        common::config::layered(defaults)?.build()?.try_deserialize()
    }
}
