//! External generation services: speech synthesis and muxing.

pub mod mux;
pub mod timecode;
pub mod tts;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use mux::FfmpegMuxer;
pub use timecode::Timecode;
pub use tts::ElevenLabsSynthesizer;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("TTS request failed: {0}")]
    TtsTransport(String),

    #[error("TTS service returned {status}: {body}")]
    TtsStatus { status: u16, body: String },

    #[error("ffmpeg exited with {status}: {stderr}")]
    Mux { status: String, stderr: String },

    #[error("Failed to spawn ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("Invalid timecode: {0}")]
    Timecode(String),

    #[error("Invalid media configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl MediaError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Text-to-speech: turns a child's name into a spoken greeting.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Returns the path of the written audio file.
    async fn synthesize(&self, name: &str) -> Result<PathBuf, MediaError>;
}

/// Mixes an audio track into a base video starting at `offset`.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, base: &Path, audio: &Path, offset: Duration)
    -> Result<PathBuf, MediaError>;
}

/// Transient files produced for one generation attempt.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub audio: PathBuf,
    pub video: PathBuf,
}

impl Artifacts {
    /// Best-effort removal; failures are only logged.
    pub async fn cleanup(&self) {
        remove_transient(&self.audio).await;
        remove_transient(&self.video).await;
    }
}

async fn remove_transient(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed transient file"),
        Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove transient file"),
    }
}

/// Synthesis followed by muxing into the configured template video.
#[derive(Clone)]
pub struct MediaPipeline {
    synthesizer: Arc<dyn Synthesizer>,
    muxer: Arc<dyn Muxer>,
    base_video: PathBuf,
    offset: Duration,
}

impl MediaPipeline {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        muxer: Arc<dyn Muxer>,
        base_video: PathBuf,
        offset: Duration,
    ) -> Self {
        Self {
            synthesizer,
            muxer,
            base_video,
            offset,
        }
    }

    /// Produce the personalized video for `name`.
    ///
    /// On error any audio already written is removed.
    pub async fn produce(&self, name: &str) -> Result<Artifacts, MediaError> {
        let audio = self.synthesizer.synthesize(name).await?;
        info!(name, audio = %audio.display(), "Speech synthesized");

        match self.muxer.mux(&self.base_video, &audio, self.offset).await {
            Ok(video) => {
                info!(name, video = %video.display(), "Video muxed");
                Ok(Artifacts { audio, video })
            }
            Err(e) => {
                remove_transient(&audio).await;
                Err(e)
            }
        }
    }
}
