use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{MediaError, Muxer};
use crate::config::MediaConfig;

/// Keep the tail of ffmpeg's stderr; the head is the banner.
const STDERR_TAIL: usize = 2000;

/// Runs ffmpeg as a child process.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    bin: String,
    video_dir: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            bin: config.ffmpeg_bin.clone(),
            video_dir: PathBuf::from(&config.temp_dir).join("video"),
        }
    }
}

/// ffmpeg arguments that copy the base video stream and mix `audio`,
/// delayed by `offset`, over the base audio track.
pub fn build_mux_args(base: &Path, audio: &Path, offset: Duration, output: &Path) -> Vec<String> {
    let delay_ms = offset.as_millis();
    let filter = format!(
        "[1:a]adelay={delay_ms}|{delay_ms}[voice];\
         [0:a][voice]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
    );

    vec![
        "-y".into(),
        "-i".into(),
        base.display().to_string(),
        "-i".into(),
        audio.display().to_string(),
        "-filter_complex".into(),
        filter,
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "[aout]".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        output.display().to_string(),
    ]
}

fn tail(text: &str) -> String {
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].trim().to_string()
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(
        &self,
        base: &Path,
        audio: &Path,
        offset: Duration,
    ) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.video_dir)
            .await
            .map_err(|e| MediaError::io(&self.video_dir, e))?;
        let output = self.video_dir.join(format!("{}.mp4", Uuid::new_v4()));
        let args = build_mux_args(base, audio, offset, &output);
        debug!(bin = %self.bin, ?args, "Running ffmpeg");

        let result = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::Spawn)?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        trace!(stderr = %stderr, "ffmpeg output");

        if !result.status.success() {
            return Err(MediaError::Mux {
                status: result.status.to_string(),
                stderr: tail(&stderr),
            });
        }

        debug!(output = %output.display(), "ffmpeg finished");
        Ok(output)
    }
}
