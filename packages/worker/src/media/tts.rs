use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{MediaError, Synthesizer};
use crate::config::MediaConfig;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// ElevenLabs text-to-speech client.
#[derive(Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice_settings: Map<String, Value>,
    audio_dir: PathBuf,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let voice_settings = match serde_json::from_str::<Value>(&config.elevenlabs_voice_settings)
        {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(MediaError::Config(
                    "elevenlabs_voice_settings must be a JSON object".into(),
                ));
            }
            Err(e) => {
                return Err(MediaError::Config(format!(
                    "elevenlabs_voice_settings is not valid JSON: {e}"
                )));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/text-to-speech/{}",
                config.elevenlabs_api_base.trim_end_matches('/'),
                config.elevenlabs_voice_id
            ),
            api_key: config.elevenlabs_api_key.clone(),
            voice_settings,
            audio_dir: PathBuf::from(&config.temp_dir).join("audio"),
        })
    }

    fn request_body(&self, name: &str) -> Value {
        let mut body = self.voice_settings.clone();
        body.insert("text".into(), Value::String(format!("{name}!")));
        Value::Object(body)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, name: &str) -> Result<PathBuf, MediaError> {
        debug!(name, endpoint = %self.endpoint, "Requesting speech synthesis");

        let response = self
            .client
            .post(&self.endpoint)
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&self.request_body(name))
            .send()
            .await
            .map_err(|e| MediaError::TtsTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_retryable(status) {
                warn!(name, status = status.as_u16(), "TTS service returned a retryable error");
            }
            return Err(MediaError::TtsStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::TtsTransport(e.to_string()))?;

        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .map_err(|e| MediaError::io(&self.audio_dir, e))?;
        let path = self.audio_dir.join(format!("{name}-{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| MediaError::io(&path, e))?;

        Ok(path)
    }
}
