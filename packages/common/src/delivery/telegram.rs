use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{DeliveryError, DeliveryGateway, MediaKind, Notice};
use crate::config::TelegramConfig;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Delivery Gateway over the Telegram Bot API. Handles are Telegram `file_id`s.
#[derive(Clone)]
pub struct TelegramGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            client,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<Value, DeliveryError> {
        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(format!("invalid Bot API response: {e}")))?;

        if !body.ok {
            return Err(DeliveryError::Rejected {
                status: body.error_code.unwrap_or(status),
                description: body.description.unwrap_or_default(),
            });
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

fn method_for(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Photo => ("sendPhoto", "photo"),
    }
}

/// Pull the reusable `file_id` out of a sent message.
fn extract_file_id(kind: MediaKind, message: &Value) -> Option<String> {
    let file = match kind {
        MediaKind::Video => message.get("video"),
        // Photos come in several sizes; the last one is the largest.
        MediaKind::Photo => message.get("photo").and_then(|sizes| sizes.as_array()?.last()),
    }?;
    file.get("file_id")?.as_str().map(str::to_string)
}

#[async_trait]
impl DeliveryGateway for TelegramGateway {
    async fn deliver_new(
        &self,
        user_id: i64,
        kind: MediaKind,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<String, DeliveryError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DeliveryError::Artifact {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let (method, field) = method_for(kind);
        let mut form = Form::new()
            .text("chat_id", user_id.to_string())
            .part(field, Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if kind == MediaKind::Video {
            form = form.text("width", "1920").text("height", "1080");
        }

        let message = self
            .call(self.client.post(self.method_url(method)).multipart(form))
            .await?;
        extract_file_id(kind, &message).ok_or(DeliveryError::MissingHandle)
    }

    async fn deliver_by_handle(
        &self,
        user_id: i64,
        kind: MediaKind,
        handle: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let (method, field) = method_for(kind);
        let mut body = json!({ "chat_id": user_id });
        body[field] = json!(handle);
        if let Some(caption) = caption {
            body["caption"] = json!(caption);
        }

        self.call(self.client.post(self.method_url(method)).json(&body))
            .await
            .map(|_| ())
    }

    async fn notify(&self, user_id: i64, notice: &Notice) -> Result<(), DeliveryError> {
        let mut body = json!({ "chat_id": user_id, "text": notice.text() });
        if let Some(action) = notice.action() {
            body["reply_markup"] = json!({
                "inline_keyboard": [[{
                    "text": action.label,
                    "callback_data": action.callback_data,
                }]]
            });
        }

        self.call(self.client.post(self.method_url("sendMessage")).json(&body))
            .await
            .map(|_| ())
    }
}
