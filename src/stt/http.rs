//! OpenAI-compatible `/v1/audio/transcriptions` client.
//!
//! All connection details (`base_url`, `api_key`, `model`, optional timeout)
//! come from [`TranscriptionConfig`]; nothing is hardcoded here.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::config::TranscriptionConfig;
use crate::stt::engine::{TranscribeError, Transcriber};

/// File name sent with the multipart upload; the service sniffs the format
/// from the extension.
const UPLOAD_FILE_NAME: &str = "audio.wav";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Uploads framed audio to a speech-to-text endpoint.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl HttpTranscriber {
    /// Build a transcriber from application config.
    ///
    /// A per-request timeout is applied only when `config.timeout_secs` is
    /// set.  A default client is used if the builder fails.
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// `true` when a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, TranscribeError> {
        let key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(TranscribeError::MissingApiKey),
        };

        let file = multipart::Part::bytes(wav)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("audio/wav")?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("model", self.config.model.clone());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Parse(e.to_string()))?;

        Ok(parsed.text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
