//! Core transcription trait and error type.
//!
//! [`Transcriber`] is object-safe and `Send + Sync` so the pipeline can hold it
//! behind an `Arc<dyn Transcriber>`.
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns a
//! pre-configured response and records what it was asked to transcribe.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// All errors that can arise from a transcription call.
#[derive(Debug, Clone, Error)]
pub enum TranscribeError {
    /// No API key configured for the remote service.
    #[error("transcription API key is not configured")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be interpreted.
    #[error("could not parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Speech-to-text over one framed audio buffer.
///
/// # Contract
///
/// - `wav` is a complete RIFF/WAVE container (mono, 16-bit, 8 kHz) as
///   produced by [`crate::codec::encode_wav`].
/// - Returns the recognised text, possibly empty.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, TranscribeError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a fixed response.
///
/// Every call records the byte length of the container it received.  An
/// optional semaphore gate holds each call until a permit is added, so tests
/// can observe the pipeline while a request is in flight.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, TranscribeError>,
    gate: Option<std::sync::Arc<tokio::sync::Semaphore>>,
    pub calls: std::sync::Mutex<Vec<usize>>,
}

#[cfg(test)]
impl MockTranscriber {
    /// Create a mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            gate: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: TranscribeError) -> Self {
        Self {
            response: Err(error),
            gate: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Hold every call until `gate` has a permit to spend.
    pub fn gated(mut self, gate: std::sync::Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, TranscribeError> {
        self.calls.lock().unwrap().push(wav.len());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ok_returns_configured_text() {
        let engine = MockTranscriber::ok("hello there");
        assert_eq!(engine.transcribe(vec![0; 44]).await.unwrap(), "hello there");
        assert_eq!(*engine.calls.lock().unwrap(), vec![44]);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let engine = MockTranscriber::err(TranscribeError::Timeout);
        let err = engine.transcribe(Vec::new()).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Timeout));
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn box_dyn_transcriber_compiles() {
        let engine: Box<dyn Transcriber> = Box::new(MockTranscriber::ok("ok"));
        drop(engine);
    }

    #[test]
    fn error_display_includes_status_and_body() {
        let e = TranscribeError::Status {
            status: 401,
            body: "invalid key".into(),
        };
        let text = e.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("invalid key"));
    }

    #[test]
    fn missing_key_display() {
        assert!(TranscribeError::MissingApiKey.to_string().contains("API key"));
    }
}
