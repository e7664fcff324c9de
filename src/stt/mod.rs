//! Speech-to-text collaborator used by the audio windowing pipeline.
//!
//! # Architecture
//!
//! ```text
//! AudioPipeline ──flush──▶ encode_wav(window) ──▶ Transcriber (trait)
//!                                                     │
//!                                                     ▼
//!                                       HttpTranscriber (multipart POST)
//!                                       /v1/audio/transcriptions
//! ```
//!
//! The pipeline only depends on the [`Transcriber`] trait; the HTTP client is
//! one implementation of it.

pub mod engine;
pub mod http;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{TranscribeError, Transcriber};
pub use http::HttpTranscriber;

// test-only re-export so other test modules can use the mock without the
// full `stt::engine::MockTranscriber` path.
#[cfg(test)]
pub use engine::MockTranscriber;
