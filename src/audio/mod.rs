//! Device audio path: companded notifications → windows → transcript.
//!
//! # Pipeline
//!
//! ```text
//! AudioData notification → AudioPipeline::on_raw_frame
//!     → decode_frame → RealtimeAudioSink (per-frame WAV)
//!     → AudioWindow
//! flush loop → AudioPipeline::flush_if_ready → Transcriber → transcript
//! ```

pub mod pipeline;
pub mod realtime;
pub mod window;

pub use pipeline::{AudioPipeline, FlushLoop, FlushOutcome};
pub use realtime::{AudioChunkLog, RealtimeAudioSink};
pub use window::AudioWindow;
