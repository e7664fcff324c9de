//! Device data-stream reconstruction.
//!
//! Turns the notification streams of a small wearable capture device into
//! application artifacts:
//!
//! * [`photo`]: reassembles chunked photo transfers, orients them and
//!   forwards new ones downstream.
//! * [`audio`]: decodes companded audio, keeps a sample window and
//!   periodically sends it to a [`stt::Transcriber`].
//! * [`scheduler`]: the coalescing single-flight runner behind the photo
//!   forwarder.
//! * [`session`]: the per-connection object that routes transport events.
//!
//! Supporting modules: [`codec`] (sample expansion, WAV framing),
//! [`device`] (wire protocol, control channel), [`config`], [`stt`].

pub mod audio;
pub mod codec;
pub mod config;
pub mod device;
pub mod photo;
pub mod scheduler;
pub mod session;
pub mod stt;
