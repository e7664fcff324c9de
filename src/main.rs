//! Replay tool: runs a recorded notification capture through a session.
//!
//! ```text
//! device-stream <capture.jsonl>
//! ```
//!
//! Each line of the capture is one notification:
//! `{"channel":"photo","data":[0,0,255,216,...]}` or
//! `{"channel":"audio","data":[...]}`.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the collaborators: HTTP transcriber, photo orienter, a sink that
//!    writes forwarded photos to the data directory.
//! 4. Spawn the [`DeviceSession`] and feed it `Connected` plus every line.
//! 5. Close the channel, wait for shutdown, print the transcript.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use device_stream::{
    audio::{AudioChunkLog, RealtimeAudioSink},
    config::{AppConfig, AppPaths},
    device::NullControlChannel,
    photo::{Photo, PhotoSink, RotatingOrienter, SinkError},
    session::{DeviceSession, SessionEvent},
    stt::HttpTranscriber,
};

// ---------------------------------------------------------------------------
// Capture format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Channel {
    Photo,
    Audio,
}

#[derive(Debug, Deserialize)]
struct CaptureLine {
    channel: Channel,
    data: Vec<u8>,
}

impl From<CaptureLine> for SessionEvent {
    fn from(line: CaptureLine) -> Self {
        match line.channel {
            Channel::Photo => SessionEvent::PhotoData(line.data),
            Channel::Audio => SessionEvent::AudioData(line.data),
        }
    }
}

fn read_capture(path: &Path) -> Result<Vec<SessionEvent>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open capture {}", path.display()))?;

    let mut events = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: CaptureLine = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid capture line", path.display(), n + 1))?;
        events.push(parsed.into());
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// DirectorySink
// ---------------------------------------------------------------------------

/// Writes each forwarded photo to `<dir>/photo-NNNN.<ext>`.
struct DirectorySink {
    dir: PathBuf,
}

#[async_trait]
impl PhotoSink for DirectorySink {
    async fn forward(&self, first_index: usize, batch: Vec<Photo>) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        for (offset, photo) in batch.iter().enumerate() {
            let ext = match image::guess_format(photo) {
                Ok(image::ImageFormat::Png) => "png",
                _ => "jpg",
            };
            let path = self
                .dir
                .join(format!("photo-{:04}.{ext}", first_index + offset));
            tokio::fs::write(&path, photo).await?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }
}

/// Wire a session whose realtime chunks land in `chunks` and whose photos
/// are written under `photos_dir`.
fn build_session(
    config: &AppConfig,
    photos_dir: PathBuf,
    chunks: &Arc<AudioChunkLog>,
) -> DeviceSession {
    let transcriber = HttpTranscriber::from_config(&config.transcription);
    if config.audio.transcription_enabled && !transcriber.has_api_key() {
        log::warn!("No transcription API key configured; audio windows will be discarded");
    }

    DeviceSession::new(
        config,
        Arc::new(NullControlChannel),
        Arc::new(transcriber),
        Arc::clone(chunks) as Arc<dyn RealtimeAudioSink>,
        Arc::new(RotatingOrienter::from_config(&config.photos)),
        Arc::new(DirectorySink { dir: photos_dir }),
    )
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(capture) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: device-stream <capture.jsonl>");
    };

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Collaborators
    let chunks = Arc::new(AudioChunkLog::new());
    let session = build_session(&config, paths.photos_dir.clone(), &chunks);
    let handle = session.handle();

    // 4. Replay
    let events = read_capture(&capture)?;
    log::info!("replaying {} notification(s) from {}", events.len(), capture.display());

    let (tx, rx) = mpsc::channel(64);
    let task = tokio::spawn(session.run(rx));

    tx.send(SessionEvent::Connected).await?;
    for event in events {
        tx.send(event).await?;
    }

    // 5. Shutdown
    drop(tx);
    task.await.context("session task failed")?;

    let state = handle.snapshot();
    log::info!(
        "photos: {} completed, {} dropped, {} malformed; audio chunks: {} ({} bytes)",
        state.transfers_completed,
        state.transfers_dropped,
        state.malformed_packets,
        chunks.len(),
        chunks.total_bytes(),
    );
    println!("{}", handle.transcript().trim_start());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
