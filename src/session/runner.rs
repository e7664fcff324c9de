//! Device session: routes transport events through the photo and audio paths.
//!
//! [`DeviceSession`] owns one connection's reassembler, audio pipeline,
//! photo forwarder and control channel.  It responds to [`SessionEvent`]s
//! received over a `tokio::sync::mpsc` channel.
//!
//! # Event flow
//!
//! ```text
//! Connected
//!   └─▶ select codec, subscribe audio/photo, start or stop capture
//!
//! PhotoData(bytes)              (ignored while capture is paused)
//!   └─▶ PhotoPacket::parse → PhotoReassembler
//!         └─ Completed → spawn_orient (blocking pool) ─▶ photo writer
//!
//! AudioData(bytes)              (ignored while collection is off)
//!   └─▶ AudioPipeline::on_raw_frame
//!
//! photo writer (own task)  awaits orientations in completion order
//!   └─▶ album → forwarder.notify
//! flush loop (own task)    → AudioPipeline::flush_if_ready
//! ```
//!
//! Orientation never holds up the event loop: audio keeps flowing while a
//! photo is being rotated, and the album still receives photos in the order
//! their transfers completed.
//!
//! Transport and collaborator failures are logged and recorded in
//! [`SessionState::last_error`](super::SessionState::last_error); none of them end the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{AudioPipeline, RealtimeAudioSink};
use crate::config::AppConfig;
use crate::device::{AudioCodec, CaptureCommand, Characteristic, ControlChannel, PhotoPacket};
use crate::photo::{
    spawn_orient, ChunkOutcome, ImageOrienter, OrientError, PhotoAlbum, PhotoForwarder,
    PhotoReassembler, PhotoSink,
};
use crate::stt::Transcriber;

use super::state::{lock_state, new_shared_session, SessionHandle, SharedSession};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transport link came up.
    Connected,
    /// The transport link went away.
    Disconnected { reason: String },
    /// One notification from [`Characteristic::PhotoData`].
    PhotoData(Vec<u8>),
    /// One notification from [`Characteristic::AudioData`].
    AudioData(Vec<u8>),
    SetPhotoCapturePaused(bool),
    SetAudioCollecting(bool),
    SetTranscriptionEnabled(bool),
    /// Clear the audio window and transcript.
    ResetAudio,
}

// ---------------------------------------------------------------------------
// DeviceSession
// ---------------------------------------------------------------------------

/// One device connection's worth of processing.
///
/// Create with [`DeviceSession::new`], keep a [`handle`](Self::handle) for
/// reads, then drive it with [`run`](Self::run).
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use device_stream::audio::AudioChunkLog;
/// use device_stream::config::AppConfig;
/// use device_stream::device::NullControlChannel;
/// use device_stream::photo::{PhotoSink, RotatingOrienter};
/// use device_stream::session::{DeviceSession, SessionEvent};
/// use device_stream::stt::HttpTranscriber;
///
/// # async fn example(sink: Arc<dyn PhotoSink>) -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let session = DeviceSession::new(
///     &config,
///     Arc::new(NullControlChannel),
///     Arc::new(HttpTranscriber::from_config(&config.transcription)),
///     Arc::new(AudioChunkLog::new()),
///     Arc::new(RotatingOrienter::from_config(&config.photos)),
///     sink,
/// );
/// let handle = session.handle();
///
/// let (tx, rx) = tokio::sync::mpsc::channel(64);
/// let task = tokio::spawn(session.run(rx));
/// tx.send(SessionEvent::Connected).await?;
/// drop(tx);
/// task.await?;
/// println!("{}", handle.transcript());
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession {
    state: SharedSession,
    link: Arc<dyn ControlChannel>,
    reassembler: PhotoReassembler,
    orienter: Arc<dyn ImageOrienter>,
    album: PhotoAlbum,
    forwarder: PhotoForwarder,
    pending_photos: mpsc::UnboundedSender<PendingPhoto>,
    photo_writer: Option<PhotoWriter>,
    audio: Arc<AudioPipeline>,
    flush_interval: Duration,
}

impl DeviceSession {
    /// Wire a session from configuration and its collaborators.
    ///
    /// * `link`:        command side of the transport.
    /// * `transcriber`: speech-to-text for flushed audio windows.
    /// * `realtime`:    receives one WAV container per audio notification.
    /// * `orienter`:    rotates completed photos.
    /// * `sink`:        receives batches of new photos.
    pub fn new(
        config: &AppConfig,
        link: Arc<dyn ControlChannel>,
        transcriber: Arc<dyn Transcriber>,
        realtime: Arc<dyn RealtimeAudioSink>,
        orienter: Arc<dyn ImageOrienter>,
        sink: Arc<dyn PhotoSink>,
    ) -> Self {
        let state = new_shared_session(config);
        let album = PhotoAlbum::new();
        let forwarder = PhotoForwarder::new(album.clone(), sink);
        let (pending_photos, pending) = mpsc::unbounded_channel();
        let photo_writer = PhotoWriter {
            pending,
            album: album.clone(),
            forwarder: forwarder.clone(),
            state: Arc::clone(&state),
        };
        Self {
            state,
            link,
            reassembler: PhotoReassembler::new(),
            orienter,
            forwarder,
            pending_photos,
            photo_writer: Some(photo_writer),
            album,
            audio: Arc::new(AudioPipeline::new(&config.audio, transcriber, realtime)),
            flush_interval: config.audio.flush_interval(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: Arc::clone(&self.state),
            album: self.album.clone(),
            audio: Arc::clone(&self.audio),
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Process events until `events` is closed.
    ///
    /// On shutdown the flush loop is stopped (a transcription in flight is
    /// still committed), the window gets one last flush evaluation, every
    /// completed photo is oriented and stored, and the whole album is handed
    /// to the sink before this returns.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        let flush_loop = self.audio.spawn_flush_loop(self.flush_interval);
        let photo_writer = self.photo_writer.take().map(|w| tokio::spawn(w.run()));

        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }

        log::info!("session: event channel closed, shutting down");
        flush_loop.shutdown().await;
        self.audio.flush_if_ready().await;

        let Self {
            pending_photos,
            forwarder,
            ..
        } = self;
        drop(pending_photos);
        if let Some(writer) = photo_writer {
            if let Err(e) = writer.await {
                log::error!("session: photo writer failed: {e}");
            }
        }
        forwarder.flush().await;
        forwarder.stop();
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => self.handle_connected().await,
            SessionEvent::Disconnected { reason } => self.handle_disconnected(&reason),
            SessionEvent::PhotoData(raw) => self.handle_photo_data(&raw),
            SessionEvent::AudioData(raw) => {
                if lock_state(&self.state).audio_collecting {
                    self.audio.on_raw_frame(&raw);
                }
            }
            SessionEvent::SetPhotoCapturePaused(paused) => self.set_photo_capture_paused(paused).await,
            SessionEvent::SetAudioCollecting(collecting) => {
                self.set_audio_collecting(collecting).await
            }
            SessionEvent::SetTranscriptionEnabled(enabled) => {
                self.audio.set_transcription_enabled(enabled)
            }
            SessionEvent::ResetAudio => self.audio.reset(),
        }
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    async fn handle_connected(&mut self) {
        log::info!("session: connected");
        let (paused, collecting) = {
            let mut st = lock_state(&self.state);
            st.connected = true;
            st.last_error = None;
            (st.photo_capture_paused, st.audio_collecting)
        };
        self.reassembler.reset();

        let mut subscribed = true;
        // Codec first: the device streams nothing useful until it is chosen.
        self.write(Characteristic::AudioCodec, AudioCodec::MuLaw.as_byte())
            .await;
        subscribed &= self.subscribe(Characteristic::AudioData, collecting).await;
        subscribed &= self.subscribe(Characteristic::PhotoData, !paused).await;
        self.write(Characteristic::PhotoControl, capture_command(paused).as_byte())
            .await;

        lock_state(&self.state).subscribed = subscribed;
        if !subscribed {
            log::warn!("session: notification setup incomplete, waiting for reconnect");
        }
    }

    fn handle_disconnected(&mut self, reason: &str) {
        log::info!("session: disconnected ({reason})");
        {
            let mut st = lock_state(&self.state);
            st.connected = false;
            st.subscribed = false;
        }
        self.reassembler.reset();
    }

    // -----------------------------------------------------------------------
    // Photo path
    // -----------------------------------------------------------------------

    fn handle_photo_data(&mut self, raw: &[u8]) {
        if lock_state(&self.state).photo_capture_paused {
            return;
        }

        let packet = match PhotoPacket::parse(raw) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("session: {e}");
                lock_state(&self.state).malformed_packets += 1;
                return;
            }
        };

        match self.reassembler.on_packet(packet) {
            ChunkOutcome::Completed(photo) => {
                lock_state(&self.state).transfers_completed += 1;
                self.queue_photo(photo);
            }
            ChunkOutcome::Dropped { .. } => {
                lock_state(&self.state).transfers_dropped += 1;
            }
            ChunkOutcome::Ignored | ChunkOutcome::Started | ChunkOutcome::Appended => {}
        }
    }

    fn queue_photo(&self, photo: Vec<u8>) {
        let oriented = spawn_orient(Arc::clone(&self.orienter), photo.clone());
        let pending = PendingPhoto { raw: photo, oriented };
        if self.pending_photos.send(pending).is_err() {
            log::error!("session: photo writer is gone, dropping completed photo");
        }
    }

    async fn set_photo_capture_paused(&mut self, paused: bool) {
        let connected = {
            let mut st = lock_state(&self.state);
            if st.photo_capture_paused == paused {
                return;
            }
            st.photo_capture_paused = paused;
            st.connected
        };
        log::info!("session: photo capture {}", if paused { "paused" } else { "resumed" });
        self.reassembler.reset();

        if connected {
            self.write(Characteristic::PhotoControl, capture_command(paused).as_byte())
                .await;
            self.subscribe(Characteristic::PhotoData, !paused).await;
        }
    }

    // -----------------------------------------------------------------------
    // Audio path
    // -----------------------------------------------------------------------

    async fn set_audio_collecting(&mut self, collecting: bool) {
        let connected = {
            let mut st = lock_state(&self.state);
            if st.audio_collecting == collecting {
                return;
            }
            st.audio_collecting = collecting;
            st.connected
        };
        log::info!("session: audio collection {}", if collecting { "started" } else { "stopped" });

        if connected {
            self.subscribe(Characteristic::AudioData, collecting).await;
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn write(&self, characteristic: Characteristic, byte: u8) -> bool {
        match self.link.write(characteristic, &[byte]).await {
            Ok(()) => true,
            Err(e) => {
                self.record_error(e.to_string());
                false
            }
        }
    }

    async fn subscribe(&self, characteristic: Characteristic, enabled: bool) -> bool {
        match self.link.set_notifications(characteristic, enabled).await {
            Ok(()) => true,
            Err(e) => {
                self.record_error(e.to_string());
                false
            }
        }
    }

    fn record_error(&self, message: String) {
        log::warn!("session: {message}");
        lock_state(&self.state).last_error = Some(message);
    }
}

// ---------------------------------------------------------------------------
// PhotoWriter
// ---------------------------------------------------------------------------

/// A completed photo whose orientation is running on the blocking pool.
struct PendingPhoto {
    raw: Vec<u8>,
    oriented: JoinHandle<Result<Vec<u8>, OrientError>>,
}

/// Sole writer of the album.  Orientations finish in any order; they are
/// awaited in the order their transfers completed.
struct PhotoWriter {
    pending: mpsc::UnboundedReceiver<PendingPhoto>,
    album: PhotoAlbum,
    forwarder: PhotoForwarder,
    state: SharedSession,
}

impl PhotoWriter {
    async fn run(mut self) {
        while let Some(photo) = self.pending.recv().await {
            self.store(photo).await;
        }
        log::debug!("session: photo writer drained");
    }

    async fn store(&self, photo: PendingPhoto) {
        let result = photo
            .oriented
            .await
            .map_err(|e| OrientError::Join(e.to_string()))
            .and_then(|oriented| oriented);
        let stored = match result {
            Ok(oriented) => oriented,
            Err(e) => {
                log::warn!("session: keeping photo un-rotated: {e}");
                lock_state(&self.state).orientation_failures += 1;
                photo.raw
            }
        };
        let index = self.album.push(stored);
        log::debug!("session: stored photo #{index}");
        self.forwarder.notify();
    }
}

fn capture_command(paused: bool) -> CaptureCommand {
    if paused {
        CaptureCommand::Stop
    } else {
        CaptureCommand::StartEvery5s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
