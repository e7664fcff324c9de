//! Audio windowing pipeline: raw companded notifications → transcript.
//!
//! # Flow
//!
//! ```text
//! on_raw_frame(bytes)
//!   ├─▶ decode_frame ─▶ encode_wav ─▶ RealtimeAudioSink      (every frame)
//!   └─▶ AudioWindow::push                                    (every frame)
//!
//! flush loop (every flush_interval)
//!   └─▶ flush_if_ready
//!         ├─ transcription disabled → leave window alone
//!         ├─ window.len() <= threshold → wait for next tick
//!         └─ take window ─▶ encode_wav ─▶ Transcriber
//!               ├─ Ok(text) → transcript += " " + text
//!               └─ Err      → warn, nothing appended
//! ```
//!
//! The window is drained *before* the transcription call is awaited, so
//! samples arriving while a request is in flight start the next window
//! instead of being lost.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::realtime::RealtimeAudioSink;
use crate::audio::window::AudioWindow;
use crate::codec::{decode_frame, encode_wav};
use crate::config::AudioConfig;
use crate::stt::Transcriber;

// ---------------------------------------------------------------------------
// FlushOutcome
// ---------------------------------------------------------------------------

/// What a single evaluation of the flush policy did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Transcription is off; the window keeps growing (up to its cap).
    Disabled,
    /// Not enough samples yet.
    NotReady,
    /// The window was transcribed and `text` appended to the transcript.
    Transcribed { samples: usize, text: String },
    /// The window was cleared but transcription failed.
    Failed { samples: usize },
}

// ---------------------------------------------------------------------------
// FlushLoop
// ---------------------------------------------------------------------------

/// Handle to the periodic flush task started by
/// [`AudioPipeline::spawn_flush_loop`].
pub struct FlushLoop {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FlushLoop {
    /// Stop ticking and wait for the task to exit.
    ///
    /// A transcription already in flight completes and its text is committed
    /// before this returns.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            log::error!("audio: flush loop failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// AudioPipeline
// ---------------------------------------------------------------------------

/// Owns the audio window and transcript for one device session.
///
/// Shared as `Arc<AudioPipeline>` between the notification handler and the
/// flush loop; every method takes `&self`.
pub struct AudioPipeline {
    window: Mutex<AudioWindow>,
    transcript: Mutex<String>,
    transcription_enabled: AtomicBool,
    windows_flushed: AtomicU64,
    /// Set while the window cap is discarding samples; cleared once a push
    /// fits again.
    dropping: AtomicBool,
    transcriber: Arc<dyn Transcriber>,
    realtime: Arc<dyn RealtimeAudioSink>,
}

impl AudioPipeline {
    pub fn new(
        config: &AudioConfig,
        transcriber: Arc<dyn Transcriber>,
        realtime: Arc<dyn RealtimeAudioSink>,
    ) -> Self {
        Self {
            window: Mutex::new(AudioWindow::new(
                config.window_threshold_samples,
                config.max_window(),
            )),
            transcript: Mutex::new(String::new()),
            transcription_enabled: AtomicBool::new(config.transcription_enabled),
            windows_flushed: AtomicU64::new(0),
            dropping: AtomicBool::new(false),
            transcriber,
            realtime,
        }
    }

    // -----------------------------------------------------------------------
    // Notification path
    // -----------------------------------------------------------------------

    /// Handle one audio notification.
    ///
    /// Each byte is decoded independently.  The frame is forwarded to the
    /// realtime sink as its own container and appended to the window.
    pub fn on_raw_frame(&self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }
        let pcm = decode_frame(raw);
        match encode_wav(&pcm) {
            Ok(wav) => self.realtime.push_chunk(wav),
            Err(e) => log::warn!("audio: could not frame realtime chunk: {e}"),
        }

        let dropped = self.window().push(&pcm);
        if dropped == 0 {
            self.dropping.store(false, Ordering::Relaxed);
        } else if !self.dropping.swap(true, Ordering::Relaxed) {
            log::warn!("audio: window at capacity, discarding oldest samples until it is flushed");
        } else {
            log::debug!("audio: dropped {dropped} oldest sample(s)");
        }
    }

    // -----------------------------------------------------------------------
    // Flush path
    // -----------------------------------------------------------------------

    /// Evaluate the flush policy once.
    pub async fn flush_if_ready(&self) -> FlushOutcome {
        if !self.is_transcription_enabled() {
            return FlushOutcome::Disabled;
        }

        let samples = {
            let mut window = self.window();
            if !window.is_ready() {
                return FlushOutcome::NotReady;
            }
            window.take()
        };
        let count = samples.len();
        self.windows_flushed.fetch_add(1, Ordering::Relaxed);
        log::debug!("audio: flushing window of {count} samples");

        let wav = match encode_wav(&samples) {
            Ok(wav) => wav,
            Err(e) => {
                log::warn!("audio: could not frame window ({e}), window discarded");
                return FlushOutcome::Failed { samples: count };
            }
        };

        match self.transcriber.transcribe(wav).await {
            Ok(text) => {
                {
                    let mut transcript = self.lock_transcript();
                    transcript.push(' ');
                    transcript.push_str(&text);
                }
                log::info!("audio: transcribed {count} samples → {text:?}");
                FlushOutcome::Transcribed {
                    samples: count,
                    text,
                }
            }
            Err(e) => {
                log::warn!("audio: transcription failed ({e}), window discarded");
                FlushOutcome::Failed { samples: count }
            }
        }
    }

    /// Run [`flush_if_ready`](Self::flush_if_ready) on a fixed interval until
    /// [`FlushLoop::shutdown`] is called.
    ///
    /// A slow transcription delays only the following ticks of this loop; it
    /// never blocks [`on_raw_frame`](Self::on_raw_frame).  The stop signal is
    /// only checked between evaluations, so shutting down never cancels a
    /// request in flight.
    pub fn spawn_flush_loop(self: &Arc<Self>, period: Duration) -> FlushLoop {
        let pipeline = Arc::clone(self);
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the first
            // evaluation happens one period after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        pipeline.flush_if_ready().await;
                    }
                }
            }
            log::debug!("audio: flush loop stopped");
        });
        FlushLoop { stop, task }
    }

    // -----------------------------------------------------------------------
    // Controls / accessors
    // -----------------------------------------------------------------------

    pub fn set_transcription_enabled(&self, enabled: bool) {
        let was = self.transcription_enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            log::info!("audio: transcription {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_transcription_enabled(&self) -> bool {
        self.transcription_enabled.load(Ordering::SeqCst)
    }

    /// Clear the window and the transcript.
    pub fn reset(&self) {
        self.window().clear();
        self.lock_transcript().clear();
        log::debug!("audio: reset window and transcript");
    }

    /// Accumulated transcript (each segment prefixed with a space).
    pub fn transcript(&self) -> String {
        self.lock_transcript().clone()
    }

    /// Samples currently waiting in the window.
    pub fn window_len(&self) -> usize {
        self.window().len()
    }

    /// Samples discarded by the window's retention cap.
    pub fn samples_dropped(&self) -> u64 {
        self.window().dropped()
    }

    /// Windows taken for transcription, successful or not.
    pub fn windows_flushed(&self) -> u64 {
        self.windows_flushed.load(Ordering::Relaxed)
    }

    fn window(&self) -> MutexGuard<'_, AudioWindow> {
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_transcript(&self) -> MutexGuard<'_, String> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::realtime::AudioChunkLog;
    use crate::codec::WAV_HEADER_LEN;
    use crate::stt::{MockTranscriber, TranscribeError};
    use tokio::sync::Semaphore;

    fn config(enabled: bool) -> AudioConfig {
        AudioConfig {
            transcription_enabled: enabled,
            ..AudioConfig::default()
        }
    }

    fn make_pipeline(
        config: AudioConfig,
        transcriber: Arc<MockTranscriber>,
    ) -> (Arc<AudioPipeline>, Arc<AudioChunkLog>) {
        let chunks = Arc::new(AudioChunkLog::new());
        let pipeline = Arc::new(AudioPipeline::new(
            &config,
            transcriber,
            Arc::clone(&chunks) as Arc<dyn RealtimeAudioSink>,
        ));
        (pipeline, chunks)
    }

    #[test]
    fn each_frame_becomes_a_realtime_chunk_and_extends_the_window() {
        let (pipeline, chunks) = make_pipeline(config(false), Arc::new(MockTranscriber::ok("")));

        pipeline.on_raw_frame(&[0xFF; 160]);
        pipeline.on_raw_frame(&[0x7F; 40]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.chunks()[0].len(), WAV_HEADER_LEN + 320);
        assert_eq!(chunks.chunks()[1].len(), WAV_HEADER_LEN + 80);
        assert_eq!(pipeline.window_len(), 200);
    }

    #[test]
    fn empty_frame_is_ignored() {
        let (pipeline, chunks) = make_pipeline(config(true), Arc::new(MockTranscriber::ok("")));
        pipeline.on_raw_frame(&[]);
        assert!(chunks.is_empty());
        assert_eq!(pipeline.window_len(), 0);
    }

    #[tokio::test]
    async fn window_above_threshold_flushes_once() {
        let stt = Arc::new(MockTranscriber::ok("hello"));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));

        pipeline.on_raw_frame(&[0xFF; 8_001]);
        let outcome = pipeline.flush_if_ready().await;

        assert_eq!(
            outcome,
            FlushOutcome::Transcribed {
                samples: 8_001,
                text: "hello".into()
            }
        );
        assert_eq!(pipeline.window_len(), 0);
        assert_eq!(pipeline.transcript(), " hello");
        assert_eq!(*stt.calls.lock().unwrap(), vec![WAV_HEADER_LEN + 2 * 8_001]);

        assert_eq!(pipeline.flush_if_ready().await, FlushOutcome::NotReady);
        assert_eq!(stt.call_count(), 1);
        assert_eq!(pipeline.windows_flushed(), 1);
    }

    #[tokio::test]
    async fn exactly_threshold_is_not_ready() {
        let stt = Arc::new(MockTranscriber::ok("x"));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));

        pipeline.on_raw_frame(&[0xFF; 8_000]);
        assert_eq!(pipeline.flush_if_ready().await, FlushOutcome::NotReady);
        assert_eq!(stt.call_count(), 0);
    }

    #[tokio::test]
    async fn segments_accumulate_with_separating_space() {
        let stt = Arc::new(MockTranscriber::ok("word"));
        let (pipeline, _) = make_pipeline(config(true), stt);

        for _ in 0..3 {
            pipeline.on_raw_frame(&[0xFF; 8_001]);
            pipeline.flush_if_ready().await;
        }
        assert_eq!(pipeline.transcript(), " word word word");
    }

    #[tokio::test]
    async fn disabled_transcription_retains_samples() {
        let stt = Arc::new(MockTranscriber::ok("late"));
        let (pipeline, _) = make_pipeline(config(false), Arc::clone(&stt));

        pipeline.on_raw_frame(&[0xFF; 9_000]);
        assert_eq!(pipeline.flush_if_ready().await, FlushOutcome::Disabled);
        assert_eq!(pipeline.window_len(), 9_000);

        pipeline.set_transcription_enabled(true);
        assert!(matches!(
            pipeline.flush_if_ready().await,
            FlushOutcome::Transcribed { samples: 9_000, .. }
        ));
        assert_eq!(pipeline.transcript(), " late");
    }

    #[tokio::test]
    async fn disabled_window_is_capped() {
        let mut cfg = config(false);
        cfg.max_window_samples = 10_000;
        let (pipeline, _) = make_pipeline(cfg, Arc::new(MockTranscriber::ok("")));

        for _ in 0..5 {
            pipeline.on_raw_frame(&[0xFF; 4_000]);
        }
        assert_eq!(pipeline.window_len(), 10_000);
        assert_eq!(pipeline.samples_dropped(), 10_000);
        assert!(pipeline.dropping.load(Ordering::Relaxed));

        pipeline.set_transcription_enabled(true);
        pipeline.flush_if_ready().await;
        pipeline.on_raw_frame(&[0xFF; 10]);
        assert!(!pipeline.dropping.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn failed_transcription_still_clears_window() {
        let stt = Arc::new(MockTranscriber::err(TranscribeError::Timeout));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));

        pipeline.on_raw_frame(&[0xFF; 8_001]);
        assert_eq!(
            pipeline.flush_if_ready().await,
            FlushOutcome::Failed { samples: 8_001 }
        );
        assert_eq!(pipeline.window_len(), 0);
        assert_eq!(pipeline.transcript(), "");

        // The next window still flushes.
        pipeline.on_raw_frame(&[0xFF; 8_001]);
        assert!(matches!(
            pipeline.flush_if_ready().await,
            FlushOutcome::Failed { .. }
        ));
        assert_eq!(stt.call_count(), 2);
    }

    #[tokio::test]
    async fn samples_arriving_mid_transcription_start_the_next_window() {
        let gate = Arc::new(Semaphore::new(0));
        let stt = Arc::new(MockTranscriber::ok("first").gated(Arc::clone(&gate)));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));

        pipeline.on_raw_frame(&[0xFF; 8_001]);
        let flush = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.flush_if_ready().await })
        };
        while stt.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        pipeline.on_raw_frame(&[0xFF; 100]);
        gate.add_permits(1);
        flush.await.unwrap();

        assert_eq!(pipeline.window_len(), 100);
        assert_eq!(pipeline.transcript(), " first");
    }

    #[tokio::test]
    async fn reset_clears_window_and_transcript() {
        let (pipeline, _) = make_pipeline(config(true), Arc::new(MockTranscriber::ok("a")));
        pipeline.on_raw_frame(&[0xFF; 8_001]);
        pipeline.flush_if_ready().await;
        pipeline.on_raw_frame(&[0xFF; 10]);

        pipeline.reset();
        assert_eq!(pipeline.window_len(), 0);
        assert_eq!(pipeline.transcript(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_loop_runs_on_the_interval() {
        let stt = Arc::new(MockTranscriber::ok("tick"));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));
        pipeline.on_raw_frame(&[0xFF; 8_001]);

        let flush_loop = pipeline.spawn_flush_loop(Duration::from_millis(1_000));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(stt.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(stt.call_count(), 1);
        assert_eq!(pipeline.transcript(), " tick");

        flush_loop.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_transcription_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let stt = Arc::new(MockTranscriber::ok("late").gated(Arc::clone(&gate)));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));
        pipeline.on_raw_frame(&[0xFF; 8_001]);

        let flush_loop = pipeline.spawn_flush_loop(Duration::from_millis(1_000));
        while stt.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let shutdown = tokio::spawn(flush_loop.shutdown());
        tokio::task::yield_now().await;
        assert!(!shutdown.is_finished());

        gate.add_permits(1);
        shutdown.await.unwrap();

        assert_eq!(pipeline.transcript(), " late");
        assert_eq!(pipeline.windows_flushed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_further_ticks() {
        let stt = Arc::new(MockTranscriber::ok("x"));
        let (pipeline, _) = make_pipeline(config(true), Arc::clone(&stt));

        pipeline.spawn_flush_loop(Duration::from_millis(1_000)).shutdown().await;

        pipeline.on_raw_frame(&[0xFF; 8_001]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stt.call_count(), 0);
        assert_eq!(pipeline.window_len(), 8_001);
    }
}
