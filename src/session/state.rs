//! Session state shared with whoever renders it.
//!
//! [`SessionState`] holds the flags and counters the session mutates while
//! handling events.  [`SessionHandle`] bundles it with the photo album and
//! audio pipeline so a UI can read everything from one clonable value.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::AudioPipeline;
use crate::config::AppConfig;
use crate::photo::{Photo, PhotoAlbum};

/// Connection flags and counters for one device session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The transport reported a live connection.
    pub connected: bool,

    /// Notification subscriptions were set up after the last connect.
    ///
    /// `false` after a subscription failure; a fresh connect retries.
    pub subscribed: bool,

    /// Photo notifications are ignored while `true`.
    pub photo_capture_paused: bool,

    /// Audio notifications are ignored while `false`.
    pub audio_collecting: bool,

    pub transfers_completed: u64,
    pub transfers_dropped: u64,

    /// Photo notifications shorter than the 2-byte header.
    pub malformed_packets: u64,

    /// Photos kept un-rotated because orientation failed.
    pub orientation_failures: u64,

    /// Most recent transport error, cleared on connect.
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            photo_capture_paused: config.photos.paused_on_start,
            audio_collecting: config.audio.collecting_on_start,
            ..Self::default()
        }
    }
}

/// `Arc<Mutex<SessionState>>`: cheap to clone, safe to share across tasks.
pub type SharedSession = Arc<Mutex<SessionState>>;

pub fn new_shared_session(config: &AppConfig) -> SharedSession {
    Arc::new(Mutex::new(SessionState::from_config(config)))
}

pub(crate) fn lock_state(state: &SharedSession) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Read-only view of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) state: SharedSession,
    pub(crate) album: PhotoAlbum,
    pub(crate) audio: Arc<AudioPipeline>,
}

impl SessionHandle {
    /// Copy of the current flags and counters.
    pub fn snapshot(&self) -> SessionState {
        lock_state(&self.state).clone()
    }

    /// Oriented photos in completion order.
    pub fn photos(&self) -> Vec<Photo> {
        self.album.snapshot()
    }

    pub fn photo_count(&self) -> usize {
        self.album.len()
    }

    pub fn transcript(&self) -> String {
        self.audio.transcript()
    }

    pub fn audio_window_len(&self) -> usize {
        self.audio.window_len()
    }

    pub fn windows_flushed(&self) -> u64 {
        self.audio.windows_flushed()
    }

    pub fn is_transcription_enabled(&self) -> bool {
        self.audio.is_transcription_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_flags_follow_config() {
        let mut config = AppConfig::default();
        config.photos.paused_on_start = true;
        config.audio.collecting_on_start = false;

        let state = SessionState::from_config(&config);
        assert!(state.photo_capture_paused);
        assert!(!state.audio_collecting);
        assert!(!state.connected);
        assert_eq!(state.transfers_completed, 0);
    }

    #[test]
    fn shared_session_is_mutable_through_clones() {
        let shared = new_shared_session(&AppConfig::default());
        let other = Arc::clone(&shared);
        lock_state(&shared).connected = true;
        assert!(lock_state(&other).connected);
    }
}
