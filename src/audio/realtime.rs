//! Per-notification audio forwarding.
//!
//! Every audio notification is framed into its own small WAV container and
//! handed to a [`RealtimeAudioSink`] immediately, independent of window
//! flushing.  [`AudioChunkLog`] is the in-memory sink the UI lists.

use std::sync::Mutex;

/// Receives one WAV container per audio notification, in arrival order.
///
/// Called on the notification path, so implementations must not block.
pub trait RealtimeAudioSink: Send + Sync {
    fn push_chunk(&self, wav: Vec<u8>);
}

/// Retains every realtime chunk.
#[derive(Debug, Default)]
pub struct AudioChunkLog {
    chunks: Mutex<Vec<Vec<u8>>>,
}

impl AudioChunkLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks received.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Combined size of every chunk in bytes.
    pub fn total_bytes(&self) -> usize {
        self.lock().iter().map(Vec::len).sum()
    }

    /// Copy of all chunks received so far.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.chunks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RealtimeAudioSink for AudioChunkLog {
    fn push_chunk(&self, wav: Vec<u8>) {
        log::trace!("audio: realtime chunk of {} bytes", wav.len());
        self.lock().push(wav);
    }
}
