//! Forwards newly completed photos to a downstream consumer.
//!
//! The forwarder is an [`InvalidateSync`] job.  Its only state is how many
//! album entries it has already handed over; each run forwards the tail of
//! the album after that point.  The counter is advanced *before* the sink is
//! awaited, so photos appended during a slow forward land in the follow-up
//! run instead of being sent twice.  A failed forward is logged and not
//! retried.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::photo::album::{Photo, PhotoAlbum};
use crate::scheduler::{InvalidateSync, SyncStatus};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("photo sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("photo sink rejected batch: {0}")]
    Rejected(String),
}

/// Downstream consumer of photo batches (captioning, upload, disk).
#[async_trait]
pub trait PhotoSink: Send + Sync {
    /// `first_index` is the album index of `batch[0]`.
    async fn forward(&self, first_index: usize, batch: Vec<Photo>) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// PhotoForwarder
// ---------------------------------------------------------------------------

/// Cloning shares the underlying job and counter.
#[derive(Clone)]
pub struct PhotoForwarder {
    sync: InvalidateSync,
    forwarded: Arc<AtomicUsize>,
}

impl PhotoForwarder {
    pub fn new(album: PhotoAlbum, sink: Arc<dyn PhotoSink>) -> Self {
        let forwarded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&forwarded);

        let sync = InvalidateSync::new("photos", move || {
            let album = album.clone();
            let sink = Arc::clone(&sink);
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let start = counter.load(Ordering::SeqCst);
                let batch = album.since(start);
                if batch.is_empty() {
                    return;
                }
                counter.store(start + batch.len(), Ordering::SeqCst);

                let count = batch.len();
                log::debug!("sync: forwarding {count} photo(s) from #{start}");
                if let Err(e) = sink.forward(start, batch).await {
                    log::warn!("sync: forwarding {count} photo(s) failed: {e}");
                }
            })
        });

        Self { sync, forwarded }
    }

    /// Signal that the album has grown.
    pub fn notify(&self) {
        self.sync.invalidate();
    }

    /// Signal and wait until everything currently in the album was handed
    /// to the sink.
    pub async fn flush(&self) {
        self.sync.invalidate_and_await().await;
    }

    pub fn stop(&self) {
        self.sync.stop();
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }
}

// ---------------------------------------------------------------------------
// RecordingSink  (test-only)
// ---------------------------------------------------------------------------

/// Records every batch; optionally fails or blocks on a semaphore gate.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub batches: std::sync::Mutex<Vec<(usize, Vec<Photo>)>>,
    pub fail: bool,
    pub gate: Option<Arc<tokio::sync::Semaphore>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, b)| b.len())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl PhotoSink for RecordingSink {
    async fn forward(&self, first_index: usize, batch: Vec<Photo>) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push((first_index, batch));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail {
            return Err(SinkError::Rejected("simulated".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn forwards_only_new_photos() {
        let album = PhotoAlbum::new();
        let sink = Arc::new(RecordingSink::default());
        let fwd = PhotoForwarder::new(album.clone(), Arc::clone(&sink) as Arc<dyn PhotoSink>);

        album.push(vec![1]);
        album.push(vec![2]);
        fwd.flush().await;
        album.push(vec![3]);
        fwd.flush().await;

        assert_eq!(sink.batch_sizes(), vec![2, 1]);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[1].0, 2);
        assert_eq!(&*batches[1].1[0], &[3]);
        assert_eq!(fwd.forwarded(), 3);
    }

    #[tokio::test]
    async fn empty_album_forwards_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let fwd = PhotoForwarder::new(PhotoAlbum::new(), Arc::clone(&sink) as Arc<dyn PhotoSink>);
        fwd.flush().await;
        assert!(sink.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn photos_added_during_forward_go_in_one_follow_up_batch() {
        let gate = Arc::new(Semaphore::new(0));
        let album = PhotoAlbum::new();
        let sink = Arc::new(RecordingSink {
            gate: Some(Arc::clone(&gate)),
            ..RecordingSink::default()
        });
        let fwd = PhotoForwarder::new(album.clone(), Arc::clone(&sink) as Arc<dyn PhotoSink>);

        album.push(vec![0]);
        fwd.notify();
        while sink.batch_sizes().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(fwd.status(), SyncStatus::Running);

        for i in 1..=3u8 {
            album.push(vec![i]);
            fwd.notify();
        }
        assert_eq!(fwd.status(), SyncStatus::RunningAndDirty);

        gate.add_permits(2);
        fwd.flush().await;

        assert_eq!(sink.batch_sizes(), vec![1, 3]);
        assert_eq!(fwd.forwarded(), 4);
    }

    #[tokio::test]
    async fn failed_forward_is_not_retried() {
        let album = PhotoAlbum::new();
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let fwd = PhotoForwarder::new(album.clone(), Arc::clone(&sink) as Arc<dyn PhotoSink>);

        album.push(vec![1]);
        fwd.flush().await;
        fwd.flush().await;

        assert_eq!(sink.batch_sizes(), vec![1]);
        assert_eq!(fwd.forwarded(), 1);
        assert_eq!(fwd.status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn stopped_forwarder_ignores_notifications() {
        let album = PhotoAlbum::new();
        let sink = Arc::new(RecordingSink::default());
        let fwd = PhotoForwarder::new(album.clone(), Arc::clone(&sink) as Arc<dyn PhotoSink>);

        fwd.stop();
        album.push(vec![1]);
        fwd.notify();
        fwd.flush().await;

        assert!(sink.batch_sizes().is_empty());
    }
}
