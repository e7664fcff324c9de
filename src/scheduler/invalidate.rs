//! [`InvalidateSync`], the coalescing single-flight runner.
//!
//! The job is a no-argument closure returning a boxed future.  It should read
//! whatever state it needs *when it runs*, not when it was invalidated: the
//! scheduler only guarantees that a run starts after every invalidation, not
//! one run per invalidation.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Future returned by a job body.
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type Job = Arc<dyn Fn() -> JobFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// SyncStatus
// ---------------------------------------------------------------------------

/// Execution state of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing running, nothing pending.
    #[default]
    Idle,
    /// One run in flight, no invalidation since it started.
    Running,
    /// One run in flight and at least one invalidation since it started;
    /// exactly one more run will follow.
    RunningAndDirty,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Control {
    status: SyncStatus,
    stopped: bool,
    /// Number of runs started so far; run `n` is the n-th to start.
    started: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    completed: u64,
    stopped: bool,
}

struct Shared {
    name: String,
    job: Job,
    control: Mutex<Control>,
    progress: watch::Sender<Progress>,
}

// ---------------------------------------------------------------------------
// InvalidateSync
// ---------------------------------------------------------------------------

/// Coalescing single-flight job runner.
///
/// Cheap to clone; clones drive the same job.  Runs are spawned on the
/// ambient tokio runtime, so [`invalidate`](Self::invalidate) must be called
/// from within one.
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use device_stream::scheduler::InvalidateSync;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
/// let sync = InvalidateSync::new("example", move || {
///     let counter = Arc::clone(&counter);
///     Box::pin(async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
/// });
///
/// sync.invalidate_and_await().await;
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// # }
/// ```
#[derive(Clone)]
pub struct InvalidateSync {
    shared: Arc<Shared>,
}

impl InvalidateSync {
    /// Register `job`.  Nothing runs until the first invalidation.
    ///
    /// `name` only appears in log lines.
    pub fn new<F>(name: impl Into<String>, job: F) -> Self
    where
        F: Fn() -> JobFuture + Send + Sync + 'static,
    {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                job: Arc::new(job),
                control: Mutex::new(Control {
                    status: SyncStatus::Idle,
                    stopped: false,
                    started: 0,
                }),
                progress,
            }),
        }
    }

    /// Ask for the job to run soon.  Never blocks and never starts a second
    /// concurrent run.
    pub fn invalidate(&self) {
        let _ = self.request();
    }

    /// Invalidate, then wait until a run that started at or after this call
    /// has finished.
    ///
    /// Returns early if the sync is (or becomes) stopped.
    pub async fn invalidate_and_await(&self) {
        let mut rx = self.shared.progress.subscribe();
        let Some(target) = self.request() else {
            return;
        };
        let _ = rx
            .wait_for(|p| p.completed >= target || p.stopped)
            .await;
    }

    /// Stop accepting invalidations.  A run in flight is allowed to finish
    /// but no follow-up run starts; pending awaiters are released.
    pub fn stop(&self) {
        {
            let mut control = lock(&self.shared.control);
            if control.stopped {
                return;
            }
            control.stopped = true;
        }
        self.shared.progress.send_modify(|p| p.stopped = true);
        log::debug!("sync[{}]: stopped", self.shared.name);
    }

    /// Current execution state.
    pub fn status(&self) -> SyncStatus {
        lock(&self.shared.control).status
    }

    /// Number of runs that have finished so far.
    pub fn completed_runs(&self) -> u64 {
        self.shared.progress.borrow().completed
    }

    /// Apply one invalidation to the state machine.
    ///
    /// Returns the ordinal of the run that is guaranteed to observe it, or
    /// `None` once stopped.
    fn request(&self) -> Option<u64> {
        let start = {
            let mut control = lock(&self.shared.control);
            if control.stopped {
                return None;
            }
            match control.status {
                SyncStatus::Idle => {
                    control.status = SyncStatus::Running;
                    control.started += 1;
                    Some(control.started)
                }
                SyncStatus::Running => {
                    control.status = SyncStatus::RunningAndDirty;
                    return Some(control.started + 1);
                }
                SyncStatus::RunningAndDirty => return Some(control.started + 1),
            }
        };

        tokio::spawn(drive(Arc::clone(&self.shared)));
        start
    }
}

impl std::fmt::Debug for InvalidateSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidateSync")
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Run the job until no invalidation arrived during the last run.
async fn drive(shared: Arc<Shared>) {
    loop {
        // Spawned so a panicking job cannot leave the status stuck in Running.
        if let Err(e) = tokio::spawn((shared.job)()).await {
            log::error!("sync[{}]: job failed: {e}", shared.name);
        }
        shared.progress.send_modify(|p| p.completed += 1);

        let again = {
            let mut control = lock(&shared.control);
            if control.status == SyncStatus::RunningAndDirty && !control.stopped {
                control.status = SyncStatus::Running;
                control.started += 1;
                true
            } else {
                control.status = SyncStatus::Idle;
                false
            }
        };

        if !again {
            break;
        }
        log::debug!("sync[{}]: invalidated during run, running again", shared.name);
    }
}

/// The control block holds plain data, so a poisoned lock is still usable.
fn lock(control: &Mutex<Control>) -> std::sync::MutexGuard<'_, Control> {
    control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
