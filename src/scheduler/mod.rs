//! Single-flight, coalescing execution of background jobs.
//!
//! [`InvalidateSync`] runs one registered job "soon" after each
//! [`invalidate`](InvalidateSync::invalidate), never concurrently with itself,
//! and folds any number of invalidations that land mid-run into exactly one
//! follow-up run.
//!
//! ```text
//!            invalidate()                 invalidate()
//!   Idle ───────────────▶ Running ───────────────────▶ RunningAndDirty
//!    ▲                      │  ▲                              │
//!    │      job finished    │  │       job finished           │
//!    └──────────────────────┘  └──────────────────────────────┘
//!                                 (starts the job again)
//! ```

pub mod invalidate;

pub use invalidate::{InvalidateSync, JobFuture, SyncStatus};
