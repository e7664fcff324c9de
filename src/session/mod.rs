//! Device session: the explicit per-connection object.
//!
//! ```text
//! transport ──SessionEvent (mpsc)──▶ DeviceSession::run()
//!                                       ├─ PhotoReassembler → album → PhotoForwarder
//!                                       ├─ AudioPipeline (+ flush loop task)
//!                                       └─ ControlChannel (codec, capture, subscriptions)
//!
//! SessionHandle ◀── read by UI / binary
//! ```

pub mod runner;
pub mod state;

pub use runner::{DeviceSession, SessionEvent};
pub use state::{new_shared_session, SessionHandle, SessionState, SharedSession};
