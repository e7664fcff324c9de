//! Photo path: chunk notifications → whole photos → oriented album → sink.
//!
//! ```text
//! PhotoData notification → PhotoPacket::parse → PhotoReassembler
//!     Completed(bytes) → spawn_orient(ImageOrienter) → PhotoAlbum::push (in order)
//!                      → PhotoForwarder::notify ─▶ PhotoSink (coalesced)
//! ```

pub mod album;
pub mod forwarder;
pub mod orient;
pub mod reassembler;

pub use album::{Photo, PhotoAlbum};
pub use forwarder::{PhotoForwarder, PhotoSink, SinkError};
pub use orient::{orient_blocking, spawn_orient, ImageOrienter, OrientError, RotatingOrienter};
pub use reassembler::{ChunkOutcome, PhotoReassembler, TransferState};

#[cfg(test)]
pub use forwarder::RecordingSink;
