//! Device transport boundary.
//!
//! Discovery, pairing and GATT plumbing live outside this crate.  This module
//! only describes what crosses the boundary:
//!
//! * [`protocol`]: characteristic UUIDs, photo packet framing, control bytes.
//! * [`link`]: the [`ControlChannel`] trait the session writes commands to.

pub mod link;
pub mod protocol;

pub use link::{ControlChannel, LinkError, NullControlChannel};
#[cfg(test)]
pub use link::RecordingControlChannel;
pub use protocol::{
    AudioCodec, CaptureCommand, Characteristic, PacketError, PhotoPacket, SERVICE_UUID,
};
