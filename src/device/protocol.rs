//! Wire-level description of the capture device's GATT service.
//!
//! # Photo packets
//!
//! ```text
//! ┌──────────────┬─────────────────────────┐
//! │ id (u16 LE)  │ payload (0..n bytes)    │   chunk of a photo transfer
//! └──────────────┴─────────────────────────┘
//! ┌──────┬──────┐
//! │ 0xFF │ 0xFF │                              end-of-transfer sentinel
//! └──────┴──────┘
//! ```
//!
//! Audio packets carry no header: every byte is one companded sample.

use thiserror::Error;

/// Primary service exposed by the device.
pub const SERVICE_UUID: &str = "19b10000-e8f2-537e-4f6c-d104768a1214";

const AUDIO_DATA_UUID: &str = "19b10001-e8f2-537e-4f6c-d104768a1214";
const AUDIO_CODEC_UUID: &str = "19b10002-e8f2-537e-4f6c-d104768a1214";
const PHOTO_DATA_UUID: &str = "19b10005-e8f2-537e-4f6c-d104768a1214";
const PHOTO_CONTROL_UUID: &str = "19b10006-e8f2-537e-4f6c-d104768a1214";

/// Reserved first two bytes marking the end of a photo transfer.
const SENTINEL: [u8; 2] = [0xFF, 0xFF];

// ---------------------------------------------------------------------------
// Characteristic
// ---------------------------------------------------------------------------

/// Logical channels on the device service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Notifications carrying companded audio bytes.
    AudioData,
    /// Write-only codec selector for the audio stream.
    AudioCodec,
    /// Notifications carrying photo chunks.
    PhotoData,
    /// Write-only capture start/stop control.
    PhotoControl,
}

impl Characteristic {
    /// GATT UUID of this characteristic (lower-case, hyphenated).
    pub fn uuid(self) -> &'static str {
        match self {
            Characteristic::AudioData => AUDIO_DATA_UUID,
            Characteristic::AudioCodec => AUDIO_CODEC_UUID,
            Characteristic::PhotoData => PHOTO_DATA_UUID,
            Characteristic::PhotoControl => PHOTO_CONTROL_UUID,
        }
    }
}

// ---------------------------------------------------------------------------
// Control bytes
// ---------------------------------------------------------------------------

/// Single-byte commands accepted by [`Characteristic::PhotoControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    /// Stop periodic capture.
    Stop,
    /// Capture one photo every 5 seconds.
    StartEvery5s,
}

impl CaptureCommand {
    pub fn as_byte(self) -> u8 {
        match self {
            CaptureCommand::Stop => 0x00,
            CaptureCommand::StartEvery5s => 0x05,
        }
    }
}

/// Values accepted by [`Characteristic::AudioCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// 8-bit companded samples, one per byte.
    MuLaw,
}

impl AudioCodec {
    pub fn as_byte(self) -> u8 {
        match self {
            AudioCodec::MuLaw => 0x00,
        }
    }
}

// ---------------------------------------------------------------------------
// PhotoPacket
// ---------------------------------------------------------------------------

/// Malformed photo notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("photo packet too short: {0} byte(s), need at least 2")]
    TooShort(usize),
}

/// One decoded photo notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoPacket<'a> {
    /// A slice of the image with its position in the transfer.
    Chunk { id: u16, payload: &'a [u8] },
    /// The transfer is complete.  Any trailing bytes are ignored.
    End,
}

impl<'a> PhotoPacket<'a> {
    /// Split a raw notification into sequence id and payload.
    ///
    /// ```
    /// use device_stream::device::PhotoPacket;
    ///
    /// assert_eq!(
    ///     PhotoPacket::parse(&[0x01, 0x00, b'A']).unwrap(),
    ///     PhotoPacket::Chunk { id: 1, payload: b"A" }
    /// );
    /// assert_eq!(PhotoPacket::parse(&[0xFF, 0xFF]).unwrap(), PhotoPacket::End);
    /// ```
    pub fn parse(raw: &'a [u8]) -> Result<Self, PacketError> {
        if raw.len() < 2 {
            return Err(PacketError::TooShort(raw.len()));
        }
        if raw[..2] == SENTINEL {
            return Ok(PhotoPacket::End);
        }
        Ok(PhotoPacket::Chunk {
            id: u16::from_le_bytes([raw[0], raw[1]]),
            payload: &raw[2..],
        })
    }

    /// The sequence id, or `None` for the sentinel.
    pub fn id(&self) -> Option<u16> {
        match self {
            PhotoPacket::Chunk { id, .. } => Some(*id),
            PhotoPacket::End => None,
        }
    }

    /// The payload bytes (empty for the sentinel).
    pub fn payload(&self) -> &'a [u8] {
        match self {
            PhotoPacket::Chunk { payload, .. } => payload,
            PhotoPacket::End => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_little_endian() {
        let packet = PhotoPacket::parse(&[0x34, 0x12, 9, 8]).unwrap();
        assert_eq!(packet.id(), Some(0x1234));
        assert_eq!(packet.payload(), &[9, 8]);
    }

    #[test]
    fn header_only_chunk_has_empty_payload() {
        let packet = PhotoPacket::parse(&[0x00, 0x00]).unwrap();
        assert_eq!(packet, PhotoPacket::Chunk { id: 0, payload: &[] });
    }

    #[test]
    fn sentinel_ignores_trailing_bytes() {
        let packet = PhotoPacket::parse(&[0xFF, 0xFF, 1, 2, 3]).unwrap();
        assert_eq!(packet, PhotoPacket::End);
        assert!(packet.payload().is_empty());
        assert_eq!(packet.id(), None);
    }

    #[test]
    fn half_sentinel_is_a_chunk() {
        let packet = PhotoPacket::parse(&[0xFF, 0x00]).unwrap();
        assert_eq!(packet.id(), Some(0x00FF));
    }

    #[test]
    fn short_packets_are_rejected() {
        assert_eq!(PhotoPacket::parse(&[]), Err(PacketError::TooShort(0)));
        assert_eq!(PhotoPacket::parse(&[0x01]), Err(PacketError::TooShort(1)));
    }

    #[test]
    fn control_bytes() {
        assert_eq!(CaptureCommand::Stop.as_byte(), 0x00);
        assert_eq!(CaptureCommand::StartEvery5s.as_byte(), 0x05);
        assert_eq!(AudioCodec::MuLaw.as_byte(), 0x00);
    }

    #[test]
    fn characteristic_uuids_share_service_base() {
        for c in [
            Characteristic::AudioData,
            Characteristic::AudioCodec,
            Characteristic::PhotoData,
            Characteristic::PhotoControl,
        ] {
            assert!(c.uuid().ends_with("-e8f2-537e-4f6c-d104768a1214"));
            assert_ne!(c.uuid(), SERVICE_UUID);
        }
        assert!(Characteristic::PhotoData.uuid().starts_with("19b10005"));
    }
}
