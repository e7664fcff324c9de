//! Photo chunk reassembly.
//!
//! A photo arrives as a run of notifications with contiguous sequence ids
//! starting at 0, closed by the end-of-transfer sentinel:
//!
//! ```text
//!              id == 0                       id == expected
//!   ┌──────┐ ───────────▶ ┌───────────┐ ◀──────────────────┐
//!   │ Idle │              │ Receiving │ ───────────────────┘
//!   └──────┘ ◀─────────── └───────────┘
//!      ▲      sentinel → Completed(buffer)
//!      │      id != expected → Dropped
//!      └── sentinel / id != 0 while Idle → Ignored
//! ```
//!
//! There is no retransmission: a gap loses the photo in flight and the
//! reassembler waits for the device to start the next transfer at id 0.

use crate::device::PhotoPacket;

/// Where the reassembler is in the current transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferState {
    /// Waiting for a chunk with id 0.
    #[default]
    Idle,
    /// Mid-transfer; the next acceptable chunk id is `expected`.
    Receiving { expected: u32 },
}

/// Result of feeding one chunk to [`PhotoReassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk or sentinel arrived while idle and was not id 0.
    Ignored,
    /// Id 0 opened a new transfer.
    Started,
    /// The chunk extended the current transfer.
    Appended,
    /// The sentinel closed the transfer; here are the photo bytes.
    Completed(Vec<u8>),
    /// An out-of-order id discarded the transfer.
    Dropped { expected: u32, received: u16 },
}

/// Per-connection photo transfer state machine.
#[derive(Debug, Default)]
pub struct PhotoReassembler {
    state: TransferState,
    buffer: Vec<u8>,
}

impl PhotoReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded notification.
    pub fn on_packet(&mut self, packet: PhotoPacket<'_>) -> ChunkOutcome {
        self.on_chunk(packet.id(), packet.payload())
    }

    /// Feed one chunk.  `id == None` is the end-of-transfer sentinel.
    pub fn on_chunk(&mut self, id: Option<u16>, payload: &[u8]) -> ChunkOutcome {
        match (self.state, id) {
            (TransferState::Idle, Some(0)) => {
                self.buffer.clear();
                self.buffer.extend_from_slice(payload);
                self.state = TransferState::Receiving { expected: 1 };
                log::debug!("reassembler: transfer started");
                ChunkOutcome::Started
            }
            (TransferState::Idle, _) => {
                log::trace!("reassembler: ignoring {id:?} while idle");
                ChunkOutcome::Ignored
            }
            (TransferState::Receiving { .. }, None) => {
                let photo = std::mem::take(&mut self.buffer);
                self.state = TransferState::Idle;
                log::info!("reassembler: photo complete ({} bytes)", photo.len());
                ChunkOutcome::Completed(photo)
            }
            (TransferState::Receiving { expected }, Some(received))
                if u32::from(received) == expected =>
            {
                self.buffer.extend_from_slice(payload);
                self.state = TransferState::Receiving {
                    expected: expected + 1,
                };
                ChunkOutcome::Appended
            }
            (TransferState::Receiving { expected }, Some(received)) => {
                log::warn!(
                    "reassembler: chunk {received} out of order (expected {expected}), \
                     dropping {} buffered bytes",
                    self.buffer.len()
                );
                self.buffer.clear();
                self.state = TransferState::Idle;
                ChunkOutcome::Dropped { expected, received }
            }
        }
    }

    /// Abandon any transfer in flight.
    pub fn reset(&mut self) {
        if matches!(self.state, TransferState::Receiving { .. }) {
            log::debug!(
                "reassembler: reset mid-transfer, discarding {} bytes",
                self.buffer.len()
            );
        }
        self.buffer.clear();
        self.state = TransferState::Idle;
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Bytes accumulated for the transfer in flight.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
