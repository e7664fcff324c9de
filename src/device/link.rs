//! Outbound half of the device link.
//!
//! The transport layer (BLE stack, simulator, replay file) implements
//! [`ControlChannel`]; the session only ever writes single-byte commands and
//! toggles notification subscriptions through it.

use async_trait::async_trait;
use thiserror::Error;

use super::protocol::Characteristic;

/// Errors reported by the transport.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("device is not connected")]
    Disconnected,

    #[error("write to {characteristic:?} failed: {message}")]
    Write {
        characteristic: Characteristic,
        message: String,
    },

    #[error("subscription change on {characteristic:?} failed: {message}")]
    Subscription {
        characteristic: Characteristic,
        message: String,
    },
}

/// Command side of the device connection.
///
/// Must be `Send + Sync` so a session can hold it behind an `Arc<dyn …>`.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Write `value` to a writable characteristic.
    async fn write(&self, characteristic: Characteristic, value: &[u8]) -> Result<(), LinkError>;

    /// Start (`true`) or stop (`false`) notifications on a characteristic.
    async fn set_notifications(
        &self,
        characteristic: Characteristic,
        enabled: bool,
    ) -> Result<(), LinkError>;
}

/// A channel for links that accept no commands, e.g. replaying a capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullControlChannel;

#[async_trait]
impl ControlChannel for NullControlChannel {
    async fn write(&self, characteristic: Characteristic, value: &[u8]) -> Result<(), LinkError> {
        log::debug!("link: dropping write {value:02x?} to {characteristic:?}");
        Ok(())
    }

    async fn set_notifications(
        &self,
        characteristic: Characteristic,
        enabled: bool,
    ) -> Result<(), LinkError> {
        log::debug!("link: notifications on {characteristic:?} → {enabled}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingControlChannel  (test-only)
// ---------------------------------------------------------------------------

/// Test double that records every call and can be told to fail writes.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingControlChannel {
    pub writes: std::sync::Mutex<Vec<(Characteristic, Vec<u8>)>>,
    pub subscriptions: std::sync::Mutex<Vec<(Characteristic, bool)>>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl RecordingControlChannel {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ControlChannel for RecordingControlChannel {
    async fn write(&self, characteristic: Characteristic, value: &[u8]) -> Result<(), LinkError> {
        self.writes
            .lock()
            .unwrap()
            .push((characteristic, value.to_vec()));
        if self.fail_writes {
            return Err(LinkError::Write {
                characteristic,
                message: "simulated".into(),
            });
        }
        Ok(())
    }

    async fn set_notifications(
        &self,
        characteristic: Characteristic,
        enabled: bool,
    ) -> Result<(), LinkError> {
        self.subscriptions
            .lock()
            .unwrap()
            .push((characteristic, enabled));
        Ok(())
    }
}
