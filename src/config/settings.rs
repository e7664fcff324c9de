//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every field has a serde default, so a partial `settings.toml` only needs
//! the keys it overrides.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Windowing and flush policy for the device audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// A window is flushed once it holds *more* than this many samples
    /// (8 000 samples = 1 s at 8 kHz).
    pub window_threshold_samples: usize,
    /// How often the flush policy is evaluated, in milliseconds.
    pub flush_interval_ms: u64,
    /// Upper bound on retained samples while transcription is disabled.
    /// Oldest samples are dropped beyond it.  `0` keeps everything.
    pub max_window_samples: usize,
    /// Whether windows are sent for transcription at startup.
    pub transcription_enabled: bool,
    /// Whether audio notifications are collected at startup.
    pub collecting_on_start: bool,
}

impl AudioConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    /// The retention cap, or `None` when the window is unbounded.
    pub fn max_window(&self) -> Option<usize> {
        (self.max_window_samples > 0).then_some(self.max_window_samples)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_threshold_samples: 8_000,
            flush_interval_ms: 1_000,
            max_window_samples: 480_000,
            transcription_enabled: false,
            collecting_on_start: true,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-to-text service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Base URL of the API endpoint (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// Bearer token.  Windows still flush without one, but every call fails.
    pub api_key: Option<String>,
    /// Model identifier sent with each upload.
    pub model: String,
    /// Per-request timeout.  `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation / PhotoConfig
// ---------------------------------------------------------------------------

/// Clockwise rotation applied to every completed photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Default for Rotation {
    fn default() -> Self {
        // The camera module is mounted sideways.
        Self::Rotate270
    }
}

/// Photo capture and orientation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub rotation: Rotation,
    /// Re-encode quality for JPEG photos (1–100).
    pub jpeg_quality: u8,
    /// Start with periodic capture stopped.
    pub paused_on_start: bool,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            rotation: Rotation::default(),
            jpeg_quality: 90,
            paused_on_start: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use device_stream::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub photos: PhotoConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
