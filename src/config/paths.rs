//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\device-stream\
//!   macOS:   ~/Library/Application Support/device-stream/
//!   Linux:   ~/.config/device-stream/
//!
//! Data dir (received photos):
//!   Windows: %LOCALAPPDATA%\device-stream\
//!   macOS:   ~/Library/Application Support/device-stream/
//!   Linux:   ~/.local/share/device-stream/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Root of the local data directory.
    pub data_dir: PathBuf,
    /// Where forwarded photos are written by the replay tool.
    pub photos_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "device-stream";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let photos_dir = data_dir.join("photos");

        Self {
            config_dir,
            settings_file,
            data_dir,
            photos_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.photos_dir.starts_with(&paths.data_dir));
    }
}
