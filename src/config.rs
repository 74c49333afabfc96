//! Configuration types for device, sync and daemon settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Factory-default IP of the camera's wifi access point.
pub const DEFAULT_ADDRESS: &str = "192.168.122.1";
/// Port of the embedded media server.
pub const DEFAULT_PORT: u16 = 64321;

/// Network location of the camera's media server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// IP address or hostname of the camera.
    pub address: String,
    /// TCP port of the media server.
    pub port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl DeviceConfig {
    /// Base URL all device endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// Sets the device address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the device port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Settings for one traversal pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory the remote tree is mirrored into.
    pub output_dir: PathBuf,
    /// Optional quality marker searched for in `protocolInfo` tags.
    ///
    /// When set, size-based resource selection is bypassed entirely and the
    /// marker decides which variant is fetched.
    pub quality: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            quality: None,
        }
    }
}

impl SyncConfig {
    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the quality marker filter.
    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }
}

/// Default mirror directory: the user's pictures dir, or the cwd as a
/// last resort.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cam-dl")
}

/// Daemon-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Seconds to wait between passes.
    pub interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl DaemonConfig {
    /// Wait between passes as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Device location.
    pub device: DeviceConfig,
    /// Sync settings.
    pub sync: SyncConfig,
    /// Daemon settings.
    pub daemon: DaemonConfig,
}

impl AppConfig {
    /// Path of the optional TOML config file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cam-dl").join("config.toml"))
    }

    /// Loads configuration from the config file if present, defaults
    /// otherwise. CLI flags are applied on top by the binary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the file exists but cannot be
    /// read or parsed.
    pub fn load() -> crate::Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))
    }
}
