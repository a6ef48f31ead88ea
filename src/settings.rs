//! Game settings and preferences
//!
//! Persisted as a JSON file next to the binary (or wherever the caller
//! points). Missing fields fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default serial device for the tilt sensor
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM6";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Baud rate the sensor firmware streams at
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Device path or COM port name
    pub port: String,
    pub baud_rate: u32,
    /// How long to wait for the first valid record before falling back
    pub first_reading_timeout_ms: u64,
    /// Sleep between polls while waiting
    pub poll_interval_ms: u64,
    /// Serial read timeout
    pub read_timeout_ms: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            first_reading_timeout_ms: 5000,
            poll_interval_ms: 100,
            read_timeout_ms: 100,
        }
    }
}

impl SensorSettings {
    pub fn first_reading_timeout(&self) -> Duration {
        Duration::from_millis(self.first_reading_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Audio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Open an audio device at all
    pub enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Start muted
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            master_volume: 1.0,
            muted: false,
        }
    }
}

/// Tilt-to-movement mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Degrees of tilt for one unit of movement
    pub tilt_scale: f32,
    /// Per-axis movement below this is treated as zero
    pub deadzone: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tilt_scale: 25.0,
            deadzone: 0.1,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub sensor: SensorSettings,
    pub audio: AudioSettings,
    pub controls: ControlSettings,
}

impl Settings {
    /// Clamp out-of-range values from hand-edited files
    pub fn sanitize(&mut self) {
        self.audio.master_volume = self.audio.master_volume.clamp(0.0, 1.0);
        if !(self.controls.tilt_scale.is_finite() && self.controls.tilt_scale > 0.0) {
            self.controls.tilt_scale = ControlSettings::default().tilt_scale;
        }
        self.controls.deadzone = self.controls.deadzone.max(0.0);
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring invalid settings in {}: {}", path.display(), e),
            },
            Err(e) => log::info!("No settings at {} ({})", path.display(), e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to `path` as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
