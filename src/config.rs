// src/config.rs

//! Configuration for the display device and the demo producer.
//!
//! All structs deserialize from JSON with `#[serde(default)]`, so a config
//! file only has to name the values it changes:
//!
//! ```json
//! { "device": { "width": 320, "height": 240, "fullscreen": true } }
//! ```
//!
//! The process-wide `CONFIG` is read once from the file named by the
//! `CORE_DISPLAY_CONFIG` environment variable, falling back to defaults.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the path of a JSON config file.
pub const CONFIG_PATH_ENV: &str = "CORE_DISPLAY_CONFIG";

/// Global configuration, loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window and render-thread settings.
    pub device: DeviceConfig,
    /// Settings for the test-pattern producer in the demo binary.
    pub demo: DemoConfig,
}

/// Construction parameters of a `DisplayDevice`. Immutable once the device
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Frame width in pixels. Must be non-zero.
    pub width: u32,
    /// Frame height in pixels. Must be non-zero.
    pub height: u32,
    /// Window caption.
    pub title: String,
    /// Request a fullscreen surface.
    pub fullscreen: bool,
    /// How long the render thread sleeps when there is nothing to present.
    /// This also bounds how long `stop()` waits for the thread to notice.
    pub idle_sleep_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            width: 640,
            height: 480,
            title: "core-display".to_string(),
            fullscreen: false,
            idle_sleep_ms: 5,
        }
    }
}

impl DeviceConfig {
    pub fn new(width: u32, height: u32, title: impl Into<String>, fullscreen: bool) -> Self {
        DeviceConfig {
            width,
            height,
            title: title.into(),
            fullscreen,
            ..Default::default()
        }
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    /// Rejects sizes and intervals the render loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "Invalid frame size {}x{}: both dimensions must be non-zero",
                self.width,
                self.height
            ));
        }
        if self.idle_sleep_ms == 0 {
            return Err(anyhow!("idle_sleep_ms must be at least 1"));
        }
        Ok(())
    }
}

/// Demo producer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Delay between two submitted frames.
    pub frame_interval_ms: u64,
    /// Stop after this many frames. `None` runs until the window closes.
    pub max_frames: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            frame_interval_ms: 33,
            max_frames: None,
        }
    }
}

impl Config {
    /// Parses a JSON document and validates the device section.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(text).context("Failed to parse configuration JSON")?;
        config.device.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads the file named by `CORE_DISPLAY_CONFIG`, or returns defaults.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Configuration loaded from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("{:#}; using default configuration", e);
                    Config::default()
                }
            },
            None => Config::default(),
        }
    }
}
