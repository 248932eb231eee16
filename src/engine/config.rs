//! Engine Configuration
//!
//! Loaded from an optional JSON file. Every field has a default, so an empty
//! object (or no file at all) gives the stock setup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::INPUT_GAIN_RANGE;
use crate::error::{FxError, Result};

/// Default processing sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default device buffer size in frames
pub const DEFAULT_BUFFER_FRAMES: u32 = 64;

/// Default input-to-output ring capacity in samples
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// Default input gain of the stock rig
pub const DEFAULT_INPUT_GAIN: f32 = 5.0;

/// Live audio device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Sample rate requested from both devices.
    pub sample_rate: u32,

    /// Fixed device buffer size in frames.
    pub buffer_frames: u32,

    /// Input channel fed into the chain (0-based).
    pub input_channel: u16,

    /// Input device name. Default device when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,

    /// Output device name. Default device when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,

    /// Capacity of the input-to-output sample ring.
    pub ring_capacity: usize,

    /// Interval between stream health reports, in milliseconds.
    pub status_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            input_channel: 0,
            input_device: None,
            output_device: None,
            ring_capacity: DEFAULT_RING_CAPACITY,
            status_interval_ms: 1000,
        }
    }
}

/// Offline render settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frames processed per block.
    pub block_frames: usize,

    /// Channel of the input file fed into the chain (0-based).
    pub input_channel: u16,

    /// Channels written to the output file. The mono result is copied to each.
    pub output_channels: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_frames: 512,
            input_channel: 0,
            output_channels: 2,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain input gain at startup.
    pub input_gain: f32,

    /// Live audio settings.
    pub host: HostConfig,

    /// Offline render settings.
    pub render: RenderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_gain: DEFAULT_INPUT_GAIN,
            host: HostConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate a JSON configuration string
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        if !INPUT_GAIN_RANGE.contains(self.input_gain) {
            return Err(invalid(format!(
                "input_gain {} is outside {}",
                self.input_gain, INPUT_GAIN_RANGE
            )));
        }
        self.host.validate()?;
        self.render.validate()
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FxError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }
        if self.buffer_frames == 0 {
            return Err(invalid("buffer_frames must be at least 1"));
        }
        if self.ring_capacity < self.buffer_frames as usize {
            return Err(invalid(format!(
                "ring_capacity {} is smaller than one buffer ({} frames)",
                self.ring_capacity, self.buffer_frames
            )));
        }
        if self.status_interval_ms == 0 {
            return Err(invalid("status_interval_ms must be at least 1"));
        }
        Ok(())
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_frames == 0 {
            return Err(invalid("render block_frames must be at least 1"));
        }
        if self.output_channels == 0 {
            return Err(invalid("render output_channels must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> FxError {
    FxError::InvalidConfig {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.input_gain, 5.0);
        assert_eq!(config.host.sample_rate, 48000);
        assert_eq!(config.host.buffer_frames, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json(r#"{"host": {"sample_rate": 44100}, "input_gain": 2.5}"#)
                .unwrap();
        assert_eq!(config.host.sample_rate, 44100);
        assert_eq!(config.host.buffer_frames, 64);
        assert_eq!(config.input_gain, 2.5);
    }

    #[test]
    fn test_round_trip() {
        let mut config = EngineConfig::default();
        config.host.output_device = Some("Speakers".to_string());
        let parsed = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"host": {"sample_rate": 0}}"#),
            Err(FxError::InvalidSampleRate { .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"input_gain": 12.0}"#),
            Err(FxError::InvalidConfig { .. })
        ));
        assert!(EngineConfig::from_json(r#"{"host": {"ring_capacity": 8}}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"render": {"block_frames": 0}}"#).is_err());
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(FxError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fxchain.json");
        fs::write(&path, r#"{"render": {"output_channels": 1}}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.render.output_channels, 1);
        assert!(EngineConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
