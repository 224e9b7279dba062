//! Synthesis configuration: sample rate and block size.
//!
//! Both values are fixed before any graph exists and are injected into every
//! synthesis context at construction. Nothing in the workspace reads them from
//! ambient global state.
//!
//! Configs can be written by hand or loaded from TOML:
//!
//! ```toml
//! sample_rate = 48000.0
//! block_size  = 128
//! ```
//!
//! Missing keys fall back to [`DEFAULT_SAMPLE_RATE`] / [`DEFAULT_BLOCK_SIZE`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sample rate used when nothing else is requested (Hz).
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// Frames computed per generator tick when nothing else is requested.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Largest block size accepted by [`SynthConfig::validate`].
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Process-wide synthesis settings.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Samples per second per channel.
    pub sample_rate: f32,
    /// Frames per internal block.
    pub block_size: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self { sample_rate: DEFAULT_SAMPLE_RATE, block_size: DEFAULT_BLOCK_SIZE }
    }
}

impl SynthConfig {
    /// Build and validate a config in one step.
    pub fn new(sample_rate: f32, block_size: usize) -> Result<Self, ConfigError> {
        let cfg = Self { sample_rate, block_size };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the sample rate is finite and positive and the block size is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockSize { size: self.block_size, max: MAX_BLOCK_SIZE });
        }
        Ok(())
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Seconds covered by `frames` at this sample rate.
    #[inline]
    pub fn frames_to_seconds(&self, frames: u64) -> f64 {
        frames as f64 / f64::from(self.sample_rate)
    }

    /// Duration of one block in seconds.
    #[inline]
    pub fn block_duration(&self) -> f64 {
        self.frames_to_seconds(self.block_size as u64)
    }
}
