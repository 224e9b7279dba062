//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or loading a [`SynthConfig`](crate::config::SynthConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sample rate is zero, negative or not finite
    #[error("invalid sample rate: {0} (must be finite and > 0)")]
    InvalidSampleRate(f32),

    /// Block size is zero or above the supported maximum
    #[error("invalid block size: {size} (must be in 1..={max})")]
    InvalidBlockSize {
        /// Requested block size.
        size: usize,
        /// Largest accepted block size.
        max: usize,
    },

    /// Config file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_messages() {
        assert_eq!(
            ConfigError::InvalidSampleRate(-1.0).to_string(),
            "invalid sample rate: -1 (must be finite and > 0)"
        );
        assert_eq!(
            ConfigError::InvalidBlockSize { size: 0, max: 4096 }.to_string(),
            "invalid block size: 0 (must be in 1..=4096)"
        );
    }

    #[test]
    fn read_file_exposes_source() {
        let err = ConfigError::ReadFile {
            path: PathBuf::from("/x.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock"),
        };
        assert!(err.source().is_some());
        assert!(ConfigError::InvalidSampleRate(0.0).source().is_none());
    }
}
