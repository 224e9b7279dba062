//! Engine errors.

use synthgraph_core::ConfigError;
use thiserror::Error;

/// Misuse detected at a buffer-fill call site, or a bad configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// More output channels requested than the output generator produces
    #[error("mismatch in channels sent to fill_buffer_of_floats: requested {requested}, generator provides {available}")]
    ChannelMismatch {
        /// Channels the caller asked for.
        requested: usize,
        /// Channels the output generator produces.
        available: usize,
    },

    /// Destination slice shorter than `num_frames × num_channels`
    #[error("output buffer too small: need {required} samples, got {len}")]
    BufferTooSmall {
        /// Samples the call would write.
        required: usize,
        /// Length of the slice that was passed.
        len: usize,
    },

    /// Invalid synthesis configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}
