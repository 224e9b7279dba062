//! SynthGraph Core — plain data shared by every layer of the block engine.
//!
//! Modules
//! - [`config`] : `SynthConfig` (sample rate, block size), TOML loading
//! - [`frames`] : `Frames`, the interleaved block buffer passed between generators
//! - [`param`]  : `Param`, a lock-free `f32` for control-thread parameter writes
//! - [`error`]  : `ConfigError`
//!
//! Design
//! - No engine logic here; the evaluation protocol lives in `synthgraph-engine`
//! - Everything is `Send + Sync` so graphs can be built on one thread and run on another

pub mod config;
pub mod error;
pub mod frames;
pub mod param;

pub use config::{SynthConfig, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE};
pub use error::ConfigError;
pub use frames::Frames;
pub use param::Param;

/// Commonly used types for convenience:
pub mod prelude {
    pub use crate::config::SynthConfig;
    pub use crate::error::ConfigError;
    pub use crate::frames::Frames;
    pub use crate::param::Param;
}
