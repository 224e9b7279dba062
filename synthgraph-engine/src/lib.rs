//! SynthGraph Engine — block-based evaluation of generator graphs.
//!
//! Crate layout:
//! - [`context`]       : `SynthesisContext`, the shared frame clock + mutex of one pass
//! - [`generator`]     : `Synthesize` hook, memoized core, `Generator` handle, `TypedGenerator` factory, `Input`
//! - [`control`]       : control-rate counterpart (`ControlGenerator`)
//! - [`buffer_filler`] : `BufferFiller`, the root driver the host pulls samples from
//! - [`nodes`]         : a handful of concrete generators
//! - [`patches`]       : prebuilt graphs for the CLI / C ABI
//!
//! A generator reached through several paths of the graph computes its block
//! once per pass: every consumer ticks it with the same context, and the
//! context's frame counter only moves after the pass is done.
//!
//! ```
//! use synthgraph_core::SynthConfig;
//! use synthgraph_engine::{nodes, BufferFiller};
//!
//! let osc = nodes::sine(440.0);
//! let out = nodes::panner(nodes::gain(&osc, 0.5), 0.0);
//! let mut filler = BufferFiller::with_output(SynthConfig::default(), out).unwrap();
//!
//! let mut host = vec![0.0f32; 2 * 512];
//! filler.fill_buffer_of_floats(&mut host, 512, 2).unwrap();
//! ```

pub mod buffer_filler;
pub mod context;
pub mod control;
pub mod error;
pub mod generator;
pub mod nodes;
pub mod patches;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use buffer_filler::{BufferFiller, MismatchPolicy};
pub use context::SynthesisContext;
pub use control::{ControlGenerator, ControlOutput, ControlSynthesize, TypedControlGenerator};
pub use error::EngineError;
pub use generator::{Generator, Input, PassThrough, Synthesize, TypedGenerator};
pub use patches::{Patch, PatchKind};
pub use synthgraph_core::{Frames, Param, SynthConfig};
