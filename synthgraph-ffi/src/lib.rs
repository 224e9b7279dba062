//! C ABI wrapper for the SynthGraph buffer filler.
//!
//! Exposes a small set of functions to create/destroy a graph built from one
//! of the prebuilt patches, pull interleaved f32 samples from it, and turn its
//! output level.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `SynthGraph` (heap-allocated; destroy it with `synthgraph_destroy`).
//! - `synthgraph_fill_buffer_of_floats` returns 0 on success, -1 for an invalid
//!   argument, -2 when more channels are requested than the patch has, -3 otherwise.
//!
//! Threading
//! - Fill from one audio thread.
//! - `synthgraph_set_level` and `synthgraph_elapsed_time` may be called from any
//!   thread while a fill is running; they only touch shared handles.

use std::ffi::{c_char, CStr};
use std::sync::{Mutex, PoisonError};

use synthgraph_core::SynthConfig;
use synthgraph_engine::{BufferFiller, EngineError, Patch, PatchKind, SynthesisContext};

pub const SYNTHGRAPH_OK: i32 = 0;
pub const SYNTHGRAPH_ERR_INVALID_ARGUMENT: i32 = -1;
pub const SYNTHGRAPH_ERR_CHANNEL_MISMATCH: i32 = -2;
pub const SYNTHGRAPH_ERR_OTHER: i32 = -3;

/// Opaque graph handed to C.
///
/// The filler sits behind a mutex only the fill path takes, so control-thread
/// calls never contend with it.
pub struct SynthGraph {
    filler: Mutex<BufferFiller>,
    patch: Patch,
    context: SynthesisContext,
    channels: usize,
}

impl SynthGraph {
    fn new(config: SynthConfig, kind: PatchKind) -> Result<Self, EngineError> {
        let patch = Patch::build(kind, 1.0);
        let mut filler = BufferFiller::with_output(config, patch.output())?;
        filler.add_control_gen_to_tick(patch.block_counter());
        Ok(Self {
            context: filler.context().clone(),
            channels: filler.channels(),
            filler: Mutex::new(filler),
            patch,
        })
    }
}

// --- Creation / destruction -------------------------------------------------------

/// Create a graph running `patch` (NUL-terminated name; null selects "drone").
/// Returns null on an unknown patch name or an invalid configuration.
///
/// # Safety
/// `patch` must be null or point to a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_create(
    sample_rate: f32,
    block_size: u32,
    patch: *const c_char,
) -> *mut SynthGraph {
    let kind = if patch.is_null() {
        PatchKind::default()
    } else {
        let name = match CStr::from_ptr(patch).to_str() {
            Ok(name) => name,
            Err(err) => {
                tracing::error!(%err, "patch name is not UTF-8");
                return std::ptr::null_mut();
            }
        };
        match name.parse() {
            Ok(kind) => kind,
            Err(err) => {
                tracing::error!(%err, "unknown patch");
                return std::ptr::null_mut();
            }
        }
    };

    let config = SynthConfig { sample_rate, block_size: block_size as usize };
    match SynthGraph::new(config, kind) {
        Ok(graph) => Box::into_raw(Box::new(graph)),
        Err(err) => {
            tracing::error!(%err, "synthgraph_create failed");
            std::ptr::null_mut()
        }
    }
}

/// Destroy a graph previously returned by `synthgraph_create`. Null is ignored.
///
/// # Safety
/// `graph` must be null or a pointer from `synthgraph_create` not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_destroy(graph: *mut SynthGraph) {
    if !graph.is_null() {
        drop(Box::from_raw(graph));
    }
}

// --- Rendering -------------------------------------------------------------------

/// Fill `frames × channels` interleaved samples of `out`.
///
/// # Safety
/// `graph` must come from `synthgraph_create`; `out` must be valid for
/// `frames * channels` writes.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_fill_buffer_of_floats(
    graph: *mut SynthGraph,
    out: *mut f32,
    frames: u32,
    channels: u32,
) -> i32 {
    if graph.is_null() {
        return SYNTHGRAPH_ERR_INVALID_ARGUMENT;
    }
    let (frames, channels) = (frames as usize, channels as usize);
    let Some(len) = frames.checked_mul(channels) else {
        return SYNTHGRAPH_ERR_INVALID_ARGUMENT;
    };
    if len == 0 {
        return SYNTHGRAPH_OK;
    }
    if out.is_null() {
        return SYNTHGRAPH_ERR_INVALID_ARGUMENT;
    }

    let graph = &*graph;
    let out = std::slice::from_raw_parts_mut(out, len);
    let mut filler = graph.filler.lock().unwrap_or_else(PoisonError::into_inner);
    match filler.fill_buffer_of_floats(out, frames, channels) {
        Ok(()) => SYNTHGRAPH_OK,
        Err(EngineError::ChannelMismatch { .. }) => SYNTHGRAPH_ERR_CHANNEL_MISMATCH,
        Err(_) => SYNTHGRAPH_ERR_OTHER,
    }
}

// --- Queries / control ------------------------------------------------------------

/// Native channel count of the patch (1 or 2); 0 for null.
///
/// # Safety
/// `graph` must be null or a live pointer from `synthgraph_create`.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_channels(graph: *const SynthGraph) -> u32 {
    if graph.is_null() {
        return 0;
    }
    (*graph).channels as u32
}

/// Set the output level (linear, clamped to [0, 4]). Non-finite values are ignored.
///
/// # Safety
/// `graph` must be null or a live pointer from `synthgraph_create`.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_set_level(graph: *const SynthGraph, level: f32) {
    if graph.is_null() {
        return;
    }
    (*graph).patch.set_level(level);
}

/// Seconds rendered so far; 0 for null.
///
/// # Safety
/// `graph` must be null or a live pointer from `synthgraph_create`.
#[no_mangle]
pub unsafe extern "C" fn synthgraph_elapsed_time(graph: *const SynthGraph) -> f64 {
    if graph.is_null() {
        return 0.0;
    }
    (*graph).context.elapsed_time()
}
