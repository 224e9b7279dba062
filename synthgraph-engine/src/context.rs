//! Shared synthesis context.
//!
//! One `SynthesisContext` is threaded through a whole evaluation pass: the root
//! driver ticks its output generator with it, and every generator ticks its own
//! inputs with the *same* context. Because every generator in the pass sees the
//! same `elapsed_frames`, a generator reached through several paths can tell it
//! was already computed for this block and hand out its cached output instead.
//!
//! Rules
//! - `advance()` once per completed top-level pass, after every tick of that pass
//! - cloning a context shares it; all clones see the same clock and mutex
//! - the mutex serialises control-thread parameter writers; the audio thread never takes it

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use synthgraph_core::SynthConfig;

pub(crate) struct ContextShared {
    config: SynthConfig,
    elapsed_frames: AtomicU64,
    force_new_output: AtomicBool,
    mutex: Mutex<()>,
}

/// Clock + lock shared by every generator reached during one evaluation pass.
#[derive(Clone)]
pub struct SynthesisContext {
    shared: Arc<ContextShared>,
}

impl SynthesisContext {
    /// Fresh context at frame 0 with `force_new_output` set.
    pub fn new(config: SynthConfig) -> Self {
        Self {
            shared: Arc::new(ContextShared {
                config,
                elapsed_frames: AtomicU64::new(0),
                force_new_output: AtomicBool::new(true),
                mutex: Mutex::new(()),
            }),
        }
    }

    #[inline] pub fn config(&self) -> &SynthConfig { &self.shared.config }
    #[inline] pub fn block_size(&self) -> usize { self.shared.config.block_size }
    #[inline] pub fn sample_rate(&self) -> f32 { self.shared.config.sample_rate }

    /// Frames advanced since construction.
    #[inline]
    pub fn elapsed_frames(&self) -> u64 {
        self.shared.elapsed_frames.load(Ordering::Acquire)
    }

    /// `elapsed_frames / sample_rate`, in seconds.
    #[inline]
    pub fn elapsed_time(&self) -> f64 {
        self.shared.config.frames_to_seconds(self.elapsed_frames())
    }

    /// When true every generator recomputes regardless of its cache.
    #[inline]
    pub fn force_new_output(&self) -> bool {
        self.shared.force_new_output.load(Ordering::Acquire)
    }

    /// Move the clock forward one block and clear `force_new_output`.
    pub fn advance(&self) {
        self.shared
            .elapsed_frames
            .fetch_add(self.shared.config.block_size as u64, Ordering::AcqRel);
        self.shared.force_new_output.store(false, Ordering::Release);
    }

    /// Acquire the context mutex for the lifetime of the guard.
    ///
    /// The mutex protects no data of its own, so a poisoned lock is simply reused.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.shared.mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if both values refer to the same context.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Default for SynthesisContext {
    fn default() -> Self {
        Self::new(SynthConfig::default())
    }
}

impl fmt::Debug for SynthesisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisContext")
            .field("elapsed_frames", &self.elapsed_frames())
            .field("force_new_output", &self.force_new_output())
            .field("config", self.config())
            .finish()
    }
}

// --------------------------------- Cache bookkeeping -----------------------------

/// The context a generator was last ticked with.
///
/// Starts out as a private detached context, so `with_lock` before the first
/// tick never waits on anyone else.
pub(crate) struct SeenContext(ArcSwap<ContextShared>);

impl SeenContext {
    pub(crate) fn detached() -> Self {
        Self(ArcSwap::new(SynthesisContext::default().shared))
    }

    #[inline]
    pub(crate) fn is(&self, context: &SynthesisContext) -> bool {
        Arc::ptr_eq(&self.0.load(), &context.shared)
    }

    pub(crate) fn remember(&self, context: &SynthesisContext) {
        if !self.is(context) {
            self.0.store(Arc::clone(&context.shared));
        }
    }

    pub(crate) fn get(&self) -> SynthesisContext {
        SynthesisContext { shared: self.0.load_full() }
    }

    /// Run `f` while holding the last-seen context's mutex.
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let context = self.get();
        let _guard = context.lock();
        f()
    }
}

/// Frame index of the block currently held in a generator's cache.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct BlockStamp {
    last_frame_index: Option<u64>,
}

impl BlockStamp {
    /// True when the cache cannot serve this tick.
    #[inline]
    pub(crate) fn is_stale(&self, context: &SynthesisContext, seen: &SeenContext) -> bool {
        context.force_new_output()
            || self.last_frame_index != Some(context.elapsed_frames())
            || !seen.is(context)
    }

    #[inline] pub(crate) fn mark(&mut self, context: &SynthesisContext) { self.last_frame_index = Some(context.elapsed_frames()); }
    #[inline] pub(crate) fn invalidate(&mut self) { self.last_frame_index = None; }
    #[inline] pub(crate) fn is_valid(&self) -> bool { self.last_frame_index.is_some() }
}
