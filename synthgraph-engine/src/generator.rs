//! Generators: the memoized block-computation core and its shared handle.
//!
//! A concrete generator implements [`Synthesize`], the block-computation hook.
//! [`TypedGenerator`] allocates it once inside a cache-aware core and hands out
//! [`Generator`] handles to it. Handles are cheap clones of one `Arc`: wiring the
//! same generator into several consumers never duplicates its state or its work.
//!
//! Tick protocol (per core):
//! 1. recompute if the context forces it, if the cached block belongs to another
//!    frame index, or if the context is not the one seen last
//! 2. otherwise reuse the cached block
//! 3. always copy the block into the caller's frames
//!
//! Parameters live in `S::Params`, outside the cache lock. Control-thread writers
//! go through [`TypedGenerator::set`], which holds the last-seen context's mutex;
//! the audio thread reads them without locking.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use synthgraph_core::Frames;

use crate::context::{BlockStamp, SeenContext, SynthesisContext};

/// Block-computation hook implemented by every concrete generator.
pub trait Synthesize: Send + 'static {
    /// Values shared with control threads (atomics, [`Input`] slots, or `()`).
    type Params: Send + Sync + 'static;

    /// Channel count of the cached block: stereo (2) or mono (1).
    const STEREO_OUTPUT: bool = false;

    /// Fill every sample of `out` for the block at `context.elapsed_frames()`.
    ///
    /// Inputs must be ticked with this same `context`.
    fn compute_synthesis_block(&mut self, params: &Self::Params, out: &mut Frames, context: &SynthesisContext);
}

// --------------------------------- Core ------------------------------------------

struct BlockCache<S> {
    synth: S,
    outputs: Frames,
    stamp: BlockStamp,
}

struct GeneratorCore<S: Synthesize> {
    params: S::Params,
    cache: Mutex<BlockCache<S>>,
    context: SeenContext,
    stereo: AtomicBool,
}

impl<S: Synthesize> GeneratorCore<S> {
    fn new(synth: S, params: S::Params) -> Self {
        let channels = if S::STEREO_OUTPUT { 2 } else { 1 };
        Self {
            params,
            cache: Mutex::new(BlockCache {
                synth,
                outputs: Frames::new(0, channels),
                stamp: BlockStamp::default(),
            }),
            context: SeenContext::detached(),
            stereo: AtomicBool::new(S::STEREO_OUTPUT),
        }
    }
}

/// Object-safe face of a core, so handles can erase the concrete type.
trait GeneratorNode: Send + Sync {
    fn tick(&self, frames: &mut Frames, context: &SynthesisContext);
    fn is_stereo_output(&self) -> bool;
    fn set_is_stereo_output(&self, stereo: bool);
    fn seen_context(&self) -> &SeenContext;
}

impl<S: Synthesize> GeneratorNode for GeneratorCore<S> {
    fn tick(&self, frames: &mut Frames, context: &SynthesisContext) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.stamp.is_stale(context, &self.context) {
            self.context.remember(context);
            let BlockCache { synth, outputs, stamp } = &mut *cache;
            if outputs.frames() != context.block_size() {
                let channels = outputs.channels();
                outputs.resize(context.block_size(), channels);
            }
            synth.compute_synthesis_block(&self.params, outputs, context);
            stamp.mark(context);
        }
        frames.copy_from(&cache.outputs);
    }

    #[inline]
    fn is_stereo_output(&self) -> bool {
        self.stereo.load(Ordering::Relaxed)
    }

    fn set_is_stereo_output(&self, stereo: bool) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.stamp.is_valid() && stereo != self.is_stereo_output() {
            tracing::warn!(stereo, "channel count changed after the generator was ticked; cache dropped");
        }
        self.stereo.store(stereo, Ordering::Relaxed);
        let frames = cache.outputs.frames();
        cache.outputs.resize(frames, if stereo { 2 } else { 1 });
        cache.stamp.invalidate();
    }

    fn seen_context(&self) -> &SeenContext {
        &self.context
    }
}

// --------------------------------- Handle ----------------------------------------

/// Shared, type-erased handle to one generator core.
///
/// `Clone` aliases the same core; the core is dropped with its last handle.
#[derive(Clone)]
pub struct Generator {
    node: Arc<dyn GeneratorNode>,
}

impl Generator {
    /// Allocate a core for `synth` and return an erased handle to it.
    pub fn new<S: Synthesize>(synth: S, params: S::Params) -> Self {
        TypedGenerator::new(synth, params).into()
    }

    #[inline] pub fn is_stereo_output(&self) -> bool { self.node.is_stereo_output() }
    #[inline] pub fn channels(&self) -> usize { if self.is_stereo_output() { 2 } else { 1 } }

    /// Copy this generator's block for `context` into `frames`, computing it if needed.
    #[inline]
    pub fn tick(&self, frames: &mut Frames, context: &SynthesisContext) {
        self.node.tick(frames, context);
    }

    /// Fix the channel count. Meant to be called before the first tick.
    pub fn set_is_stereo_output(&self, stereo: bool) {
        self.node.set_is_stereo_output(stereo);
    }

    /// The context this generator was last ticked with (a detached one before any tick).
    pub fn last_context(&self) -> SynthesisContext {
        self.node.seen_context().get()
    }

    /// Run `f` while holding the last-seen context's mutex.
    pub fn with_context_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        self.node.seen_context().with_lock(f)
    }

    /// True if both handles refer to the same core.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Strong references to this core. A live [`TypedGenerator`] accounts for two.
    #[inline]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }
}

impl Default for Generator {
    /// Silent mono pass-through.
    fn default() -> Self {
        Generator::new(PassThrough, ())
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("channels", &self.channels())
            .field("handles", &self.handle_count())
            .finish()
    }
}

// --------------------------------- Typed factory ---------------------------------

/// Owning factory for a concrete generator kind.
///
/// Derefs to [`Generator`], so it can be ticked and wired like any handle, and
/// additionally exposes the kind's parameters.
pub struct TypedGenerator<S: Synthesize> {
    core: Arc<GeneratorCore<S>>,
    handle: Generator,
}

impl<S: Synthesize> TypedGenerator<S> {
    pub fn new(synth: S, params: S::Params) -> Self {
        let core = Arc::new(GeneratorCore::new(synth, params));
        let node: Arc<dyn GeneratorNode> = core.clone();
        let handle = Generator { node };
        Self { core, handle }
    }

    /// Read access to the parameters (audio-thread style, unlocked).
    #[inline]
    pub fn params(&self) -> &S::Params {
        &self.core.params
    }

    /// Mutate parameters while holding the last-seen context's mutex.
    pub fn set(&self, f: impl FnOnce(&S::Params)) -> &Self {
        let params = &self.core.params;
        self.handle.with_context_lock(|| f(params));
        self
    }

    /// An erased handle to the same core.
    #[inline]
    pub fn generator(&self) -> Generator {
        self.handle.clone()
    }
}

impl<S: Synthesize> Clone for TypedGenerator<S> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core), handle: self.handle.clone() }
    }
}

impl<S: Synthesize> Deref for TypedGenerator<S> {
    type Target = Generator;
    #[inline] fn deref(&self) -> &Generator { &self.handle }
}

impl<S: Synthesize> From<TypedGenerator<S>> for Generator {
    fn from(t: TypedGenerator<S>) -> Self {
        t.handle
    }
}

impl<S: Synthesize> From<&TypedGenerator<S>> for Generator {
    fn from(t: &TypedGenerator<S>) -> Self {
        t.handle.clone()
    }
}

impl From<&Generator> for Generator {
    fn from(g: &Generator) -> Self {
        g.clone()
    }
}

impl<S: Synthesize> fmt::Debug for TypedGenerator<S>
where
    S::Params: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedGenerator")
            .field("kind", &std::any::type_name::<S>())
            .field("params", self.params())
            .field("channels", &self.channels())
            .finish()
    }
}

// --------------------------------- Inputs ----------------------------------------

/// Re-wirable slot holding the handle of an upstream generator.
///
/// Loading is lock-free, so the audio thread can tick through an `Input` while a
/// control thread swaps it. The replaced handle is dropped once no tick holds it.
pub struct Input {
    slot: ArcSwap<Generator>,
}

impl Input {
    pub fn new(gen: impl Into<Generator>) -> Self {
        Self { slot: ArcSwap::from_pointee(gen.into()) }
    }

    /// Tick the wired generator into `frames`.
    #[inline]
    pub fn tick(&self, frames: &mut Frames, context: &SynthesisContext) {
        self.slot.load().tick(frames, context);
    }

    /// Handle currently wired.
    pub fn get(&self) -> Generator {
        Generator::clone(&self.slot.load())
    }

    /// Wire a different generator.
    pub fn set(&self, gen: impl Into<Generator>) {
        self.slot.store(Arc::new(gen.into()));
    }

    #[inline]
    pub fn is_stereo_output(&self) -> bool {
        self.slot.load().is_stereo_output()
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new(Generator::default())
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Input").field(&*self.slot.load()).finish()
    }
}

// --------------------------------- Pass-through ----------------------------------

/// Generator that never writes its block: outputs silence.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassThrough;

impl Synthesize for PassThrough {
    type Params = ();
    fn compute_synthesis_block(&mut self, _: &(), _: &mut Frames, _: &SynthesisContext) {}
}
