//! Control-rate generators.
//!
//! A control generator produces one [`ControlOutput`] per block instead of a
//! block of samples. It follows the same memoization rule as audio generators,
//! so a control node read by several consumers (or registered with a
//! [`BufferFiller`](crate::BufferFiller) for side-effect ticking) advances once
//! per block.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use synthgraph_core::Param;

use crate::context::{BlockStamp, SeenContext, SynthesisContext};

/// Value of a control generator for one block.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ControlOutput {
    pub value: f32,
    /// Set on blocks where the generator fired or its value changed.
    pub triggered: bool,
}

/// Per-block computation hook for control generators.
pub trait ControlSynthesize: Send + 'static {
    type Params: Send + Sync + 'static;

    fn compute_output(&mut self, params: &Self::Params, context: &SynthesisContext) -> ControlOutput;
}

struct ControlState<C> {
    synth: C,
    output: ControlOutput,
    stamp: BlockStamp,
}

struct ControlCore<C: ControlSynthesize> {
    params: C::Params,
    state: Mutex<ControlState<C>>,
    context: SeenContext,
}

trait ControlNode: Send + Sync {
    fn tick(&self, context: &SynthesisContext) -> ControlOutput;
    fn last_output(&self) -> ControlOutput;
    fn seen_context(&self) -> &SeenContext;
}

impl<C: ControlSynthesize> ControlNode for ControlCore<C> {
    fn tick(&self, context: &SynthesisContext) -> ControlOutput {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.stamp.is_stale(context, &self.context) {
            self.context.remember(context);
            state.output = state.synth.compute_output(&self.params, context);
            state.stamp.mark(context);
        }
        state.output
    }

    fn last_output(&self) -> ControlOutput {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).output
    }

    fn seen_context(&self) -> &SeenContext {
        &self.context
    }
}

/// Shared, type-erased handle to one control generator.
#[derive(Clone)]
pub struct ControlGenerator {
    node: Arc<dyn ControlNode>,
}

impl ControlGenerator {
    pub fn new<C: ControlSynthesize>(synth: C, params: C::Params) -> Self {
        TypedControlGenerator::new(synth, params).into()
    }

    /// Output for the block at `context`, computing it if needed.
    #[inline]
    pub fn tick(&self, context: &SynthesisContext) -> ControlOutput {
        self.node.tick(context)
    }

    /// Output of the most recent tick (default before any tick).
    pub fn last_output(&self) -> ControlOutput {
        self.node.last_output()
    }

    /// Run `f` while holding the last-seen context's mutex.
    pub fn with_context_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        self.node.seen_context().with_lock(f)
    }

    /// The context this generator was last ticked with (a detached one before any tick).
    pub fn last_context(&self) -> SynthesisContext {
        self.node.seen_context().get()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for ControlGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlGenerator").field("last_output", &self.last_output()).finish()
    }
}

/// Owning factory for a concrete control generator kind; derefs to [`ControlGenerator`].
pub struct TypedControlGenerator<C: ControlSynthesize> {
    core: Arc<ControlCore<C>>,
    handle: ControlGenerator,
}

impl<C: ControlSynthesize> TypedControlGenerator<C> {
    pub fn new(synth: C, params: C::Params) -> Self {
        let core = Arc::new(ControlCore {
            params,
            state: Mutex::new(ControlState {
                synth,
                output: ControlOutput::default(),
                stamp: BlockStamp::default(),
            }),
            context: SeenContext::detached(),
        });
        let node: Arc<dyn ControlNode> = core.clone();
        Self { core, handle: ControlGenerator { node } }
    }

    #[inline]
    pub fn params(&self) -> &C::Params {
        &self.core.params
    }

    /// Mutate parameters while holding the last-seen context's mutex.
    pub fn set(&self, f: impl FnOnce(&C::Params)) -> &Self {
        let params = &self.core.params;
        self.handle.with_context_lock(|| f(params));
        self
    }

    #[inline]
    pub fn generator(&self) -> ControlGenerator {
        self.handle.clone()
    }
}

impl<C: ControlSynthesize> Clone for TypedControlGenerator<C> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core), handle: self.handle.clone() }
    }
}

impl<C: ControlSynthesize> Deref for TypedControlGenerator<C> {
    type Target = ControlGenerator;
    #[inline] fn deref(&self) -> &ControlGenerator { &self.handle }
}

impl<C: ControlSynthesize> From<TypedControlGenerator<C>> for ControlGenerator {
    fn from(t: TypedControlGenerator<C>) -> Self {
        t.handle
    }
}

impl<C: ControlSynthesize> From<&TypedControlGenerator<C>> for ControlGenerator {
    fn from(t: &TypedControlGenerator<C>) -> Self {
        t.handle.clone()
    }
}

// --------------------------------- Kinds -----------------------------------------

/// Constant control value; `triggered` on the first block after it changes.
#[derive(Clone, Debug, Default)]
pub struct ControlValue {
    last: Option<f32>,
}

impl ControlSynthesize for ControlValue {
    type Params = Param;

    fn compute_output(&mut self, value: &Param, _: &SynthesisContext) -> ControlOutput {
        let v = value.get();
        let triggered = self.last != Some(v);
        self.last = Some(v);
        ControlOutput { value: v, triggered }
    }
}

/// Control value generator starting at `value`.
pub fn control_value(value: f32) -> TypedControlGenerator<ControlValue> {
    TypedControlGenerator::new(ControlValue::default(), Param::new(value))
}

/// Counts the blocks it was computed for; readable from any thread.
#[derive(Debug, Default)]
pub struct ControlCounter;

impl ControlSynthesize for ControlCounter {
    type Params = AtomicU64;

    fn compute_output(&mut self, count: &AtomicU64, _: &SynthesisContext) -> ControlOutput {
        let n = count.fetch_add(1, Ordering::AcqRel) + 1;
        ControlOutput { value: n as f32, triggered: true }
    }
}

/// Block counter starting at zero.
pub fn control_counter() -> TypedControlGenerator<ControlCounter> {
    TypedControlGenerator::new(ControlCounter, AtomicU64::new(0))
}

impl TypedControlGenerator<ControlCounter> {
    /// Blocks counted so far.
    pub fn count(&self) -> u64 {
        self.params().load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use synthgraph_core::SynthConfig;

    fn ctx() -> SynthesisContext {
        SynthesisContext::new(SynthConfig::new(48_000.0, 32).unwrap())
    }

    #[test]
    fn counter_memoizes_within_a_block() {
        let counter = control_counter();
        let ctx = ctx();
        ctx.advance();
        counter.tick(&ctx);
        counter.tick(&ctx);
        assert_eq!(counter.count(), 1);
        ctx.advance();
        let out = counter.tick(&ctx);
        assert_eq!(counter.count(), 2);
        assert_eq!(out, ControlOutput { value: 2.0, triggered: true });
        assert_eq!(counter.last_output(), out);
    }

    #[test]
    fn value_triggers_only_on_change() {
        let v = control_value(0.5);
        let ctx = ctx();
        assert!(v.tick(&ctx).triggered);
        ctx.advance();
        assert!(!v.tick(&ctx).triggered);
        v.set(|p| p.set(0.75));
        ctx.advance();
        let out = v.tick(&ctx);
        assert!(out.triggered);
        assert_eq!(out.value, 0.75);
    }

    #[test]
    fn set_waits_for_the_ticking_context() {
        let v = control_value(0.0);
        let ctx = ctx();
        v.tick(&ctx);
        assert!(v.last_context().ptr_eq(&ctx));

        let guard = ctx.lock();
        let (done_tx, done_rx) = mpsc::channel();
        let writer = {
            let v = v.clone();
            thread::spawn(move || {
                v.set(|p| p.set(1.0));
                done_tx.send(()).unwrap();
            })
        };
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(v.params().get(), 0.0);

        drop(guard);
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        writer.join().unwrap();
        assert_eq!(v.params().get(), 1.0);
    }

    #[test]
    fn erased_handle_aliases() {
        let typed = control_counter();
        let a: ControlGenerator = (&typed).into();
        let b = typed.generator();
        assert!(a.ptr_eq(&b));
        let ctx = ctx();
        ctx.advance();
        a.tick(&ctx);
        b.tick(&ctx);
        assert_eq!(typed.count(), 1);
    }
}
