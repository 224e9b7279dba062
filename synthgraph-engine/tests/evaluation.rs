//! Evaluation-protocol tests: memoization, cache invalidation, buffer filling.
//!
//! Each test builds a tiny graph out of synthetic generators whose output makes
//! the number and timing of block computations observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use synthgraph_engine::control::control_counter;
use synthgraph_engine::nodes::{adder, fixed, gain};
use synthgraph_engine::{
    BufferFiller, EngineError, Frames, Generator, SynthConfig, Synthesize, SynthesisContext,
};

// ---------------------------------------------------------------------------
// Synthetic generators
// ---------------------------------------------------------------------------

/// Counts its computes and outputs the count.
struct Counting(Arc<AtomicUsize>);

impl Synthesize for Counting {
    type Params = ();

    fn compute_synthesis_block(&mut self, _: &(), out: &mut Frames, _: &SynthesisContext) {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        out.fill(n as f32);
    }
}

/// Outputs the absolute frame index of every sample.
struct FrameIndex(Arc<AtomicUsize>);

impl Synthesize for FrameIndex {
    type Params = ();

    fn compute_synthesis_block(&mut self, _: &(), out: &mut Frames, context: &SynthesisContext) {
        self.0.fetch_add(1, Ordering::SeqCst);
        let start = context.elapsed_frames();
        for (i, frame) in out.frames_iter_mut().enumerate() {
            frame.fill((start + i as u64) as f32);
        }
    }
}

/// Stereo constant: left = 1, right = -1.
struct PlusMinus;

impl Synthesize for PlusMinus {
    type Params = ();
    const STEREO_OUTPUT: bool = true;

    fn compute_synthesis_block(&mut self, _: &(), out: &mut Frames, _: &SynthesisContext) {
        for frame in out.frames_iter_mut() {
            frame[0] = 1.0;
            frame[1] = -1.0;
        }
    }
}

fn counting() -> (Generator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Generator::new(Counting(calls.clone()), ()), calls)
}

fn frame_index() -> (Generator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Generator::new(FrameIndex(calls.clone()), ()), calls)
}

fn cfg(block: usize) -> SynthConfig {
    SynthConfig::new(44_100.0, block).unwrap()
}

/// Context past its first block, so `force_new_output` is clear.
fn settled_context(block: usize) -> SynthesisContext {
    let ctx = SynthesisContext::new(cfg(block));
    ctx.advance();
    ctx
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

#[test]
fn shared_generator_computes_once_per_pass() {
    let (shared, calls) = counting();
    let left = gain(&shared, 1.0);
    let right = gain(&shared, 1.0);
    let mix = adder([Generator::from(left), right.into()]);

    let ctx = settled_context(16);
    let mut out = Frames::mono(16);
    mix.tick(&mut out, &ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // both consumers saw the same block: 1 + 1
    assert!(out.as_slice().iter().all(|&s| s == 2.0));

    ctx.advance();
    mix.tick(&mut out, &ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(out.as_slice().iter().all(|&s| s == 4.0));
}

#[test]
fn repeated_ticks_in_one_pass_hit_the_cache() {
    let (gen, calls) = counting();
    let ctx = settled_context(8);
    let mut a = Frames::mono(8);
    let mut b = Frames::stereo(8);
    gen.tick(&mut a, &ctx);
    gen.tick(&mut b, &ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(b.frame(3), &[1.0, 1.0]);
}

// ---------------------------------------------------------------------------
// Cache invalidation
// ---------------------------------------------------------------------------

#[test]
fn new_frame_index_recomputes() {
    let (gen, calls) = counting();
    let ctx = settled_context(8);
    let mut f = Frames::mono(8);
    gen.tick(&mut f, &ctx);
    ctx.advance();
    gen.tick(&mut f, &ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn forced_context_recomputes_even_at_same_index() {
    let (gen, calls) = counting();
    let ctx = SynthesisContext::new(cfg(8));
    assert!(ctx.force_new_output());
    let mut f = Frames::mono(8);
    gen.tick(&mut f, &ctx);
    gen.tick(&mut f, &ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn different_context_at_same_index_recomputes() {
    let (gen, calls) = counting();
    let a = settled_context(8);
    let b = settled_context(8);
    assert_eq!(a.elapsed_frames(), b.elapsed_frames());

    let mut f = Frames::mono(8);
    gen.tick(&mut f, &a);
    gen.tick(&mut f, &b);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(gen.last_context().ptr_eq(&b));
}

#[test]
fn brand_new_context_always_computes_first_block() {
    let (gen, calls) = frame_index();
    let mut f = Frames::mono(4);

    let first = SynthesisContext::new(cfg(4));
    gen.tick(&mut f, &first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // second fresh context, also at frame 0
    let second = SynthesisContext::new(cfg(4));
    gen.tick(&mut f, &second);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
}

// ---------------------------------------------------------------------------
// BufferFiller
// ---------------------------------------------------------------------------

#[test]
fn mono_pass_through_is_identity() {
    let (gen, _) = frame_index();
    let mut filler = BufferFiller::with_output(cfg(16), gen).unwrap();
    let mut out = vec![0.0; 100];
    filler.fill_buffer_of_floats(&mut out, 100, 1).unwrap();
    for (i, s) in out.iter().enumerate() {
        assert_eq!(*s, i as f32);
    }
}

#[test]
fn stereo_constant_downmixes_to_zero() {
    let mut filler = BufferFiller::with_output(cfg(8), Generator::new(PlusMinus, ())).unwrap();
    assert_eq!(filler.channels(), 2);
    let mut out = vec![5.0; 37];
    filler.fill_buffer_of_floats(&mut out, 37, 1).unwrap();
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn stereo_native_width_interleaves() {
    let mut filler = BufferFiller::with_output(cfg(8), Generator::new(PlusMinus, ())).unwrap();
    let mut out = vec![0.0; 20];
    filler.fill_buffer_of_floats(&mut out, 10, 2).unwrap();
    for frame in out.chunks_exact(2) {
        assert_eq!(frame, &[1.0, -1.0]);
    }
}

#[test]
fn ring_buffer_wraps_every_block() {
    let (gen, calls) = frame_index();
    let mut filler = BufferFiller::with_output(cfg(4), gen).unwrap();
    let mut out = vec![0.0; 10];
    filler.fill_buffer_of_floats(&mut out, 10, 1).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3, "ticks at cursor 0, 4, 8");
    assert_eq!(filler.context().elapsed_frames(), 12);
    assert_eq!(out, (0..10).map(|i| i as f32).collect::<Vec<_>>());

    // the rest of the third block is served before the next tick
    let mut more = vec![0.0; 2];
    filler.fill_buffer_of_floats(&mut more, 2, 1).unwrap();
    assert_eq!(more, vec![10.0, 11.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn channel_overflow_is_rejected_without_writes() {
    let (gen, calls) = counting();
    let mut filler = BufferFiller::with_output(cfg(4), gen).unwrap();
    let mut out = vec![3.0; 8];
    let err = filler.fill_buffer_of_floats(&mut out, 4, 2).unwrap_err();
    assert!(matches!(err, EngineError::ChannelMismatch { requested: 2, available: 1 }));
    assert_eq!(out, vec![3.0; 8]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(filler.context().elapsed_frames(), 0);
}

#[test]
fn auxiliary_control_gen_ticks_once_per_block() {
    let counter = control_counter();
    let mut filler = BufferFiller::with_output(cfg(8), fixed(0.0)).unwrap();
    filler.add_control_gen_to_tick(&counter);

    let mut frames = Frames::mono(8);
    for _ in 0..5 {
        filler.tick(&mut frames);
    }
    assert_eq!(counter.count(), 5);

    let mut out = vec![0.0; 24];
    filler.fill_buffer_of_floats(&mut out, 24, 1).unwrap();
    assert_eq!(counter.count(), 8);
}

#[test]
fn fillers_sharing_a_clock_share_computation() {
    let (shared, calls) = counting();
    let a = BufferFiller::with_output(cfg(8), gain(&shared, 1.0)).unwrap();
    let b = BufferFiller::with_output(cfg(8), gain(&shared, -1.0)).unwrap();
    let clock = settled_context(8);

    let mut fa = Frames::mono(8);
    let mut fb = Frames::mono(8);
    for pass in 1..=3 {
        a.tick_with_context(&mut fa, &clock);
        b.tick_with_context(&mut fb, &clock);
        clock.advance();
        assert_eq!(calls.load(Ordering::SeqCst), pass);
        assert_eq!(fa[0], -fb[0]);
    }
    // the fillers' own contexts never moved
    assert_eq!(a.context().elapsed_frames(), 0);
    assert_eq!(b.context().elapsed_frames(), 0);
}

// ---------------------------------------------------------------------------
// Control-thread parameter writes
// ---------------------------------------------------------------------------

#[test]
fn control_thread_writes_land_between_blocks() {
    let level = fixed(0.0);
    let mut filler = BufferFiller::with_output(cfg(32), &level).unwrap();
    let mut out = vec![0.0; 32];
    filler.fill_buffer_of_floats(&mut out, 32, 1).unwrap();

    let writer = {
        let level = level.clone();
        std::thread::spawn(move || {
            for i in 0..=100 {
                level.set(|v| v.set(i as f32));
            }
        })
    };
    for _ in 0..50 {
        filler.fill_buffer_of_floats(&mut out, 32, 1).unwrap();
        assert!(out.iter().all(|s| (0.0..=100.0).contains(s)));
    }
    writer.join().unwrap();

    filler.fill_buffer_of_floats(&mut out, 32, 1).unwrap();
    assert!(out.iter().all(|&s| s == 100.0));
}

#[test]
fn unwired_generator_is_dropped_with_its_last_handle() {
    let (old, _) = counting();
    let stage = gain(&old, 1.0);
    assert_eq!(old.handle_count(), 2);
    stage.set(|p| p.input.set(fixed(1.0)));
    assert_eq!(old.handle_count(), 1);
}
