//! Root driver: turns fixed-size graph blocks into arbitrarily sized host buffers.
//!
//! `BufferFiller` owns a [`SynthesisContext`], the output generator handle and
//! one internal block. The host pulls interleaved samples with
//! [`BufferFiller::fill_buffer_of_floats`]; whenever the read cursor wraps back
//! to the start of the block, the whole graph is ticked once and the context
//! advances by one block.
//!
//! Channel conversion when pulling fewer channels than the generator produces:
//! each destination sample averages `channels - requested + 1` consecutive
//! source samples. Equal counts pass samples through untouched; stereo pulled
//! as mono averages left and right.
//!
//! Design goals
//! - No allocation on the fill path once the block is sized
//! - Misuse is reported at the call that detects it; nothing is written on rejection

use synthgraph_core::{Frames, SynthConfig};

use crate::context::SynthesisContext;
use crate::control::ControlGenerator;
use crate::error::EngineError;
use crate::generator::Generator;

/// What a fill does when asked for more channels than the generator has.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Log an error, write nothing, return `Err(ChannelMismatch)`.
    #[default]
    Reject,
    /// Log a warning, zero the requested region, return `Ok`.
    Silence,
}

/// Pulls blocks from an output generator into host buffers.
pub struct BufferFiller {
    context: SynthesisContext,
    output_gen: Generator,
    output_frames: Frames,
    read_position: usize,
    control_gens: Vec<ControlGenerator>,
    policy: MismatchPolicy,
}

impl BufferFiller {
    /// Filler with a silent mono output and its own context.
    pub fn new(config: SynthConfig) -> Result<Self, EngineError> {
        Self::with_output(config, Generator::default())
    }

    /// Filler driving `output` with its own context.
    pub fn with_output(config: SynthConfig, output: impl Into<Generator>) -> Result<Self, EngineError> {
        config.validate()?;
        let output_gen = output.into();
        tracing::debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            channels = output_gen.channels(),
            "buffer filler created"
        );
        Ok(Self {
            output_frames: Frames::new(config.block_size, output_gen.channels()),
            context: SynthesisContext::new(config),
            output_gen,
            read_position: 0,
            control_gens: Vec::new(),
            policy: MismatchPolicy::default(),
        })
    }

    #[inline] pub fn context(&self) -> &SynthesisContext { &self.context }
    #[inline] pub fn output_generator(&self) -> &Generator { &self.output_gen }
    /// Channel count of the output generator.
    #[inline] pub fn channels(&self) -> usize { self.output_gen.channels() }
    #[inline] pub fn mismatch_policy(&self) -> MismatchPolicy { self.policy }
    #[inline] pub fn set_mismatch_policy(&mut self, policy: MismatchPolicy) { self.policy = policy; }

    /// Wire a new root generator. The partly consumed block is discarded.
    pub fn set_output_gen(&mut self, output: impl Into<Generator>) {
        self.output_gen = output.into();
        self.read_position = 0;
        self.reshape();
        tracing::debug!(channels = self.output_frames.channels(), "output generator replaced");
    }

    /// Follow the output generator's width; a changed width discards the partly consumed block.
    fn reshape(&mut self) {
        let channels = self.output_gen.channels();
        if channels != self.output_frames.channels() {
            tracing::debug!(from = self.output_frames.channels(), to = channels, "output width changed");
            self.read_position = 0;
        }
        self.output_frames.resize(self.context.block_size(), channels);
    }

    /// Tick `gen` once per block even though it is not reachable from the output.
    pub fn add_control_gen_to_tick(&mut self, gen: impl Into<ControlGenerator>) {
        self.control_gens.push(gen.into());
        tracing::debug!(count = self.control_gens.len(), "control generator registered");
    }

    /// One pass with the owned context, then advance it.
    pub fn tick(&mut self, frames: &mut Frames) {
        self.tick_with_context(frames, &self.context);
        self.context.advance();
    }

    /// One pass with a caller-owned context; the caller advances it.
    pub fn tick_with_context(&self, frames: &mut Frames, context: &SynthesisContext) {
        render_pass(&self.output_gen, &self.control_gens, frames, context);
    }

    /// Fill `num_frames × num_channels` interleaved samples of `out`.
    ///
    /// `num_channels` must not exceed [`channels`](Self::channels); see
    /// [`MismatchPolicy`] for what happens when it does.
    pub fn fill_buffer_of_floats(
        &mut self,
        out: &mut [f32],
        num_frames: usize,
        num_channels: usize,
    ) -> Result<(), EngineError> {
        let required = match num_frames.checked_mul(num_channels) {
            Some(required) if required <= out.len() => required,
            required => {
                let err = EngineError::BufferTooSmall { required: required.unwrap_or(usize::MAX), len: out.len() };
                tracing::error!(%err, "fill rejected");
                return Err(err);
            }
        };

        let channels = self.output_gen.channels();
        if num_channels > channels {
            let err = EngineError::ChannelMismatch { requested: num_channels, available: channels };
            return match self.policy {
                MismatchPolicy::Reject => {
                    tracing::error!(%err, "fill rejected");
                    Err(err)
                }
                MismatchPolicy::Silence => {
                    tracing::warn!(%err, "fill silenced");
                    out[..required].fill(0.0);
                    Ok(())
                }
            };
        }
        if num_channels == 0 {
            return Ok(());
        }
        if channels != self.output_frames.channels() {
            self.reshape();
        }

        let sample_count = self.output_frames.len();
        let channels_per_sample = channels - num_channels + 1;
        let norm = 1.0 / channels_per_sample as f32;

        for dst in &mut out[..required] {
            let mut sample = 0.0;
            for _ in 0..channels_per_sample {
                if self.read_position == 0 {
                    self.refill();
                }
                sample += self.output_frames[self.read_position];
                self.read_position += 1;
                if self.read_position == sample_count {
                    self.read_position = 0;
                }
            }
            *dst = sample * norm;
        }
        Ok(())
    }

    /// Fill all of `out`, deriving the frame count from its length.
    ///
    /// Trailing samples that do not make a whole frame are left untouched.
    pub fn fill_interleaved(&mut self, out: &mut [f32], num_channels: usize) -> Result<(), EngineError> {
        let num_frames = if num_channels == 0 { 0 } else { out.len() / num_channels };
        self.fill_buffer_of_floats(out, num_frames, num_channels)
    }

    fn refill(&mut self) {
        render_pass(&self.output_gen, &self.control_gens, &mut self.output_frames, &self.context);
        self.context.advance();
    }
}

impl std::fmt::Debug for BufferFiller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFiller")
            .field("context", &self.context)
            .field("channels", &self.channels())
            .field("read_position", &self.read_position)
            .field("control_gens", &self.control_gens.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[inline]
fn render_pass(output: &Generator, controls: &[ControlGenerator], frames: &mut Frames, context: &SynthesisContext) {
    output.tick(frames, context);
    for gen in controls {
        gen.tick(context);
    }
}
