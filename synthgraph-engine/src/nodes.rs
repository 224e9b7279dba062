//! Building blocks (generators) for SynthGraph patches.
//!
//! Each kind implements [`Synthesize`] and comes with a constructor function
//! returning its [`TypedGenerator`]. They are deliberately small; the point is to
//! exercise the graph protocol, not to be a DSP library.
//!
//! Contents:
//! - `FixedValue` : constant signal, value settable from the control thread
//! - `SineWave`   : sine oscillator whose frequency is itself a generator input
//! - `Noise`      : white noise, seedable for reproducible renders
//! - `Adder`      : sums any number of inputs
//! - `Gain`       : input × gain
//! - `Panner`     : constant-power mono → stereo
//!
//! Notes:
//! - Frequency is **Hz**; the sample rate comes from the context.
//! - Inputs are [`Input`] slots and can be re-wired while the graph runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synthgraph_core::{Frames, Param};

use crate::context::SynthesisContext;
use crate::generator::{Generator, Input, Synthesize, TypedGenerator};

const TAU: f64 = core::f64::consts::TAU;

// --------------------------------- FixedValue ------------------------------------

/// Constant output.
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedValue;

impl Synthesize for FixedValue {
    type Params = Param;

    #[inline]
    fn compute_synthesis_block(&mut self, value: &Param, out: &mut Frames, _: &SynthesisContext) {
        out.fill(value.get());
    }
}

/// Constant generator at `value`.
pub fn fixed(value: f32) -> TypedGenerator<FixedValue> {
    TypedGenerator::new(FixedValue, Param::new(value))
}

// --------------------------------- SineWave --------------------------------------

/// Parameters of [`SineWave`].
#[derive(Debug, Default)]
pub struct SineParams {
    /// Frequency in Hz, one value per frame.
    pub freq: Input,
}

/// Sine oscillator with a per-sample frequency input.
#[derive(Clone, Debug, Default)]
pub struct SineWave {
    phase: f64, // [0,1)
    freq: Frames,
}

impl Synthesize for SineWave {
    type Params = SineParams;

    fn compute_synthesis_block(&mut self, params: &SineParams, out: &mut Frames, context: &SynthesisContext) {
        if self.freq.frames() != out.frames() {
            self.freq.resize(out.frames(), 1);
        }
        params.freq.tick(&mut self.freq, context);

        let inv_sr = 1.0 / f64::from(context.sample_rate());
        for (frame, &hz) in out.frames_iter_mut().zip(self.freq.as_slice()) {
            let s = (TAU * self.phase).sin() as f32;
            frame.fill(s);
            self.phase = (self.phase + f64::from(hz.max(0.0)) * inv_sr).fract();
        }
    }
}

/// Sine at a constant frequency (the frequency stays re-wirable).
pub fn sine(freq_hz: f32) -> TypedGenerator<SineWave> {
    sine_mod(fixed(freq_hz))
}

/// Sine whose frequency is driven by `freq`.
pub fn sine_mod(freq: impl Into<Generator>) -> TypedGenerator<SineWave> {
    TypedGenerator::new(SineWave::default(), SineParams { freq: Input::new(freq) })
}

// --------------------------------- Noise -----------------------------------------

/// Uniform white noise in `[-1, 1)`.
#[derive(Clone, Debug)]
pub struct Noise {
    rng: StdRng,
}

impl Noise {
    pub fn seeded(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed) } }
    pub fn from_entropy() -> Self { Self { rng: StdRng::from_entropy() } }
}

impl Synthesize for Noise {
    type Params = ();

    fn compute_synthesis_block(&mut self, _: &(), out: &mut Frames, _: &SynthesisContext) {
        for s in out.as_mut_slice() {
            *s = self.rng.gen_range(-1.0..1.0);
        }
    }
}

/// Noise generator seeded from the OS.
pub fn noise() -> TypedGenerator<Noise> {
    TypedGenerator::new(Noise::from_entropy(), ())
}

/// Reproducible noise generator.
pub fn noise_seeded(seed: u64) -> TypedGenerator<Noise> {
    TypedGenerator::new(Noise::seeded(seed), ())
}

// --------------------------------- Adder -----------------------------------------

/// Sums its inputs. Stereo if any input was stereo when it was built.
#[derive(Clone, Debug, Default)]
pub struct Adder {
    scratch: Frames,
}

impl Synthesize for Adder {
    type Params = Vec<Input>;

    fn compute_synthesis_block(&mut self, inputs: &Vec<Input>, out: &mut Frames, context: &SynthesisContext) {
        out.fill(0.0);
        if self.scratch.frames() != out.frames() || self.scratch.channels() != out.channels() {
            self.scratch.resize(out.frames(), out.channels());
        }
        for input in inputs {
            input.tick(&mut self.scratch, context);
            out.add_assign(&self.scratch);
        }
    }
}

/// Sum of `inputs`.
pub fn adder<I, G>(inputs: I) -> TypedGenerator<Adder>
where
    I: IntoIterator<Item = G>,
    G: Into<Generator>,
{
    let inputs: Vec<Input> = inputs.into_iter().map(Input::new).collect();
    let stereo = inputs.iter().any(Input::is_stereo_output);
    let gen = TypedGenerator::new(Adder::default(), inputs);
    gen.set_is_stereo_output(stereo);
    gen
}

// --------------------------------- Gain ------------------------------------------

/// Parameters of [`Gain`].
#[derive(Debug, Default)]
pub struct GainParams {
    pub input: Input,
    pub gain: Param,
}

/// Multiplies its input by a gain parameter. Same width as the input it was built with.
#[derive(Copy, Clone, Debug, Default)]
pub struct Gain;

impl Synthesize for Gain {
    type Params = GainParams;

    fn compute_synthesis_block(&mut self, params: &GainParams, out: &mut Frames, context: &SynthesisContext) {
        params.input.tick(out, context);
        let g = params.gain.get();
        for s in out.as_mut_slice() {
            *s *= g;
        }
    }
}

/// `input × gain`.
pub fn gain(input: impl Into<Generator>, gain: f32) -> TypedGenerator<Gain> {
    let input = Input::new(input);
    let stereo = input.is_stereo_output();
    let gen = TypedGenerator::new(Gain, GainParams { input, gain: Param::new(gain) });
    gen.set_is_stereo_output(stereo);
    gen
}

// --------------------------------- Panner ----------------------------------------

/// Parameters of [`Panner`].
#[derive(Debug, Default)]
pub struct PanParams {
    pub input: Input,
    /// -1 = hard left, +1 = hard right.
    pub pan: Param,
}

/// Constant-power panner: mono in, stereo out.
#[derive(Clone, Debug, Default)]
pub struct Panner {
    mono: Frames,
}

impl Panner {
    /// (left, right) gains for `pan` in [-1..1] using a sine/cosine taper.
    #[inline]
    pub fn gains(pan: f32) -> (f32, f32) {
        let p = (pan.clamp(-1.0, 1.0) + 1.0) * 0.25 * core::f32::consts::PI; // map to [0, π/2]
        (p.cos(), p.sin())
    }
}

impl Synthesize for Panner {
    type Params = PanParams;
    const STEREO_OUTPUT: bool = true;

    fn compute_synthesis_block(&mut self, params: &PanParams, out: &mut Frames, context: &SynthesisContext) {
        if self.mono.frames() != out.frames() {
            self.mono.resize(out.frames(), 1);
        }
        params.input.tick(&mut self.mono, context);
        let (l, r) = Self::gains(params.pan.get());
        for (frame, &s) in out.frames_iter_mut().zip(self.mono.as_slice()) {
            match frame {
                [left, right, ..] => {
                    *left = s * l;
                    *right = s * r;
                }
                // forced to mono: what a stereo→mono pull would hear
                [mono] => *mono = s * (l + r) * 0.5,
                [] => {}
            }
        }
    }
}

/// Place mono `input` in the stereo field.
pub fn panner(input: impl Into<Generator>, pan: f32) -> TypedGenerator<Panner> {
    TypedGenerator::new(Panner::default(), PanParams { input: Input::new(input), pan: Param::new(pan) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgraph_core::SynthConfig;

    fn ctx(sr: f32, block: usize) -> SynthesisContext {
        let ctx = SynthesisContext::new(SynthConfig::new(sr, block).unwrap());
        ctx.advance();
        ctx
    }

    fn render(gen: &Generator, ctx: &SynthesisContext) -> Frames {
        let mut f = Frames::new(ctx.block_size(), gen.channels());
        gen.tick(&mut f, ctx);
        f
    }

    #[test]
    fn fixed_value_follows_param() {
        let g = fixed(0.5);
        let ctx = ctx(48_000.0, 8);
        assert!(render(&g, &ctx).as_slice().iter().all(|&s| s == 0.5));
        g.set(|v| v.set(-0.25));
        ctx.advance();
        assert!(render(&g, &ctx).as_slice().iter().all(|&s| s == -0.25));
    }

    #[test]
    fn sine_quarter_period() {
        // 1 Hz at 4 Hz sample rate: 0, 1, 0, -1
        let g = sine(1.0);
        let out = render(&g, &ctx(4.0, 4));
        let expect = [0.0, 1.0, 0.0, -1.0];
        for (a, b) in out.as_slice().iter().zip(expect) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn sine_frequency_can_be_rewired() {
        let g = sine(0.0);
        let ctx = ctx(4.0, 4);
        assert!(render(&g, &ctx).as_slice().iter().all(|&s| s == 0.0));
        g.set(|p| p.freq.set(fixed(1.0)));
        ctx.advance();
        let out = render(&g, &ctx);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn seeded_noise_is_reproducible_and_bounded() {
        let ctx = ctx(48_000.0, 64);
        let a = render(&noise_seeded(7), &ctx);
        let b = render(&noise_seeded(7), &ctx);
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn adder_sums_and_widens() {
        let ctx = ctx(48_000.0, 4);
        let mono = adder([fixed(0.25), fixed(0.5)]);
        assert!(!mono.is_stereo_output());
        assert!(render(&mono, &ctx).as_slice().iter().all(|&s| s == 0.75));

        let wide = adder([Generator::from(fixed(1.0)), panner(fixed(1.0), 1.0).into()]);
        assert!(wide.is_stereo_output());
        let out = render(&wide, &ctx);
        assert!((out[0] - 1.0).abs() < 1e-6, "left: mono 1 + hard-right 0");
        assert!((out[1] - 2.0).abs() < 1e-6, "right: mono 1 + hard-right 1");
    }

    #[test]
    fn gain_scales_and_keeps_width() {
        let ctx = ctx(48_000.0, 4);
        let g = gain(panner(fixed(1.0), 0.0), 2.0);
        assert!(g.is_stereo_output());
        let out = render(&g, &ctx);
        let (l, r) = Panner::gains(0.0);
        assert!((out[0] - 2.0 * l).abs() < 1e-6);
        assert!((out[1] - 2.0 * r).abs() < 1e-6);
    }

    #[test]
    fn panner_forced_to_mono_folds_down() {
        let ctx = ctx(48_000.0, 4);
        let p = panner(fixed(1.0), 0.5);
        p.set_is_stereo_output(false);
        let out = render(&p, &ctx);
        assert_eq!(out.channels(), 1);
        let (l, r) = Panner::gains(0.5);
        assert!(out.as_slice().iter().all(|s| (s - (l + r) * 0.5).abs() < 1e-6));
    }

    #[test]
    fn pan_law_is_constant_power() {
        for pan in [-1.0, -0.3, 0.0, 0.6, 1.0] {
            let (l, r) = Panner::gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1e-6);
        }
        let (l, r) = Panner::gains(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
    }
}
