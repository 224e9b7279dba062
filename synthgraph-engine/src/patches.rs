//! Prebuilt graphs used by the CLI, the C ABI and the benches.
//!
//! A [`Patch`] is the root handle of a small graph plus the few knobs a host
//! wants to turn while it plays. Every patch ends in a [`Gain`] stage (`level`)
//! so the host can fade it from a control thread.
//!
//! Patches:
//! - `drone`        : two detuned sines with slow vibrato, spread across the stereo field
//! - `stereo-noise` : one noise source fanned out to a left and a right panner
//! - `silence`      : pass-through, mono

use std::fmt;
use std::str::FromStr;

use crate::control::{control_counter, ControlCounter, TypedControlGenerator};
use crate::generator::{Generator, TypedGenerator};
use crate::nodes::{adder, fixed, gain, noise, panner, sine, sine_mod, Gain};

/// Names accepted by [`Patch::build`].
pub const PATCH_NAMES: &[&str] = &["drone", "stereo-noise", "silence"];

/// Which prebuilt graph to build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PatchKind {
    #[default]
    Drone,
    StereoNoise,
    Silence,
}

impl FromStr for PatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drone" => Ok(Self::Drone),
            "stereo-noise" | "noise" => Ok(Self::StereoNoise),
            "silence" => Ok(Self::Silence),
            other => Err(format!("unknown patch '{other}' (expected one of: {})", PATCH_NAMES.join(", "))),
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drone => "drone",
            Self::StereoNoise => "stereo-noise",
            Self::Silence => "silence",
        })
    }
}

/// A built graph: root handle, output level, and a block counter for side-effect ticking.
#[derive(Clone)]
pub struct Patch {
    kind: PatchKind,
    level: TypedGenerator<Gain>,
    blocks: TypedControlGenerator<ControlCounter>,
}

impl Patch {
    /// Build `kind` with output level `level` (linear gain).
    pub fn build(kind: PatchKind, level: f32) -> Self {
        let body: Generator = match kind {
            PatchKind::Drone => drone(),
            PatchKind::StereoNoise => stereo_noise(),
            PatchKind::Silence => Generator::default(),
        };
        tracing::debug!(patch = %kind, channels = body.channels(), "patch built");
        Self { kind, level: gain(body, level), blocks: control_counter() }
    }

    #[inline] pub fn kind(&self) -> PatchKind { self.kind }

    /// Root of the graph.
    #[inline]
    pub fn output(&self) -> Generator {
        self.level.generator()
    }

    /// Counter meant to be registered with `BufferFiller::add_control_gen_to_tick`.
    #[inline]
    pub fn block_counter(&self) -> &TypedControlGenerator<ControlCounter> {
        &self.blocks
    }

    /// Current output level.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level.params().gain.get()
    }

    /// Set the output level under the context lock. Clamped to `[0, 4]`.
    pub fn set_level(&self, level: f32) {
        self.level.set(|p| p.gain.set_clamped(level, 0.0, 4.0));
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("kind", &self.kind)
            .field("level", &self.level())
            .finish()
    }
}

// Rough A2 + fifth; vibrato on the upper voice.
fn drone() -> Generator {
    let vibrato = gain(sine(0.2), 1.5);
    let upper = sine_mod(adder([Generator::from(fixed(110.0 * 1.498)), vibrato.into()]));
    let lower = sine(110.0);
    adder([
        Generator::from(panner(gain(lower, 0.4), -0.35)),
        panner(gain(upper, 0.3), 0.35).into(),
    ])
    .into()
}

// One noise node, two consumers: computed once per block.
fn stereo_noise() -> Generator {
    let source = noise();
    adder([
        Generator::from(panner(gain(&source, 0.5), -0.6)),
        panner(gain(&source, 0.5), 0.6).into(),
    ])
    .into()
}
