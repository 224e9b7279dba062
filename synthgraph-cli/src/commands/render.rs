//! Offline rendering to WAV.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use hound::{SampleFormat, WavSpec, WavWriter};
use synthgraph_engine::BufferFiller;

use super::common::PatchArgs;

/// Host-side chunk size; deliberately unrelated to the block size.
const CHUNK_FRAMES: usize = 1000;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output WAV path
    pub output: PathBuf,

    #[command(flatten)]
    pub patch: PatchArgs,

    /// Seconds of audio to render
    #[arg(long, default_value_t = 10.0)]
    pub duration: f64,

    /// Channels to write (defaults to the patch's width)
    #[arg(long)]
    pub channels: Option<u16>,

    /// Bits per sample: 16 (int) or 32 (float)
    #[arg(long, default_value_t = 32)]
    pub bits: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        bail!("duration must be a non-negative number of seconds");
    }
    if args.bits != 16 && args.bits != 32 {
        bail!("unsupported bit depth {} (expected 16 or 32)", args.bits);
    }

    let config = args.patch.synth_config()?;
    let patch = args.patch.build_patch(args.patch.level.clamp(0.0, 4.0));
    let mut filler = BufferFiller::with_output(config, patch.output())?;
    filler.add_control_gen_to_tick(patch.block_counter());

    let channels = args.channels.map_or(filler.channels(), usize::from);
    let total_frames = (args.duration * f64::from(config.sample_rate)).round() as usize;

    let spec = WavSpec {
        channels: u16::try_from(channels).context("channel count")?,
        sample_rate: config.sample_rate as u32,
        bits_per_sample: args.bits,
        sample_format: if args.bits == 32 { SampleFormat::Float } else { SampleFormat::Int },
    };
    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;

    tracing::info!(
        patch = %patch.kind(),
        path = %args.output.display(),
        frames = total_frames,
        channels,
        sample_rate = config.sample_rate,
        block_size = config.block_size,
        "rendering"
    );

    let mut chunk = vec![0.0f32; CHUNK_FRAMES * channels];
    let mut remaining = total_frames;
    while remaining > 0 {
        let frames = remaining.min(CHUNK_FRAMES);
        let samples = &mut chunk[..frames * channels];
        filler.fill_buffer_of_floats(samples, frames, channels)?;
        for &s in samples.iter() {
            if args.bits == 32 {
                writer.write_sample(s)?;
            } else {
                writer.write_sample((s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
            }
        }
        remaining -= frames;
    }
    writer.finalize()?;

    tracing::info!(
        seconds = format_args!("{:.2}", filler.context().elapsed_time()),
        blocks = patch.block_counter().count(),
        "render done"
    );
    Ok(())
}
