//! Real-time playback through cpal.
//!
//! The `BufferFiller` moves into the device callback; the main thread keeps a
//! clone of the patch (for the fade-in) and of the context (to report elapsed
//! time). Both are shared handles, so nothing is copied.

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use clap::Args;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use synthgraph_core::SynthConfig;
use synthgraph_engine::BufferFiller;

use super::common::PatchArgs;

const FADE_STEP: Duration = Duration::from_millis(20);
const REPORT_EVERY: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub patch: PatchArgs,

    /// Output device name (default device if omitted)
    #[arg(long)]
    pub device: Option<String>,

    /// Device channel count
    #[arg(long)]
    pub channels: Option<u16>,

    /// Seconds to ramp the level up from silence
    #[arg(long, default_value_t = 2.0)]
    pub fade_in: f32,

    /// Stop after this many seconds (runs until Ctrl+C otherwise)
    #[arg(long)]
    pub duration: Option<f64>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let requested = args.patch.synth_config()?;
    let device = pick_device(args.device.as_deref())?;
    // A rate from the config file counts as a request; otherwise the device default wins.
    let req_sr = args
        .patch
        .sample_rate
        .or_else(|| args.patch.config.is_some().then_some(requested.sample_rate as u32));
    let sup_cfg = choose_config(&device, req_sr, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let stream_cfg = sup_cfg.config();

    // The graph runs at whatever rate the device settled on.
    let config = SynthConfig::new(stream_cfg.sample_rate.0 as f32, requested.block_size)?;
    let target_level = args.patch.level.clamp(0.0, 4.0);
    let start_level = if args.fade_in > 0.0 { 0.0 } else { target_level };
    let patch = args.patch.build_patch(start_level);

    let mut filler = BufferFiller::with_output(config, patch.output())?;
    filler.add_control_gen_to_tick(patch.block_counter());
    let context = filler.context().clone();

    tracing::info!(device = %device.name().unwrap_or_default(), "output device");
    tracing::info!(
        sample_rate = stream_cfg.sample_rate.0,
        channels = stream_cfg.channels,
        format = ?sample_format,
        block_size = config.block_size,
        "stream config"
    );
    tracing::info!(patch = %patch.kind(), level = target_level, "playing");

    let err_fn = |e: cpal::StreamError| tracing::error!(error = %e, "stream error");
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_cfg, filler, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_cfg, filler, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_cfg, filler, err_fn)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    stream.play()?;

    let started = Instant::now();
    let stop_at = args.duration.map(Duration::from_secs_f64);
    let mut last_report = started;
    loop {
        let now = started.elapsed();
        if stop_at.is_some_and(|d| now >= d) {
            break;
        }
        if args.fade_in > 0.0 && patch.level() < target_level {
            let ramp = (now.as_secs_f32() / args.fade_in).min(1.0);
            patch.set_level(target_level * ramp);
        }
        if last_report.elapsed() >= REPORT_EVERY {
            last_report = Instant::now();
            tracing::info!(
                elapsed = format_args!("{:.1}s", context.elapsed_time()),
                blocks = patch.block_counter().count(),
                "playing"
            );
        }
        std::thread::sleep(FADE_STEP);
    }

    drop(stream);
    tracing::info!(elapsed = format_args!("{:.1}s", context.elapsed_time()), "stopped");
    Ok(())
}

fn pick_device(name: Option<&str>) -> anyhow::Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device().ok_or_else(|| anyhow!("no default output device"))
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> anyhow::Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Closest range: sample-rate distance dominates channel distance.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = match req_sr {
            Some(sr) if (sr_min..=sr_max).contains(&sr) => 0,
            Some(sr) => u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))),
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported output configs"))?;
    let rate = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    filler: BufferFiller,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> anyhow::Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let device_channels = usize::from(cfg.channels);
    if device_channels == 0 {
        bail!("device reports zero output channels");
    }
    let mut feed = DeviceFeed::new(filler, device_channels, cfg.sample_rate.0 as usize);

    let stream = device
        .build_output_stream(cfg, move |output: &mut [T], _| feed.render(output), err_fn, None)
        .context("building output stream")?;

    Ok(stream)
}

/// Frames pulled from the filler per pass; host buffers are rendered in pieces of this size.
const SCRATCH_FRAMES: usize = 1024;

/// Callback-side state: the filler, a fixed scratch buffer and a peak meter.
///
/// Nothing here allocates after construction, whatever buffer size the host picks.
struct DeviceFeed {
    filler: BufferFiller,
    scratch: Vec<f32>,
    device_channels: usize,
    meter_interval: usize,
    meter_count: usize,
    meter_peak: f32,
}

impl DeviceFeed {
    fn new(filler: BufferFiller, device_channels: usize, sample_rate: usize) -> Self {
        // Generators are mono or stereo, so two pulled channels is the most a pass needs.
        let max_pull = device_channels.min(2);
        Self {
            filler,
            scratch: vec![0.0; max_pull * SCRATCH_FRAMES],
            device_channels,
            // Peak meter, roughly once a second.
            meter_interval: sample_rate.max(1),
            meter_count: 0,
            meter_peak: 0.0,
        }
    }

    /// Fill one host buffer. Extra device channels repeat the last pulled one.
    fn render<T>(&mut self, output: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let dc = self.device_channels;
        let pull = dc.min(self.filler.channels()).min(2);
        for piece in output.chunks_mut(dc * SCRATCH_FRAMES) {
            let frames = piece.len() / dc;
            let scratch = &mut self.scratch[..frames * pull];
            if self.filler.fill_buffer_of_floats(scratch, frames, pull).is_err() {
                piece.fill(T::EQUILIBRIUM);
                continue;
            }

            for (frame, src) in piece.chunks_exact_mut(dc).zip(scratch.chunks_exact(pull)) {
                for (ch, out) in frame.iter_mut().enumerate() {
                    let s = src[ch.min(pull - 1)].clamp(-1.0, 1.0);
                    *out = T::from_sample(s);
                    self.meter_peak = self.meter_peak.max(s.abs());
                }
                self.meter_count += 1;
                if self.meter_count >= self.meter_interval {
                    tracing::debug!(peak = format_args!("{:.3}", self.meter_peak), "meter");
                    self.meter_peak = 0.0;
                    self.meter_count = 0;
                }
            }
            // Trailing partial frame, if the host handed one.
            piece[frames * dc..].fill(T::EQUILIBRIUM);
        }
    }
}
