//! Flags shared by `play` and `render`, and how they resolve into a `SynthConfig`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use synthgraph_core::SynthConfig;
use synthgraph_engine::patches::PATCH_NAMES;
use synthgraph_engine::{Patch, PatchKind};

#[derive(Args, Debug, Clone)]
pub struct PatchArgs {
    #[arg(long, default_value = "drone", value_parser = parse_patch, help = patch_help())]
    pub patch: PatchKind,

    /// TOML file with `sample_rate` / `block_size`; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per graph block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Output level (linear, 0..4)
    #[arg(long, default_value_t = 0.35)]
    pub level: f32,
}

impl PatchArgs {
    /// File values, then flag overrides, then validation.
    pub fn synth_config(&self) -> anyhow::Result<SynthConfig> {
        let mut config = match &self.config {
            Some(path) => SynthConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SynthConfig::default(),
        };
        if let Some(sr) = self.sample_rate {
            config.sample_rate = sr as f32;
        }
        if let Some(block) = self.block_size {
            config.block_size = block;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn build_patch(&self, level: f32) -> Patch {
        Patch::build(self.patch, level)
    }
}

fn parse_patch(s: &str) -> Result<PatchKind, String> {
    s.parse()
}

fn patch_help() -> String {
    format!("Patch to build: {}", PATCH_NAMES.join(", "))
}
