//! SynthGraph CLI — real-time player and offline renderer for prebuilt patches.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synthgraph")]
#[command(author, version, about = "Play or render SynthGraph patches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a patch on an output device
    Play(commands::play::PlayArgs),

    /// Render a patch to a WAV file
    Render(commands::render::RenderArgs),

    /// List output devices
    Devices,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Devices => commands::devices::run(),
    }
}
