use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use spectrum_bars_core::{
    BarVisualizer, CommandRecorder, EffectContext, HostAudioRegistry, SpectrumError,
    VisualizerConfig,
};
use tracing_subscriber::EnvFilter;

mod preview;

fn main() -> spectrum_bars_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            frames,
            fps,
        } => run(config.as_deref(), frames, fps),
        Commands::Preview {
            config,
            magnitudes,
            right,
            json,
        } => run_preview(config.as_deref(), &magnitudes, &right, json),
    }
}

fn load_config(path: Option<&Path>) -> spectrum_bars_core::Result<VisualizerConfig> {
    match path {
        Some(path) => VisualizerConfig::from_json_path(path),
        None => Ok(VisualizerConfig::default()),
    }
}

fn run(config: Option<&Path>, frames: u64, fps: f32) -> spectrum_bars_core::Result<()> {
    if fps.is_nan() || fps <= 0.0 {
        return Err(SpectrumError::InvalidConfig(format!(
            "fps must be positive, got {fps}"
        )));
    }

    let config = load_config(config)?;
    tracing::info!(source = %config.audio_source_name, frames, fps, "starting visualizer");

    let mut viz = BarVisualizer::new(config, HostAudioRegistry::new());
    let mut recorder = CommandRecorder::new();
    let frame_time = Duration::from_secs_f32(1.0 / fps);
    let mut last = Instant::now();

    for frame in 0..frames {
        recorder.clear();
        let seconds = last.elapsed().as_secs_f32();
        last = Instant::now();

        viz.update();
        viz.tick(seconds);

        let (left, right) = preview::channel_levels(viz.audio().pcm(), viz.config().detail);
        viz.set_magnitudes(&left, &right);
        viz.render(&mut recorder, &EffectContext)?;

        tracing::debug!(
            frame,
            state = ?viz.state(),
            data_read = viz.audio().data_read(),
            commands = recorder.commands().len(),
            "frame rendered"
        );

        thread::sleep(frame_time.saturating_sub(last.elapsed()));
    }

    let shapes = viz.layout();
    println!("{}", preview::ascii(viz.config(), &shapes));
    Ok(())
}

fn run_preview(
    config: Option<&Path>,
    magnitudes: &[f64],
    right: &[f64],
    json: bool,
) -> spectrum_bars_core::Result<()> {
    let mut config = load_config(config)?;
    config.detail = magnitudes.len() as u32;

    let mut viz = BarVisualizer::new(config, HostAudioRegistry::new());
    viz.set_magnitudes(magnitudes, right);

    let mut recorder = CommandRecorder::new();
    viz.render(&mut recorder, &EffectContext)?;
    tracing::debug!(commands = recorder.commands().len(), "preview rendered");

    let shapes = viz.layout();
    if json {
        println!("{}", serde_json::to_string_pretty(&shapes)?);
    } else {
        println!("{}", preview::ascii(viz.config(), &shapes));
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio spectrum bar visualizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the visualizer from its configured audio source.
    Run {
        /// JSON configuration file. Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to render before printing the last one.
        #[arg(short, long, default_value_t = 120)]
        frames: u64,
        /// Target frame rate.
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
    },
    /// Render a single frame from literal magnitudes.
    Preview {
        /// JSON configuration file. Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Left (or mono) channel magnitudes, one per band.
        #[arg(short, long, value_delimiter = ',', required = true)]
        magnitudes: Vec<f64>,
        /// Right channel magnitudes for stereo layouts.
        #[arg(short, long, value_delimiter = ',')]
        right: Vec<f64>,
        /// Print the bar shapes as JSON instead of drawing them.
        #[arg(long)]
        json: bool,
    },
}
