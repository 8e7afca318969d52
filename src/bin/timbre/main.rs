//! timbre - Terminal front end for the four-dimension FM voice
//!
//! Run with: cargo run --bin timbre

mod app;
mod midi;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use app::TimbreApp;
use timbre_dsp::timbre::Dimension;
use timbre_dsp::VoiceConfig;

/// Play the voice from the keyboard and shape it with four timbre dimensions.
#[derive(Parser, Debug)]
#[command(name = "timbre")]
#[command(version)]
struct Args {
    /// MIDI note played by the space bar
    #[arg(long, default_value_t = 57)]
    note: u8,

    /// Velocity for keyboard notes; sets the brightness resonance
    #[arg(long, default_value_t = 100)]
    velocity: u8,

    /// Initial pitch in Hz; defaults to the frequency of --note
    #[arg(long)]
    frequency: Option<f32>,

    #[arg(long, default_value_t = 128)]
    spectrum: u8,

    #[arg(long, default_value_t = 128)]
    brightness: u8,

    #[arg(long, default_value_t = 128)]
    articulation: u8,

    #[arg(long, default_value_t = 128)]
    envelope: u8,

    /// Play from the first MIDI input whose name contains this text
    /// (an empty string picks the first port)
    #[arg(long)]
    midi: Option<String>,

    /// MIDI channel to listen on
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=16))]
    midi_channel: u8,

    /// Start in advanced mode (keys 1-7 pick the FM algorithm)
    #[arg(long)]
    advanced: bool,

    /// Log file (the terminal belongs to the UI). Defaults to timbre.log in
    /// the system temp directory.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("timbre.log"));
    let log_file = File::create(&log_path)
        .wrap_err_with(|| format!("failed to create log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    tracing::info!(log = %log_path.display(), "starting timbre");

    let config = VoiceConfig {
        advanced: args.advanced,
        ..VoiceConfig::default()
    }
    .with_dimension(Dimension::Spectrum, args.spectrum)
    .with_dimension(Dimension::Brightness, args.brightness)
    .with_dimension(Dimension::Articulation, args.articulation)
    .with_dimension(Dimension::Envelope, args.envelope);

    TimbreApp::new(config)
        .note(args.note)
        .velocity(args.velocity)
        .frequency(args.frequency)
        .midi(args.midi, args.midi_channel - 1)
        .run()
}
