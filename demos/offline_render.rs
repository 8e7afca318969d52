//! Render a short phrase to a WAV file without an audio device.
//!
//! cargo run --example offline_render -- out.wav

use hound::{SampleFormat, WavSpec, WavWriter};
use timbre_dsp::{
    io::{midi_note_to_freq, MonoNoteInput},
    synth::NoteMessage,
    timbre::Dimension,
    Voice,
};

const SAMPLE_RATE: u32 = 48_000;
const BLOCK: usize = 256;

/// (note, spectrum, brightness, articulation, envelope, held seconds)
const PHRASE: &[(u8, i32, i32, i32, i32, f32)] = &[
    (57, 128, 128, 128, 128, 0.6),
    (60, 40, 60, 128, 200, 0.6),
    (64, 200, 90, 40, 60, 0.4),
    (69, 230, 200, 220, 240, 0.8),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "timbre.wav".to_string());

    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;

    let mut voice = Voice::new(SAMPLE_RATE as f32, midi_note_to_freq(57));
    let controls = voice.controls();
    let mut input = MonoNoteInput::new();
    let mut block = [0.0f32; BLOCK];
    let mut written = 0usize;

    for &(note, spectrum, brightness, articulation, envelope, held) in PHRASE {
        controls.set_dimension(Dimension::Spectrum, spectrum);
        controls.set_dimension(Dimension::Brightness, brightness);
        controls.set_dimension(Dimension::Articulation, articulation);
        controls.set_dimension(Dimension::Envelope, envelope);

        input.handle(NoteMessage::NoteOn { note, velocity: 100 }, &controls);
        let on_blocks = (held * SAMPLE_RATE as f32) as usize / BLOCK;
        for _ in 0..on_blocks {
            voice.render(&mut block, input.gate());
            for &sample in &block {
                writer.write_sample(sample)?;
            }
            written += BLOCK;
        }

        // Leave room for the release and the debounce window
        input.handle(NoteMessage::NoteOff { note }, &controls);
        for _ in 0..(SAMPLE_RATE as usize / 5) / BLOCK {
            voice.render(&mut block, input.gate());
            for &sample in &block {
                writer.write_sample(sample)?;
            }
            written += BLOCK;
        }
    }

    writer.finalize()?;
    println!("Rendered {written} samples to {path}");
    Ok(())
}
