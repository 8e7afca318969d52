//! Audio stream setup and the realtime callback

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{PushError, RingBuffer};

use timbre_dsp::{
    io::{midi_note_to_freq, MonoNoteInput},
    synth::NoteMessage,
    Voice, VoiceConfig, MAX_BLOCK_SIZE,
};

use super::midi;
use super::ui::{UiApp, VoiceStatus, VIS_BUFFER_SIZE};

const AUDIO_RING_BLOCKS: usize = 16;
const NOTE_RING_LEN: usize = 64;
const STATUS_RING_LEN: usize = 16;

pub struct TimbreApp {
    config: VoiceConfig,
    note: u8,
    velocity: u8,
    frequency: Option<f32>,
    midi_port: Option<String>,
    midi_channel: u8,
}

impl TimbreApp {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            note: 57,
            velocity: 100,
            frequency: None,
            midi_port: None,
            midi_channel: 0,
        }
    }

    /// Note played by the space bar.
    pub fn note(mut self, note: u8) -> Self {
        self.note = note.min(127);
        self
    }

    pub fn velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.clamp(1, 127);
        self
    }

    /// Start tuned to `frequency` instead of the space-bar note.
    pub fn frequency(mut self, frequency: Option<f32>) -> Self {
        self.frequency = frequency;
        self
    }

    /// Also take notes from a MIDI port on a zero-based `channel`.
    pub fn midi(mut self, port: Option<String>, channel: u8) -> Self {
        self.midi_port = port;
        self.midi_channel = channel.min(15);
        self
    }

    /// Open the default output device and run the UI until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        tracing::info!(sample_rate, channels, "output device ready");

        let voice_config = self
            .config
            .clone()
            .with_sample_rate(sample_rate)
            .with_frequency(self.frequency.unwrap_or_else(|| midi_note_to_freq(self.note)));
        let mut voice = Voice::from_config(&voice_config).wrap_err("invalid voice configuration")?;
        let controls = voice.controls();

        let (note_tx, mut note_rx) = RingBuffer::<NoteMessage>::new(NOTE_RING_LEN);
        let (midi_tx, mut midi_rx) = RingBuffer::<NoteMessage>::new(NOTE_RING_LEN);
        let _midi_connection = match &self.midi_port {
            Some(port) => Some(midi::connect(port, self.midi_channel, midi_tx)?),
            None => None,
        };
        let (mut audio_tx, audio_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * AUDIO_RING_BLOCKS);
        let (mut status_tx, status_rx) = RingBuffer::<VoiceStatus>::new(STATUS_RING_LEN);

        let stream = device
            .build_output_stream(
                &config.into(),
                {
                    let controls = controls.clone();
                    let mut input = MonoNoteInput::new();
                    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
                    move |data: &mut [f32], _| {
                        input.drain(&mut note_rx, &controls);
                        let gate = input.drain(&mut midi_rx, &controls);

                        let total_frames = data.len() / channels;
                        let mut frames_written = 0;
                        while frames_written < total_frames {
                            let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                            let block = &mut render_buf[..frames_to_render];
                            voice.render(block, gate);

                            // Mono to every channel
                            let out_off = frames_written * channels;
                            for (i, &s) in block.iter().enumerate() {
                                for ch in 0..channels {
                                    data[out_off + i * channels + ch] = s;
                                }
                            }

                            for &s in block.iter() {
                                if let Err(PushError::Full(_)) = audio_tx.push(s) {
                                    break;
                                }
                            }

                            frames_written += frames_to_render;
                        }

                        let _ = status_tx.push(VoiceStatus::capture(&voice, input.note()));
                    }
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .wrap_err("failed to build output stream")?;

        stream.play().wrap_err("failed to start output stream")?;
        tracing::info!(note = self.note, velocity = self.velocity, "stream started");

        let terminal = &mut ratatui::init();
        let result = UiApp::new(
            audio_rx,
            status_rx,
            note_tx,
            controls,
            sample_rate,
            self.note,
            self.velocity,
        )
        .run(terminal);
        ratatui::restore();

        tracing::info!("shutting down");
        result
    }
}
