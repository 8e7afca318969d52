//! TUI for timbre
//!
//! Dimension sliders, the voice's derived parameters and a live view of the
//! output.

mod dimensions;
mod spectrum;
mod state;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};
use std::time::Duration;

use timbre_dsp::{
    dsp::FmAlgorithm,
    synth::NoteMessage,
    timbre::{AdvancedSpectrum, Dimension},
    VoiceControls,
};

pub use state::VoiceStatus;

use dimensions::{render_curve, render_dimensions, render_status};
use spectrum::{render_spectrum, SpectrumAnalyzer};
use waveform::render_waveform;

/// Samples kept for the scope and the analyzer
pub const VIS_BUFFER_SIZE: usize = 1024;

const COARSE_STEP: i32 = 16;
// White keys from middle C
const PIANO_KEYS: [(char, u8); 8] = [
    ('a', 60),
    ('s', 62),
    ('d', 64),
    ('f', 65),
    ('g', 67),
    ('h', 69),
    ('j', 71),
    ('k', 72),
];

pub struct UiApp {
    audio_rx: Consumer<f32>,
    status_rx: Consumer<VoiceStatus>,
    note_tx: Producer<NoteMessage>,
    controls: VoiceControls,

    status: Option<VoiceStatus>,
    audio_buffer: Vec<f32>,
    analyzer: SpectrumAnalyzer,

    selected: Dimension,
    base_note: u8,
    velocity: u8,
    /// Key we sent a note-on for and have not released
    held: Option<u8>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        audio_rx: Consumer<f32>,
        status_rx: Consumer<VoiceStatus>,
        note_tx: Producer<NoteMessage>,
        controls: VoiceControls,
        sample_rate: f32,
        base_note: u8,
        velocity: u8,
    ) -> Self {
        Self {
            audio_rx,
            status_rx,
            note_tx,
            controls,
            status: None,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            analyzer: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            selected: Dimension::Spectrum,
            base_note,
            velocity,
            held: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_status();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        // Leave the voice silent behind us
        self.send(NoteMessage::AllNotesOff);
        Ok(())
    }

    fn poll_audio(&mut self) {
        let available = self.audio_rx.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = self.audio_rx.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            self.audio_buffer.extend_from_slice(first);
            self.audio_buffer.extend_from_slice(second);
            chunk.commit_all();
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
        self.analyzer.update(&self.audio_buffer);
    }

    fn poll_status(&mut self) {
        while let Ok(status) = self.status_rx.pop() {
            self.status = Some(status);
        }
    }

    fn send(&mut self, message: NoteMessage) {
        if self.note_tx.push(message).is_err() {
            tracing::warn!(?message, "note queue full, message dropped");
        }
    }

    fn play(&mut self, note: u8) {
        if let Some(held) = self.held.take() {
            self.send(NoteMessage::NoteOff { note: held });
            if held == note {
                return;
            }
        }
        self.send(NoteMessage::NoteOn {
            note,
            velocity: self.velocity,
        });
        self.held = Some(note);
    }

    fn nudge(&mut self, delta: i32) {
        let current = self.controls.dimension(self.selected) as i32;
        self.controls.set_dimension(self.selected, current + delta);
        tracing::debug!(
            dimension = self.selected.name(),
            value = self.controls.dimension(self.selected),
            "dimension changed"
        );
    }

    fn select(&mut self, offset: isize) {
        let count = Dimension::ALL.len() as isize;
        let index = (self.selected.index() as isize + offset).rem_euclid(count) as usize;
        self.selected = Dimension::ALL[index];
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up => self.select(-1),
            KeyCode::Down | KeyCode::Tab => self.select(1),
            KeyCode::Left => self.nudge(-1),
            KeyCode::Right => self.nudge(1),
            KeyCode::PageDown => self.nudge(-COARSE_STEP),
            KeyCode::PageUp => self.nudge(COARSE_STEP),
            KeyCode::Char(' ') => self.play(self.base_note),
            KeyCode::Char('v') => {
                let advanced = !self.controls.is_advanced();
                self.controls.set_advanced_mode(advanced);
                tracing::info!(advanced, "advanced mode toggled");
            }
            KeyCode::Char(c @ '1'..='7') if self.controls.is_advanced() => {
                let index = c as usize - '1' as usize;
                let algorithm = FmAlgorithm::from_index(index);
                self.controls.set_advanced_spectrum(&AdvancedSpectrum {
                    algorithm: Some(algorithm),
                    ..AdvancedSpectrum::default()
                });
                tracing::info!(algorithm = algorithm.name(), "algorithm selected");
            }
            KeyCode::Char(c) => {
                if let Some(&(_, note)) = PIANO_KEYS.iter().find(|(key, _)| *key == c) {
                    self.play(note);
                }
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status
                Constraint::Length(6), // Dimension sliders
                Constraint::Min(6),    // Filter curves
                Constraint::Min(8),    // Scope and spectrum
                Constraint::Length(1), // Help
            ])
            .split(area);

        render_status(frame, rows[0], self.status.as_ref(), self.held);

        let values = Dimension::ALL.map(|d| self.controls.dimension(d));
        render_dimensions(frame, rows[1], &values, self.selected);

        let curves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        if let Some(status) = &self.status {
            render_curve(frame, curves[0], " Brightness response ", &status.brightness_response, Color::Yellow);
            render_curve(frame, curves[1], " Articulation sweep ", &status.articulation_curve, Color::Magenta);
        }

        let scope = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[3]);
        render_waveform(frame, scope[0], &self.audio_buffer);
        let fundamental = self.status.map(|s| s.frequency as f64);
        render_spectrum(frame, scope[1], self.analyzer.data(), fundamental);

        let help = Paragraph::new(
            " [Q] Quit  [↑↓] Dimension  [←→/PgUp/PgDn] Adjust  [Space/A-K] Note  [V] Advanced  [1-7] Algorithm",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[4]);
    }
}
