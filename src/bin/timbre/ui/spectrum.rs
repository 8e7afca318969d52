//! Spectrum analyzer widget
//!
//! FFT of the output on log-spaced bins, with a marker at the note's
//! fundamental so the partials the spectrum dimension adds are easy to read.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

const SPECTRUM_BINS: usize = 64;
const MIN_FREQ: f32 = 20.0;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    /// Bin centers in Hz
    freq_bins: Vec<f64>,
    /// FFT index for each bin
    bin_indices: Vec<usize>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// (log10 Hz, dB) pairs ready for the chart
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(buffer_len: usize, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(buffer_len);

        // Hann
        let window: Vec<f32> = (0..buffer_len)
            .map(|i| {
                if buffer_len > 1 {
                    let denom = (buffer_len - 1) as f32;
                    0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos())
                } else {
                    1.0
                }
            })
            .collect();

        let max_freq = (sample_rate / 2.0).min(20_000.0).max(MIN_FREQ + 1.0);
        let ratio = (max_freq / MIN_FREQ) as f64;
        let half = (buffer_len / 2).max(1);

        let mut freq_bins = Vec::with_capacity(SPECTRUM_BINS);
        let mut bin_indices = Vec::with_capacity(SPECTRUM_BINS);
        for i in 0..SPECTRUM_BINS {
            let t = i as f64 / (SPECTRUM_BINS - 1) as f64;
            let freq = MIN_FREQ as f64 * ratio.powf(t);
            let index = ((freq * buffer_len as f64 / sample_rate as f64).round() as usize).min(half - 1);
            freq_bins.push(freq);
            bin_indices.push(index);
        }

        let spectrum = freq_bins.iter().map(|&f| (f.log10(), FLOOR_DB)).collect();

        Self {
            window,
            freq_bins,
            bin_indices,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); buffer_len],
            spectrum,
        }
    }

    /// Recompute from the latest `buffer`; ignored unless it has the
    /// analyzer's length.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((bin, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (point, (&freq, &index)) in self
            .spectrum
            .iter_mut()
            .zip(self.freq_bins.iter().zip(&self.bin_indices))
        {
            let power = self.scratch[index].norm_sqr().max(1e-12);
            *point = (freq.log10(), (10.0 * (power as f64).log10()).max(FLOOR_DB));
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)], fundamental: Option<f64>) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let max_db = spectrum.iter().map(|(_, db)| *db).fold(FLOOR_DB, f64::max);
    let top = max_db.max(0.0) + 10.0;
    let x_min = (MIN_FREQ as f64).log10();
    let x_max = spectrum.last().map(|(f, _)| *f).unwrap_or(x_min + 1.0).max(x_min + 1.0);

    let marker: Vec<(f64, f64)> = fundamental
        .filter(|f| *f > 0.0)
        .map(|f| vec![(f.log10(), FLOOR_DB), (f.log10(), top)])
        .unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&marker),
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(spectrum),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([x_min, x_max])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, top])
                .labels(vec!["-100", "-60", "-20", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
