//! Output oscilloscope, triggered on a rising zero crossing

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Number of samples drawn after the trigger point.
const SCOPE_WINDOW: usize = 512;

/// First rising zero crossing that still leaves a full window after it.
fn trigger_point(samples: &[f32]) -> usize {
    let last_start = samples.len().saturating_sub(SCOPE_WINDOW);
    samples
        .windows(2)
        .take(last_start)
        .position(|pair| pair[0] <= 0.0 && pair[1] > 0.0)
        .map_or(0, |i| i + 1)
}

/// The vertical range grows past ±1 when the output does, so resonant
/// settings stay on screen.
pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32]) {
    let start = trigger_point(audio_buffer);
    let shown = &audio_buffer[start..audio_buffer.len().min(start + SCOPE_WINDOW)];

    let peak = shown.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    let range = peak.max(1.0) as f64;

    let data: Vec<(f64, f64)> = shown
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64, sample as f64))
        .collect();

    let chart = Chart::new(vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)])
    .block(
        Block::default()
            .title(format!(" Output  peak {peak:.2} "))
            .borders(Borders::ALL),
    )
    .x_axis(Axis::default().bounds([0.0, SCOPE_WINDOW as f64]))
    .y_axis(
        Axis::default()
            .bounds([-range, range])
            .labels(vec![format!("{:.1}", -range), "0".to_string(), format!("{range:.1}")])
            .style(Style::default().fg(Color::DarkGray)),
    );

    frame.render_widget(chart, area);
}
