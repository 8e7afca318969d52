//! Dimension sliders, status line and response curves

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame,
};

use timbre_dsp::{timbre::Dimension, DIMENSION_STEPS};

use super::VoiceStatus;

pub fn render_status(frame: &mut Frame, area: Rect, status: Option<&VoiceStatus>, held: Option<u8>) {
    let block = Block::default().title(" timbre ").borders(Borders::ALL);

    let line = match status {
        Some(status) => {
            let note = match (held, status.note) {
                (_, Some(note)) => format!("note {note}"),
                (Some(note), None) => format!("note {note} (pending)"),
                (None, None) => "idle".to_string(),
            };
            let mode = if status.advanced {
                Span::styled(
                    format!(" ADV {} ", status.algorithm.name()),
                    Style::default().fg(Color::Black).bg(Color::Yellow),
                )
            } else {
                Span::raw("")
            };
            Line::from(vec![
                Span::styled(format!(" {note}  "), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{:.1} Hz  ", status.frequency)),
                Span::styled(
                    format!("{:?} {:.2}  ", status.envelope_state, status.envelope_level),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(format!(
                    "A {:.0} ms  D {:.0} ms  ",
                    status.attack_time * 1000.0,
                    status.decay_time * 1000.0
                )),
                Span::raw(format!(
                    "Br {:.0} Hz Q {:.2}  Ar {:.0} Hz ",
                    status.brightness_cutoff, status.brightness_q, status.articulation_cutoff
                )),
                mode,
            ])
        }
        None => Line::from(" waiting for audio..."),
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_dimensions(frame: &mut Frame, area: Rect, values: &[u8; 4], selected: Dimension) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 4])
        .margin(1)
        .split(area);
    frame.render_widget(Block::default().title(" Dimensions ").borders(Borders::ALL), area);

    for (dimension, row) in Dimension::ALL.iter().zip(rows.iter()) {
        let value = values[dimension.index()];
        let mut style = Style::default().fg(Color::Blue);
        if *dimension == selected {
            style = style.fg(Color::LightCyan).add_modifier(Modifier::BOLD);
        }
        let ratio = value as f64 / (DIMENSION_STEPS - 1) as f64;
        let gauge = Gauge::default()
            .gauge_style(style)
            .ratio(ratio)
            .label(format!("{:<12} {:>3}", dimension.name(), value));
        frame.render_widget(gauge, *row);
    }
}

/// Plot a 0..1 curve sampled at evenly spaced points.
pub fn render_curve(frame: &mut Frame, area: Rect, title: &str, points: &[f32], color: Color) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);

    let last = points.len().saturating_sub(1).max(1) as f64;
    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, &y)| (i as f64 / last, y as f64))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
