use crate::dsp::filter::{Biquad, FilterType, RESPONSE_POINTS};
use crate::DIMENSION_STEPS;

use super::{FilterZone, ZoneLayout, DIMENSION_CENTER};

/*
Articulation
============

A cutoff sweep restarted on every note. Below the dead zone a low-pass opens
from the note frequency up to 20 kHz; above it a high-pass closes from 20 kHz
down onto the note. The further from the center, the slower the sweep:

    sweep time   5 ms at the zone edge … 600 ms at the range end
    growth       g = 19950^(1 / (sr · sweep))     (low-pass)
                 g = 19950^(−1 / (sr · sweep))    (high-pass)

Each filtered sample multiplies the accumulator by g and retunes:

    cutoff = note + 50 + accumulator

The low-pass accumulator starts at 1 and reaches 19950 after one sweep time,
at which point the filter is switched out. The high-pass one starts at 19950
and decays toward 1.
*/

const MIN_SWEEP_MS: f32 = 5.0;
const MAX_SWEEP_MS: f32 = 600.0;
const MIN_CUTOFF_HZ: f32 = 50.0;
const MAX_CUTOFF_HZ: f32 = 20_000.0;
const SWEEP_SPAN: f32 = MAX_CUTOFF_HZ - MIN_CUTOFF_HZ;
const DEFAULT_Q: f32 = 1.0;

pub struct ArticulationMapper {
    layout: ZoneLayout,
    growth_table: [f32; DIMENSION_STEPS],
    sample_rate: f32,

    value: u8,
    zone: FilterZone,
    growth: f32,

    frequency: f32,
    accumulator: f32,
    cutoff: f32,
    q: f32,
    advanced: bool,

    filter: Biquad,
}

impl ArticulationMapper {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self::with_layout(sample_rate, frequency, ZoneLayout::default())
    }

    pub fn with_layout(sample_rate: f32, frequency: f32, layout: ZoneLayout) -> Self {
        let growth_table = build_growth_table(&layout, sample_rate);
        let mut mapper = Self {
            layout,
            growth_table,
            sample_rate,
            value: DIMENSION_CENTER,
            zone: layout.zone(DIMENSION_CENTER),
            growth: growth_table[DIMENSION_CENTER as usize],
            frequency,
            accumulator: 1.0,
            cutoff: 0.0,
            q: DEFAULT_Q,
            advanced: false,
            filter: Biquad::new(sample_rate),
        };
        mapper.reset();
        mapper
    }

    /// Rebuilds the growth table, which depends on the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.growth_table = build_growth_table(&self.layout, sample_rate);
        self.growth = self.growth_table[self.value as usize];
        self.filter.set_sample_rate(sample_rate);
    }

    /// Note frequency the sweep is relative to.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Select a new articulation value. Takes effect on the running sweep;
    /// the accumulator is only rewound by [`ArticulationMapper::reset`].
    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.value = value;
        self.zone = self.layout.zone(value);
        self.growth = self.growth_table[value as usize];
    }

    pub fn set_advanced_mode(&mut self, advanced: bool) {
        self.advanced = advanced;
        if !advanced {
            self.q = DEFAULT_Q;
        }
    }

    /// Filter Q. Ignored outside advanced mode.
    pub fn set_q(&mut self, q: f32) {
        if self.advanced {
            self.q = q;
        }
    }

    /// Restart the sweep, e.g. on a new note.
    pub fn reset(&mut self) {
        self.filter.reset();
        if self.zone == FilterZone::HighPass {
            self.accumulator = SWEEP_SPAN;
            self.cutoff = MAX_CUTOFF_HZ;
        } else {
            self.accumulator = 1.0;
            self.cutoff = 0.0;
        }
    }

    fn sweep_finished(&self) -> bool {
        match self.zone {
            FilterZone::LowPass => self.cutoff >= MAX_CUTOFF_HZ,
            FilterZone::HighPass => self.cutoff <= MIN_CUTOFF_HZ + 1.0,
            FilterZone::AllPass => true,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let Some(filter_type) = self.zone.filter_type() else {
            return input;
        };
        if self.sweep_finished() {
            return input;
        }

        self.accumulator *= self.growth;
        // A settled high-pass keeps filtering at the note; stop the
        // accumulator before it decays into denormals.
        if filter_type == FilterType::HighPass {
            self.accumulator = self.accumulator.max(1.0);
        }

        let cutoff = self.frequency + MIN_CUTOFF_HZ + self.accumulator;
        let unchanged = self.filter.is_ready()
            && cutoff == self.cutoff
            && self.filter.q() == self.q
            && self.filter.filter_type() == filter_type;
        self.cutoff = cutoff;
        if !unchanged {
            self.filter.set_params(cutoff, self.q, filter_type);
        }

        self.filter.process(input)
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn zone(&self) -> FilterZone {
        self.zone
    }

    /// Per-sample growth factor of the current sweep.
    pub fn growth_factor(&self) -> f32 {
        self.growth
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn filter(&self) -> &Biquad {
        &self.filter
    }

    /// Sweep trajectory over the longest sweep time, normalized to 0..1.
    /// Flat at 1 while bypassed.
    pub fn cutoff_curve(&self) -> [f32; RESPONSE_POINTS] {
        let mut curve = [1.0; RESPONSE_POINTS];
        if self.zone == FilterZone::AllPass {
            return curve;
        }

        for (i, point) in curve.iter_mut().enumerate() {
            let samples =
                (i as f32 / RESPONSE_POINTS as f32) * MAX_SWEEP_MS * 0.001 * self.sample_rate;
            let value = self.growth.powf(samples);
            *point = match self.zone {
                FilterZone::LowPass if value < MAX_CUTOFF_HZ => value / MAX_CUTOFF_HZ,
                FilterZone::LowPass => 1.0,
                _ => value,
            };
        }
        curve
    }
}

fn build_growth_table(layout: &ZoneLayout, sample_rate: f32) -> [f32; DIMENSION_STEPS] {
    let lp = layout.low_pass_max as f32;
    let hp = layout.high_pass_min as f32;
    let mut table = [0.0; DIMENSION_STEPS];

    for (value, entry) in table.iter_mut().enumerate() {
        let v = value as f32;
        let sweep_ms = match layout.zone(value as u8) {
            FilterZone::LowPass => {
                let position = if lp > 0.0 { (lp - v) / lp } else { 0.0 };
                MIN_SWEEP_MS + (MAX_SWEEP_MS - MIN_SWEEP_MS) * position
            }
            FilterZone::HighPass => {
                let span = DIMENSION_STEPS as f32 - hp;
                let position = if span > 0.0 { (v - hp) / span } else { 0.0 };
                MIN_SWEEP_MS + (MAX_SWEEP_MS - MIN_SWEEP_MS) * position
            }
            FilterZone::AllPass => continue,
        };

        let growth = SWEEP_SPAN.powf(1.0 / (sample_rate * sweep_ms * 0.001));
        *entry = if layout.zone(value as u8) == FilterZone::HighPass {
            1.0 / growth
        } else {
            growth
        };
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    fn mapper(value: u8) -> ArticulationMapper {
        let mut m = ArticulationMapper::new(SAMPLE_RATE, 440.0);
        m.update(value);
        m.reset();
        m
    }

    fn sweep_ms(m: &ArticulationMapper) -> f32 {
        let samples = SWEEP_SPAN.ln() / m.growth_factor().ln().abs();
        samples / SAMPLE_RATE * 1000.0
    }

    #[test]
    fn sweep_times_span_the_zone() {
        assert!((sweep_ms(&mapper(115)) - 5.0).abs() < 0.05);
        assert!((sweep_ms(&mapper(0)) - 600.0).abs() < 0.5);
        assert!((sweep_ms(&mapper(140)) - 5.0).abs() < 0.05);

        let top = sweep_ms(&mapper(255));
        let expected = 5.0 + 595.0 * 115.0 / 116.0;
        assert!((top - expected).abs() < 0.5, "{}", top);
    }

    #[test]
    fn low_pass_growth_above_one_high_pass_below() {
        assert!(mapper(40).growth_factor() > 1.0);
        assert!(mapper(200).growth_factor() < 1.0);
    }

    #[test]
    fn center_bypasses() {
        let mut m = ArticulationMapper::new(SAMPLE_RATE, 440.0);
        assert_eq!(m.zone(), FilterZone::AllPass);
        assert_eq!(m.process(0.3), 0.3);
        assert!(m.cutoff_curve().iter().all(|&p| p == 1.0));
    }

    #[test]
    fn reset_positions_each_sweep() {
        let m = mapper(40);
        assert_eq!(m.cutoff(), 0.0);

        let m = mapper(200);
        assert_eq!(m.cutoff(), 20_000.0);
    }

    #[test]
    fn low_pass_opens_then_switches_out() {
        let mut m = mapper(115);
        m.process(0.0);
        let first = m.cutoff();
        assert!(first > 490.0 && first < 500.0);

        // 5 ms sweep at 44.1 kHz, plus slack
        for _ in 0..300 {
            m.process(0.0);
        }
        assert!(m.cutoff() >= 20_000.0);
        let before = m.cutoff();
        assert_eq!(m.process(0.7), 0.7);
        assert_eq!(m.cutoff(), before);
    }

    #[test]
    fn high_pass_closes_onto_the_note() {
        let mut m = mapper(140);
        let mut last = m.cutoff();
        for _ in 0..2_000 {
            let out = m.process(0.1);
            assert!(out.is_finite());
            assert!(m.cutoff() <= last);
            last = m.cutoff();
        }
        assert!((m.cutoff() - 491.0).abs() < 1e-3);
    }

    #[test]
    fn q_is_advanced_only() {
        let mut m = mapper(40);
        m.set_q(3.0);
        assert_eq!(m.q(), 1.0);

        m.set_advanced_mode(true);
        m.set_q(3.0);
        m.process(0.0);
        assert_eq!(m.filter().q(), 3.0);

        m.set_advanced_mode(false);
        assert_eq!(m.q(), 1.0);
    }

    #[test]
    fn sample_rate_change_rebuilds_growth() {
        let mut m = mapper(40);
        let before = m.growth_factor();
        m.set_sample_rate(SAMPLE_RATE * 2.0);
        assert!(m.growth_factor() < before);
        assert!(m.growth_factor() > 1.0);
    }

    #[test]
    fn curve_is_normalized() {
        let lp = mapper(100).cutoff_curve();
        assert!(lp.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert_eq!(lp[RESPONSE_POINTS - 1], 1.0);

        let hp = mapper(200).cutoff_curve();
        assert_eq!(hp[0], 1.0);
        assert!(hp.windows(2).all(|w| w[1] <= w[0]));
    }
}
