use crate::dsp::filter::{Biquad, RESPONSE_POINTS};
use crate::DIMENSION_STEPS;

use super::{FilterZone, ZoneLayout, DIMENSION_CENTER};

/*
Brightness
==========

A fixed filter whose cutoff follows the brightness value.

    0 ─────────── 115 │ 116 ── 139 │ 140 ─────────── 255
      low-pass         all-pass      high-pass
      cutoff 50 Hz →   (bypassed)    cutoff 0 Hz →
      20 kHz                         15 kHz

Both halves are exponential, so equal steps sound like equal changes:

    low-pass   table[v] = 50 + 19950^(v / 115)
    high-pass  table[v] = 15000^((v − 140) / 116)

Cutoffs are relative to the note: while linked (the default), the note
frequency is added to the table value, so brightness keeps the same character
across the keyboard. The first ten high-pass steps fade the cutoff in
linearly from 0 so leaving the dead zone does not jump.
*/

const MIN_LOW_PASS_HZ: f32 = 50.0;
const MAX_LOW_PASS_HZ: f32 = 20_000.0;
const MAX_HIGH_PASS_HZ: f32 = 15_000.0;
const HIGH_PASS_FADE_STEPS: u8 = 10;
const DEFAULT_Q: f32 = 1.0;
// Lowest cutoff handed to the biquad; a true 0 Hz high-pass puts a double
// pole on the unit circle.
const MIN_FILTER_HZ: f32 = 1.0;

pub struct BrightnessMapper {
    layout: ZoneLayout,
    table: [f32; DIMENSION_STEPS],

    value: u8,
    zone: FilterZone,
    cutoff: f32,

    frequency: f32,
    note_q: f32, // resonance supplied with the note
    q: f32,      // resonance in use
    note_link: bool,
    advanced: bool,

    filter: Biquad,
}

impl BrightnessMapper {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self::with_layout(sample_rate, frequency, ZoneLayout::default())
    }

    pub fn with_layout(sample_rate: f32, frequency: f32, layout: ZoneLayout) -> Self {
        let mut mapper = Self {
            layout,
            table: build_table(&layout),
            value: DIMENSION_CENTER,
            zone: layout.zone(DIMENSION_CENTER),
            cutoff: 0.0,
            frequency,
            note_q: DEFAULT_Q,
            q: DEFAULT_Q,
            note_link: true,
            advanced: false,
            filter: Biquad::new(sample_rate),
        };
        mapper.retune();
        mapper
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.filter.set_sample_rate(sample_rate);
    }

    /// Select a new brightness value. No-op when unchanged.
    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.value = value;
        self.zone = self.layout.zone(value);
        self.retune();
    }

    /// Note frequency and the resonance that came with it.
    pub fn set_note(&mut self, frequency: f32, q: f32) {
        self.frequency = frequency;
        self.note_q = q;
        if self.note_link {
            self.q = q;
        }
        self.retune();
    }

    /// Entering advanced mode keeps the current settings; leaving it
    /// relinks the cutoff and Q to the note.
    pub fn set_advanced_mode(&mut self, advanced: bool) {
        if self.advanced == advanced {
            return;
        }
        self.advanced = advanced;
        if !advanced {
            self.note_link = true;
            self.q = self.note_q;
            self.retune();
        }
    }

    /// Explicit note link and Q. Ignored outside advanced mode. An explicit
    /// Q only takes effect while unlinked; relinking restores the note's Q.
    pub fn set_advanced(&mut self, note_link: Option<bool>, q: Option<f32>) {
        if !self.advanced {
            return;
        }
        if let Some(link) = note_link {
            self.note_link = link;
            if link {
                self.q = self.note_q;
            }
        }
        if let Some(q) = q {
            if !self.note_link {
                self.q = q;
            }
        }
        self.retune();
    }

    fn retune(&mut self) {
        let table_value = self.table[self.value as usize];
        let target = if self.note_link {
            self.frequency + table_value
        } else {
            table_value
        };

        let fade_end = self.layout.high_pass_min.saturating_add(HIGH_PASS_FADE_STEPS);
        self.cutoff = if self.value >= self.layout.high_pass_min && self.value < fade_end {
            0.1 * (self.value - self.layout.high_pass_min) as f32 * target
        } else {
            target
        };

        let Some(filter_type) = self.zone.filter_type() else {
            return;
        };
        let cutoff = self.cutoff.max(MIN_FILTER_HZ);
        let unchanged = self.filter.is_ready()
            && self.filter.cutoff() == cutoff
            && self.filter.q() == self.q
            && self.filter.filter_type() == filter_type;
        if !unchanged {
            self.filter.set_params(cutoff, self.q, filter_type);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.zone == FilterZone::AllPass {
            input
        } else {
            self.filter.process(input)
        }
    }

    /// Clear filter history, e.g. on a new note.
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn zone(&self) -> FilterZone {
        self.zone
    }

    /// Target cutoff in Hz (0 in the all-pass zone when unlinked).
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn is_note_linked(&self) -> bool {
        self.note_link
    }

    pub fn table(&self) -> &[f32; DIMENSION_STEPS] {
        &self.table
    }

    pub fn filter(&self) -> &Biquad {
        &self.filter
    }

    /// Frequency response on the 0..1 display scale; flat at unity gain
    /// while bypassed.
    pub fn magnitude_response_db(&self) -> [f32; RESPONSE_POINTS] {
        if self.zone == FilterZone::AllPass {
            [0.75; RESPONSE_POINTS]
        } else {
            self.filter.magnitude_response_db()
        }
    }
}

fn build_table(layout: &ZoneLayout) -> [f32; DIMENSION_STEPS] {
    let mut table = [0.0; DIMENSION_STEPS];
    for (value, entry) in table.iter_mut().enumerate() {
        let value = value as u8;
        *entry = match layout.zone(value) {
            FilterZone::LowPass => {
                let span = MAX_LOW_PASS_HZ - MIN_LOW_PASS_HZ;
                MIN_LOW_PASS_HZ + span.powf(layout.low_pass_position(value))
            }
            FilterZone::HighPass => MAX_HIGH_PASS_HZ.powf(layout.high_pass_position(value)),
            FilterZone::AllPass => 0.0,
        };
    }
    table
}
