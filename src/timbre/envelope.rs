#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::envelope::{Adsr, EnvelopeState};
use crate::DIMENSION_STEPS;

use super::DIMENSION_CENTER;

const MIN_TIME_MS: f32 = 5.0;
const MAX_TIME_MS: f32 = 291.0;
const DEFAULT_RELEASE: f32 = 0.01;
const SUSTAIN_LEVEL: f32 = 0.9;

/// Values at or above this hold a sustained note; below it every note plays
/// for a fixed attack + decay regardless of how long the key is held.
pub const SUSTAIN_THRESHOLD: u8 = (DIMENSION_STEPS as f32 * 0.4) as u8;

/// Advanced-mode replacements for the table-driven envelope.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvelopeOverrides {
    /// Decay time in seconds.
    pub decay: Option<f32>,
    /// Sustain level; setting one always makes the note sustained.
    pub sustain: Option<f32>,
    /// Release time in seconds.
    pub release: Option<f32>,
}

impl EnvelopeOverrides {
    /// Fields present in `other` replace ours.
    fn merge(&mut self, other: &EnvelopeOverrides) {
        if other.decay.is_some() {
            self.decay = other.decay;
        }
        if other.sustain.is_some() {
            self.sustain = other.sustain;
        }
        if other.release.is_some() {
            self.release = other.release;
        }
    }
}

/// Shapes an [`Adsr`] from the envelope dimension: low values give short,
/// plucked notes; high values slow the attack, shorten the decay and hold.
pub struct EnvelopeMapper {
    adsr: Adsr,
    attack_table: [f32; DIMENSION_STEPS],
    decay_table: [f32; DIMENSION_STEPS],

    value: u8,
    advanced: bool,
    overrides: EnvelopeOverrides,
}

impl EnvelopeMapper {
    pub fn new(sample_rate: f32) -> Self {
        let mut attack_table = [0.0; DIMENSION_STEPS];
        let mut decay_table = [0.0; DIMENSION_STEPS];
        let span = MAX_TIME_MS - MIN_TIME_MS;
        for value in 0..DIMENSION_STEPS {
            let curve = span.powf(value as f32 / DIMENSION_STEPS as f32);
            attack_table[value] = (MIN_TIME_MS + curve) * 0.001;
            decay_table[value] = (MAX_TIME_MS - curve) * 0.001;
        }

        let mut mapper = Self {
            adsr: Adsr::new(sample_rate),
            attack_table,
            decay_table,
            value: DIMENSION_CENTER,
            advanced: false,
            overrides: EnvelopeOverrides::default(),
        };
        mapper.apply();
        mapper
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.adsr.set_sample_rate(sample_rate);
    }

    /// Select a new envelope value. No-op when unchanged.
    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.value = value;
        self.apply();
    }

    /// Leaving advanced mode drops every override.
    pub fn set_advanced_mode(&mut self, advanced: bool) {
        if self.advanced == advanced {
            return;
        }
        self.advanced = advanced;
        if !advanced {
            self.overrides = EnvelopeOverrides::default();
            self.apply();
        }
    }

    /// Merge `overrides` into the active set. Ignored outside advanced mode.
    pub fn set_advanced(&mut self, overrides: &EnvelopeOverrides) {
        if !self.advanced {
            return;
        }
        self.overrides.merge(overrides);
        self.apply();
    }

    fn apply(&mut self) {
        let index = self.value as usize;
        self.adsr.set_attack(self.attack_table[index]);
        self.adsr
            .set_decay(self.overrides.decay.unwrap_or(self.decay_table[index]));
        self.adsr
            .set_release(self.overrides.release.unwrap_or(DEFAULT_RELEASE));

        let sustained = self.overrides.sustain.is_some() || self.value >= SUSTAIN_THRESHOLD;
        self.adsr.set_fixed_duration(!sustained);
        if sustained {
            self.adsr
                .set_sustain(self.overrides.sustain.unwrap_or(SUSTAIN_LEVEL));
        }
    }

    #[inline]
    pub fn process(&mut self, note_on: bool) -> f32 {
        self.adsr.process(note_on)
    }

    pub fn reset(&mut self) {
        self.adsr.reset();
    }

    /// Whether a note is sounding.
    pub fn is_active(&self) -> bool {
        self.adsr.is_active()
    }

    pub fn state(&self) -> EnvelopeState {
        self.adsr.state()
    }

    pub fn level(&self) -> f32 {
        self.adsr.level()
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn attack_time(&self) -> f32 {
        self.adsr.attack_time()
    }

    pub fn decay_time(&self) -> f32 {
        self.adsr.decay_time()
    }

    pub fn overrides(&self) -> &EnvelopeOverrides {
        &self.overrides
    }

    pub fn adsr(&self) -> &Adsr {
        &self.adsr
    }
}
