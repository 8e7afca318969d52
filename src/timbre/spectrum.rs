#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::fm::{FmAlgorithm, FmPatch, OperatorNetwork, NUM_OPERATORS};
use crate::dsp::wavetable::{WavetableBank, Waveshape};

use super::DIMENSION_CENTER;

/*
Spectrum
========

Walks from pure sine (dark) through a few tuned-percussion partial sets and
then crossfades through brighter wave shapes to a detuned saw stack:

      0 ─ 9     sine
     10 ─ 39    xylophone, marimba, timpani partials (sine operators)
     40 ─ 49    sine → triangle
     50 ─ 99    triangle → square
    100 ─ 199   square → saw
    200 ─ 255   saw, slowly detuning every operator upward

All zones run the network additively. The crossfades are linear in the
operator amplitudes, so neighbouring values give neighbouring mixes.
*/

/// Partial-set amplitudes and ratios for the three tuned-percussion zones.
const XYLOPHONE: ([f32; 4], [f32; 4]) = ([1.0, 0.8, 0.0, 0.0], [1.0, 3.0, 1.0, 1.0]);
const MARIMBA: ([f32; 4], [f32; 4]) = ([1.0, 0.8, 0.8, 0.0], [1.0, 4.0, 9.2, 1.0]);
const TIMPANI: ([f32; 4], [f32; 4]) = ([1.0, 0.8, 0.6, 0.4], [1.0, 1.5, 1.98, 2.44]);

const FULL_SCALE: f32 = 4.0;
const SAW_DETUNE_PER_STEP: f32 = 0.0002;

/// One operator's settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorSettings {
    pub amplitude: f32,
    pub ratio: f32,
    pub waveshape: Waveshape,
}

/// Direct network edits for advanced mode. `None` leaves that part alone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdvancedSpectrum {
    pub algorithm: Option<FmAlgorithm>,
    pub operators: [Option<OperatorSettings>; NUM_OPERATORS],
}

impl AdvancedSpectrum {
    /// Every field present, taken from `patch`.
    pub fn from_patch(patch: &FmPatch) -> Self {
        Self {
            algorithm: Some(patch.algorithm),
            operators: std::array::from_fn(|i| {
                Some(OperatorSettings {
                    amplitude: patch.amplitudes[i],
                    ratio: patch.ratios[i],
                    waveshape: patch.waveshapes[i],
                })
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none() && self.operators.iter().all(Option::is_none)
    }
}

/// Patch for a spectrum value outside advanced mode.
pub fn zone_patch(value: u8) -> FmPatch {
    use Waveshape::{Saw, Sine, Square, Triangle};

    let v = value as f32;
    let unity = [1.0; NUM_OPERATORS];
    let (amplitudes, ratios, waveshapes) = match value {
        200.. => {
            let ratio = 1.0 + (v - 200.0) * SAW_DETUNE_PER_STEP;
            ([FULL_SCALE, 0.0, 0.0, 0.0], [ratio; NUM_OPERATORS], [Saw, Saw, Saw, Sine])
        }
        100..=199 => {
            let e = (v - 100.0) * 0.04;
            ([e, FULL_SCALE - e, 0.0, 0.0], unity, [Saw, Square, Sine, Sine])
        }
        50..=99 => {
            let e = (v - 50.0) * 0.08;
            ([FULL_SCALE - e, e, 0.0, 0.0], unity, [Triangle, Square, Sine, Sine])
        }
        40..=49 => {
            let e = (v - 40.0) * 0.4;
            ([e, FULL_SCALE - e, 0.0, 0.0], unity, [Triangle, Sine, Sine, Sine])
        }
        30..=39 => (TIMPANI.0, TIMPANI.1, [Sine; NUM_OPERATORS]),
        20..=29 => (MARIMBA.0, MARIMBA.1, [Sine; NUM_OPERATORS]),
        10..=19 => (XYLOPHONE.0, XYLOPHONE.1, [Sine; NUM_OPERATORS]),
        _ => ([FULL_SCALE, 0.0, 0.0, 0.0], unity, [Sine; NUM_OPERATORS]),
    };

    FmPatch {
        algorithm: FmAlgorithm::Additive,
        amplitudes,
        ratios,
        waveshapes,
    }
}

pub struct SpectrumMapper {
    network: OperatorNetwork,
    value: u8,
    advanced: bool,
}

impl SpectrumMapper {
    pub fn new(bank: WavetableBank, sample_rate: f32, frequency: f32) -> Self {
        let mut network = OperatorNetwork::new(bank, sample_rate, frequency);
        network.apply_patch(&zone_patch(DIMENSION_CENTER));
        Self {
            network,
            value: DIMENSION_CENTER,
            advanced: false,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.network.set_sample_rate(sample_rate);
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.network.set_frequency(frequency);
    }

    /// Select a new spectrum value. The value is always recorded; the network
    /// only follows it outside advanced mode.
    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.value = value;
        if !self.advanced {
            self.network.apply_patch(&zone_patch(value));
        }
    }

    pub fn set_advanced_mode(&mut self, advanced: bool) {
        if self.advanced == advanced {
            return;
        }
        self.advanced = advanced;
        if !advanced {
            self.network.apply_patch(&zone_patch(self.value));
        }
    }

    /// Apply the present fields of `settings`. Ignored outside advanced mode.
    pub fn apply_advanced(&mut self, settings: &AdvancedSpectrum) {
        if !self.advanced {
            return;
        }
        if let Some(algorithm) = settings.algorithm {
            self.network.set_algorithm(algorithm);
        }
        for (index, op) in settings.operators.iter().enumerate() {
            if let Some(op) = op {
                self.network
                    .set_operator(index, op.amplitude, op.ratio, op.waveshape);
            }
        }
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        self.network.process()
    }

    pub fn reset(&mut self) {
        self.network.reset();
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn patch(&self) -> &FmPatch {
        self.network.patch()
    }

    pub fn network(&self) -> &OperatorNetwork {
        &self.network
    }
}
