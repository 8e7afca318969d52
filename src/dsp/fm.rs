#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::operator::Operator;
use super::wavetable::{WavetableBank, Waveshape};

/*
Operator network
================

Four operators, numbered 0..3. Operator 0 is always a carrier. Arrows read
"modulates"; operators in brackets are summed as carriers.

  Additive           [0] [1] [2] [3]                       × 1/4
  TwoStacks          1 → [0]     3 → [2]                   × 1/2
  PairPlusStack      [0] [1]     3 → [2]                   × 1/3
  SharedModulator    3 → [0] [1] [2]                       × 1/3
  BranchedStack      2 → 1 → [0] ← 3                       (raw op0)
  MergedStack        (2 + 3) → 1 → [0]                     (raw op0)
  FourStack          3 → 2 → 1 → [0]                       × amp0

The scale factors keep loudness roughly level across topologies with
different carrier counts. Each modulator's `modulation_phase` is polled once
per sample, deepest modulator first, so its first-difference state advances
in lockstep with the carriers it feeds.
*/

pub const NUM_OPERATORS: usize = 4;

/// Modulation topology of an [`OperatorNetwork`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FmAlgorithm {
    #[default]
    Additive,
    TwoStacks,
    PairPlusStack,
    SharedModulator,
    BranchedStack,
    MergedStack,
    FourStack,
}

impl FmAlgorithm {
    pub const ALL: [FmAlgorithm; 7] = [
        FmAlgorithm::Additive,
        FmAlgorithm::TwoStacks,
        FmAlgorithm::PairPlusStack,
        FmAlgorithm::SharedModulator,
        FmAlgorithm::BranchedStack,
        FmAlgorithm::MergedStack,
        FmAlgorithm::FourStack,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Out-of-range indices fall back to additive.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            FmAlgorithm::Additive => "additive",
            FmAlgorithm::TwoStacks => "two stacks",
            FmAlgorithm::PairPlusStack => "pair + stack",
            FmAlgorithm::SharedModulator => "shared modulator",
            FmAlgorithm::BranchedStack => "branched stack",
            FmAlgorithm::MergedStack => "merged stack",
            FmAlgorithm::FourStack => "four stack",
        }
    }
}

/// Complete operator-network configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmPatch {
    pub algorithm: FmAlgorithm,
    pub amplitudes: [f32; NUM_OPERATORS],
    pub ratios: [f32; NUM_OPERATORS],
    pub waveshapes: [Waveshape; NUM_OPERATORS],
}

impl Default for FmPatch {
    fn default() -> Self {
        Self {
            algorithm: FmAlgorithm::Additive,
            amplitudes: [1.0; NUM_OPERATORS],
            ratios: [1.0; NUM_OPERATORS],
            waveshapes: [Waveshape::Sine; NUM_OPERATORS],
        }
    }
}

pub struct OperatorNetwork {
    operators: [Operator; NUM_OPERATORS],
    frequency: f32,
    patch: FmPatch,
}

impl OperatorNetwork {
    pub fn new(bank: WavetableBank, sample_rate: f32, frequency: f32) -> Self {
        let operators = std::array::from_fn(|_| Operator::new(bank.clone(), sample_rate));
        let mut network = Self {
            operators,
            frequency,
            patch: FmPatch::default(),
        };
        network.apply_patch(&FmPatch::default());
        network
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for op in self.operators.iter_mut() {
            op.set_sample_rate(sample_rate);
        }
    }

    /// Move the base frequency; every operator follows at its retained ratio.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        for (op, ratio) in self.operators.iter_mut().zip(self.patch.ratios) {
            op.set_frequency(ratio * frequency);
        }
    }

    pub fn set_algorithm(&mut self, algorithm: FmAlgorithm) {
        self.patch.algorithm = algorithm;
    }

    /// Update amplitude, frequency ratio and waveshape of all four operators.
    pub fn set_spectrum(
        &mut self,
        amplitudes: [f32; NUM_OPERATORS],
        ratios: [f32; NUM_OPERATORS],
        waveshapes: [Waveshape; NUM_OPERATORS],
    ) {
        self.patch.amplitudes = amplitudes;
        self.patch.ratios = ratios;
        self.patch.waveshapes = waveshapes;

        for (i, op) in self.operators.iter_mut().enumerate() {
            op.set_parameters(amplitudes[i], ratios[i] * self.frequency, waveshapes[i]);
        }
    }

    /// Update a single operator, leaving the others untouched.
    pub fn set_operator(&mut self, index: usize, amplitude: f32, ratio: f32, shape: Waveshape) {
        let Some(op) = self.operators.get_mut(index) else {
            return;
        };
        self.patch.amplitudes[index] = amplitude;
        self.patch.ratios[index] = ratio;
        self.patch.waveshapes[index] = shape;
        op.set_parameters(amplitude, ratio * self.frequency, shape);
    }

    pub fn apply_patch(&mut self, patch: &FmPatch) {
        self.set_spectrum(patch.amplitudes, patch.ratios, patch.waveshapes);
        self.set_algorithm(patch.algorithm);
    }

    pub fn patch(&self) -> &FmPatch {
        &self.patch
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn operator(&self, index: usize) -> Option<&Operator> {
        self.operators.get(index)
    }

    pub fn reset(&mut self) {
        for op in self.operators.iter_mut() {
            op.reset();
        }
    }

    /// Next sample of the combined waveform.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let [op0, op1, op2, op3] = &mut self.operators;

        match self.patch.algorithm {
            FmAlgorithm::Additive => {
                let sum = op0.amplitude() * op0.process(0.0)
                    + op1.amplitude() * op1.process(0.0)
                    + op2.amplitude() * op2.process(0.0)
                    + op3.amplitude() * op3.process(0.0);
                sum * 0.25
            }
            FmAlgorithm::TwoStacks => {
                let mod1 = op1.modulation_phase(0.0);
                let left = op0.amplitude() * op0.process(mod1);
                let mod3 = op3.modulation_phase(0.0);
                let right = op2.amplitude() * op2.process(mod3);
                (left + right) * 0.5
            }
            FmAlgorithm::PairPlusStack => {
                let dry = op0.amplitude() * op0.process(0.0) + op1.amplitude() * op1.process(0.0);
                let mod3 = op3.modulation_phase(0.0);
                let stacked = op2.amplitude() * op2.process(mod3);
                (dry + stacked) * 0.333
            }
            FmAlgorithm::SharedModulator => {
                let modulation = op3.modulation_phase(0.0);
                let sum = op0.amplitude() * op0.process(modulation)
                    + op1.amplitude() * op1.process(modulation)
                    + op2.amplitude() * op2.process(modulation);
                sum * 0.333
            }
            FmAlgorithm::BranchedStack => {
                let mod3 = op3.modulation_phase(0.0);
                let mod2 = op2.modulation_phase(0.0);
                let mod1 = op1.modulation_phase(mod2);
                op0.process(mod3 + mod1)
            }
            FmAlgorithm::MergedStack => {
                let mod2 = op2.modulation_phase(0.0);
                let mod3 = op3.modulation_phase(0.0);
                let mod1 = op1.modulation_phase(mod2 + mod3);
                op0.process(mod1)
            }
            FmAlgorithm::FourStack => {
                let mod3 = op3.modulation_phase(0.0);
                let mod2 = op2.modulation_phase(mod3);
                let mod1 = op1.modulation_phase(mod2);
                op0.amplitude() * op0.process(mod1)
            }
        }
    }

    /// Fill `buffer` with consecutive samples.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn network() -> OperatorNetwork {
        OperatorNetwork::new(WavetableBank::new(), SAMPLE_RATE, 440.0)
    }

    fn lone_carrier(algorithm: FmAlgorithm) -> FmPatch {
        FmPatch {
            algorithm,
            amplitudes: [1.0, 0.0, 0.0, 0.0],
            ..FmPatch::default()
        }
    }

    #[test]
    fn frequency_change_keeps_ratios() {
        let mut net = network();
        net.set_spectrum([1.0; 4], [1.0, 2.0, 3.5, 0.5], [Waveshape::Sine; 4]);
        net.set_frequency(100.0);

        let freqs: Vec<f32> = (0..NUM_OPERATORS)
            .filter_map(|i| net.operator(i).map(Operator::frequency))
            .collect();
        assert_eq!(freqs, vec![100.0, 200.0, 350.0, 50.0]);
    }

    #[test]
    fn additive_scales_by_a_quarter() {
        let mut net = network();
        net.apply_patch(&FmPatch {
            amplitudes: [4.0, 0.0, 0.0, 0.0],
            ..FmPatch::default()
        });

        let mut reference = Operator::new(WavetableBank::new(), SAMPLE_RATE);
        reference.set_parameters(4.0, 440.0, Waveshape::Sine);

        for _ in 0..256 {
            let expected = reference.process(0.0);
            assert!((net.process() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn silent_modulators_leave_carrier_unmodulated() {
        let mut reference = Operator::new(WavetableBank::new(), SAMPLE_RATE);
        reference.set_parameters(1.0, 440.0, Waveshape::Sine);
        let expected: Vec<f32> = (0..256).map(|_| reference.process(0.0)).collect();

        for algorithm in [
            FmAlgorithm::FourStack,
            FmAlgorithm::BranchedStack,
            FmAlgorithm::MergedStack,
        ] {
            let mut net = network();
            net.apply_patch(&lone_carrier(algorithm));
            for (i, &want) in expected.iter().enumerate() {
                let got = net.process();
                assert!(
                    (got - want).abs() < 1e-5,
                    "{} diverged at sample {}: {} vs {}",
                    algorithm.name(),
                    i,
                    got,
                    want
                );
            }
        }
    }

    #[test]
    fn modulation_changes_the_waveform() {
        let mut plain = network();
        plain.apply_patch(&lone_carrier(FmAlgorithm::FourStack));

        let mut modulated = network();
        modulated.apply_patch(&FmPatch {
            algorithm: FmAlgorithm::FourStack,
            amplitudes: [1.0, 1.0, 0.0, 0.0],
            ratios: [1.0, 2.0, 1.0, 1.0],
            waveshapes: [Waveshape::Sine; 4],
        });

        let difference: f32 = (0..512)
            .map(|_| (plain.process() - modulated.process()).abs())
            .sum();
        assert!(difference > 1.0, "modulator had no audible effect");
    }

    #[test]
    fn every_algorithm_stays_bounded() {
        for algorithm in FmAlgorithm::ALL {
            let mut net = network();
            net.apply_patch(&FmPatch {
                algorithm,
                amplitudes: [1.0; 4],
                ratios: [1.0, 2.0, 3.0, 0.5],
                waveshapes: [Waveshape::Sine, Waveshape::Saw, Waveshape::Square, Waveshape::Triangle],
            });
            for _ in 0..4096 {
                let out = net.process();
                assert!(out.is_finite() && out.abs() <= 4.0, "{} produced {}", algorithm.name(), out);
            }
        }
    }

    #[test]
    fn set_operator_touches_one_slot() {
        let mut net = network();
        net.set_operator(2, 0.5, 3.0, Waveshape::Square);
        net.set_operator(9, 0.5, 3.0, Waveshape::Square);

        let patch = net.patch();
        assert_eq!(patch.amplitudes, [1.0, 1.0, 0.5, 1.0]);
        assert_eq!(patch.ratios, [1.0, 1.0, 3.0, 1.0]);
        assert_eq!(patch.waveshapes[2], Waveshape::Square);
    }

    #[test]
    fn algorithm_index_round_trips() {
        for algorithm in FmAlgorithm::ALL {
            assert_eq!(FmAlgorithm::from_index(algorithm.index()), algorithm);
        }
        assert_eq!(FmAlgorithm::from_index(42), FmAlgorithm::Additive);
    }
}
