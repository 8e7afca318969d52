use std::f32::consts::TAU;

use super::wavetable::{WavetableBank, Waveshape};

/*
Wavetable operator
==================

  phase       Read position into the current table, in samples, always kept in
              [0, table_len). Fractional: we interpolate between neighbours.

  increment   How far the phase moves per output sample with no modulation:
              frequency × table_len / sample_rate.

  modulation  Extra phase offset (in table samples) added on top of the
              increment for one call. Another operator's modulation phase is
              fed in here to build FM stacks.

When an operator acts as a modulator it does not hand its raw output to the
carrier. True phase modulation wants the integral of the modulating signal's
frequency deviation; we approximate it with the first difference of the
operator's own output, scaled to table units:

  modulation_phase = amplitude × table_len / 2π × (out[n] − out[n−1])

That needs `last_output`, so each modulator must be polled exactly once per
sample and in a fixed order. The network documents the order per algorithm.
*/

pub struct Operator {
    bank: WavetableBank,
    shape: Waveshape,
    table_len: f32,

    sample_rate: f32,
    frequency: f32,
    amplitude: f32,

    phase: f32,           // read position, [0, table_len)
    phase_increment: f32, // frequency * table_len / sample_rate
    mod_amplitude: f32,   // amplitude * table_len / 2π
    last_output: f32,     // previous modulation_phase sample
}

impl Operator {
    pub fn new(bank: WavetableBank, sample_rate: f32) -> Self {
        let mut op = Self {
            bank,
            shape: Waveshape::Sine,
            table_len: 0.0,
            sample_rate,
            frequency: 0.0,
            amplitude: 1.0,
            phase: 0.0,
            phase_increment: 0.0,
            mod_amplitude: 0.0,
            last_output: 0.0,
        };
        op.set_waveshape(Waveshape::Sine);
        op
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_derived();
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.update_derived();
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
        self.update_derived();
    }

    pub fn set_waveshape(&mut self, shape: Waveshape) {
        self.shape = shape;
        self.table_len = self.bank.table(shape).len() as f32;
        self.update_derived();
    }

    /// Set amplitude, frequency and table in one step.
    pub fn set_parameters(&mut self, amplitude: f32, frequency: f32, shape: Waveshape) {
        self.amplitude = amplitude;
        self.frequency = frequency;
        self.set_waveshape(shape);
    }

    fn update_derived(&mut self) {
        self.phase_increment = self.frequency * self.table_len / self.sample_rate;
        self.mod_amplitude = self.amplitude * self.table_len / TAU;
    }

    /// Rewind to the start of the table and forget the previous output.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.last_output = 0.0;
    }

    /// Advance by one sample plus `modulation` and return the interpolated
    /// table value. The amplitude is not applied here; it weights the output
    /// where the network mixes operators.
    #[inline]
    pub fn process(&mut self, modulation: f32) -> f32 {
        if self.table_len == 0.0 || self.amplitude == 0.0 {
            return 0.0;
        }

        let table = self.bank.table(self.shape);
        let len = self.table_len;

        self.phase += self.phase_increment + modulation;
        if !(0.0..len).contains(&self.phase) {
            if self.phase.is_finite() {
                // Handles any number of whole cycles in one step
                self.phase = self.phase.rem_euclid(len);
                if self.phase >= len {
                    self.phase = 0.0;
                }
            } else {
                self.phase = 0.0;
            }
        }

        let below = self.phase as usize;
        let above = if below + 1 >= table.len() { 0 } else { below + 1 };
        let frac = self.phase - below as f32;

        table[below] * (1.0 - frac) + table[above] * frac
    }

    /// Advance like [`Operator::process`] and return this operator's phase
    /// contribution to a carrier.
    #[inline]
    pub fn modulation_phase(&mut self, modulation: f32) -> f32 {
        if self.table_len == 0.0 || self.amplitude == 0.0 {
            return 0.0;
        }

        let value = self.process(modulation);
        let delta = value - self.last_output;
        self.last_output = value;

        self.mod_amplitude * delta
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn waveshape(&self) -> Waveshape {
        self.shape
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn phase_increment(&self) -> f32 {
        self.phase_increment
    }

    pub fn mod_amplitude(&self) -> f32 {
        self.mod_amplitude
    }

    pub fn table_len(&self) -> f32 {
        self.table_len
    }
}
