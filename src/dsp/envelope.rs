#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Debounced ADSR Envelope
=======================

A linear attack/decay/sustain/release generator driven by a gate sampled once
per output sample. Two things set it apart from a textbook ADSR: debounce
states that refuse to react to the gate for a short window, and a
fixed-duration mode for percussive notes.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). Multiplies the
              audio signal.

  gate        The note-on boolean passed to `process` every sample.

  ramp        A linear segment from the level at its start to a target,
              lasting round(time * sample_rate) samples. The level is computed
              from the sample count, so a stage ends on schedule at any rate.

  debounce    A dwell of `debounce_samples` (20 ms) during which gate changes
              are ignored. A gate that chatters on release (a bouncing key, a
              noisy touch surface) would otherwise restart the attack from a
              partly released level many times a second, which is audible as
              clicks.

  fixed       Fixed-duration mode. Sustain is forced to 0, so the note dies
              at the end of its decay regardless of how long the gate is held,
              like a struck bar.


The State Machine
-----------------

                  gate                 level >= 1
        ┌─────┐ ───────→ ┌────────┐ ─────────────→ ┌───────┐
        │ Off │          │ Attack │                │ Decay │
        └─────┘ ←──┐     └────────┘                └───────┘
           ↑       │          ↑ gate                │  │  │ level <= sustain
           │       │     ┌─────────┐                │  │  ├──────────────→ Sustain
           │       └──── │ Release │                │  │  │  (sustained)
           │  level <= 0 └─────────┘                │  │  │
           │                  ↑ window elapsed      │  │  ├─ gate ──→ ButtonHeldOff
           │         ┌─────────────────┐ ← !gate ───┘  │  │  (fixed)        │ !gate
           ├──────── │ ReleaseDebounce │ ← !gate ─ Sustain                  ↓
           │  level  └─────────────────┘                └─ !gate ──→ OffDebounce
           │  <= 0                                         (fixed)          │
           └────────────────────────────────────────────────────────────────┘
                                                                 window elapsed

Release re-attacks from wherever the level is, so a retrigger never jumps.
ReleaseDebounce keeps ramping down but ignores the gate; only once the window
has elapsed does a new gate get through (from Release).

A sustained envelope also leaves Attack or Decay for ReleaseDebounce as soon
as the gate drops. A fixed-duration envelope plays its attack and decay out.
*/

/// Debounce dwell time in seconds.
pub const DEBOUNCE_TIME: f32 = 0.020;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Off,             // Silent, level = 0, waiting for the gate
    Attack,          // Ramping up to 1.0
    Decay,           // Ramping down from 1.0 to the sustain level
    Sustain,         // Holding while the gate is high
    Release,         // Ramping to 0; the gate re-attacks from here
    ReleaseDebounce, // Ramping to 0 with the gate ignored
    ButtonHeldOff,   // Fixed-duration note finished, gate still high
    OffDebounce,     // Fixed-duration note finished, waiting out the window
}

impl EnvelopeState {
    /// True for every state that produces sound.
    pub fn is_sounding(self) -> bool {
        !matches!(
            self,
            EnvelopeState::Off | EnvelopeState::OffDebounce | EnvelopeState::ButtonHeldOff
        )
    }
}

/// One linear segment, counted in whole samples so it lands on its target on
/// exactly the scheduled sample at any rate.
#[derive(Debug, Clone, Copy, Default)]
struct Ramp {
    start: f32,
    target: f32,
    length: u32,
    position: u32,
}

impl Ramp {
    fn new(start: f32, target: f32, seconds: f32, sample_rate: f32) -> Self {
        Self {
            start,
            target,
            length: ramp_samples(seconds, sample_rate),
            position: 0,
        }
    }

    /// Advance one sample. Returns the new level and whether the target is reached.
    fn step(&mut self) -> (f32, bool) {
        self.position = (self.position + 1).min(self.length);
        if self.position >= self.length {
            return (self.target, true);
        }
        let t = self.position as f32 / self.length as f32;
        let level = self.start + (self.target - self.start) * t;
        (level.clamp(0.0, 1.0), false)
    }

    fn remaining_seconds(&self, sample_rate: f32) -> f32 {
        (self.length - self.position) as f32 / sample_rate
    }
}

pub struct Adsr {
    // Shape
    attack_time: f32,   // seconds, 0 → 1
    decay_time: f32,    // seconds, 1 → sustain
    sustain_level: f32, // 0.0 - 1.0, forced to 0 in fixed mode
    release_time: f32,  // seconds, level → 0
    fixed_duration: bool,

    sample_rate: f32,
    debounce_samples: u32,

    // Runtime state
    state: EnvelopeState,
    level: f32,
    ramp: Ramp,
    debounce_counter: u32,
}

impl Adsr {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            attack_time: 0.01,
            decay_time: 0.01,
            sustain_level: 0.5,
            release_time: 0.01,
            fixed_duration: false,

            sample_rate,
            debounce_samples: debounce_samples(sample_rate),

            state: EnvelopeState::Off,
            level: 0.0,
            ramp: Ramp::default(),
            debounce_counter: 0,
        }
    }

    pub fn adsr(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self::new(sample_rate);
        env.set_attack(attack);
        env.set_decay(decay);
        env.set_sustain(sustain);
        env.set_release(release);
        env
    }

    /// Change the rate. Stage times are re-floored at the new sample period
    /// and a ramp in flight keeps its remaining duration in seconds.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate == self.sample_rate {
            return;
        }
        let remaining = self.ramp.remaining_seconds(self.sample_rate);
        self.sample_rate = sample_rate;
        self.debounce_samples = debounce_samples(sample_rate);

        let period = self.period();
        self.attack_time = self.attack_time.max(period);
        self.decay_time = self.decay_time.max(period);
        self.release_time = self.release_time.max(period);

        if self.ramp.position < self.ramp.length {
            self.ramp = Ramp::new(self.level, self.ramp.target, remaining, sample_rate);
        }
    }

    fn period(&self) -> f32 {
        1.0 / self.sample_rate
    }

    // Times are picked up by the next ramp; a ramp in flight keeps its slope.
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_time = seconds.max(self.period());
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay_time = seconds.max(self.period());
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_time = seconds.max(self.period());
    }

    /// Sustain level, clamped to [0, 1]. Ignored while in fixed-duration mode.
    pub fn set_sustain(&mut self, level: f32) {
        if !self.fixed_duration {
            self.sustain_level = level.clamp(0.0, 1.0);
        }
    }

    /// Fixed-duration notes force the sustain level to 0.
    pub fn set_fixed_duration(&mut self, fixed: bool) {
        self.fixed_duration = fixed;
        if fixed {
            self.sustain_level = 0.0;
        }
    }

    fn ramp_to(&mut self, target: f32, seconds: f32) {
        self.ramp = Ramp::new(self.level, target, seconds, self.sample_rate);
    }

    fn start_attack(&mut self) {
        self.state = EnvelopeState::Attack;
        self.ramp_to(1.0, self.attack_time);
    }

    fn start_release(&mut self) {
        self.state = EnvelopeState::ReleaseDebounce;
        self.debounce_counter = 0;
        self.ramp_to(0.0, self.release_time);
    }

    /// Step the release ramp; true once the level has hit 0.
    fn release_step(&mut self) -> bool {
        let (level, done) = self.ramp.step();
        self.level = level;
        if done || self.level <= 0.0 {
            self.level = 0.0;
            self.state = EnvelopeState::Off;
            return true;
        }
        false
    }

    /// Advance one sample with the current gate and return the new level.
    pub fn process(&mut self, note_on: bool) -> f32 {
        match self.state {
            EnvelopeState::Off => {
                self.level = 0.0;
                if note_on {
                    self.start_attack();
                }
            }

            EnvelopeState::Attack => {
                if !note_on && !self.fixed_duration {
                    self.start_release();
                } else {
                    let (level, done) = self.ramp.step();
                    self.level = level;
                    if done {
                        self.state = EnvelopeState::Decay;
                        self.ramp_to(self.sustain_level, self.decay_time);
                    }
                }
            }

            EnvelopeState::Decay => {
                if !note_on && !self.fixed_duration {
                    self.start_release();
                } else {
                    let (level, done) = self.ramp.step();
                    self.level = level;
                    if done {
                        self.state = match (self.fixed_duration, note_on) {
                            (true, true) => EnvelopeState::ButtonHeldOff,
                            (true, false) => {
                                self.debounce_counter = 0;
                                EnvelopeState::OffDebounce
                            }
                            (false, _) => EnvelopeState::Sustain,
                        };
                    }
                }
            }

            EnvelopeState::Sustain => {
                if !note_on {
                    self.start_release();
                }
            }

            EnvelopeState::ReleaseDebounce => {
                self.debounce_counter += 1;
                if !self.release_step() && self.debounce_counter >= self.debounce_samples {
                    self.state = EnvelopeState::Release;
                }
            }

            EnvelopeState::Release => {
                if note_on {
                    self.start_attack();
                } else {
                    self.release_step();
                }
            }

            EnvelopeState::ButtonHeldOff => {
                if !note_on {
                    self.state = EnvelopeState::OffDebounce;
                    self.debounce_counter = 0;
                }
            }

            EnvelopeState::OffDebounce => {
                self.debounce_counter += 1;
                if self.debounce_counter >= self.debounce_samples {
                    self.level = 0.0;
                    self.state = EnvelopeState::Off;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of levels with a constant gate.
    pub fn render(&mut self, buffer: &mut [f32], note_on: bool) {
        for sample in buffer.iter_mut() {
            *sample = self.process(note_on);
        }
    }

    /// True unless the state is Off, OffDebounce or ButtonHeldOff.
    pub fn is_active(&self) -> bool {
        self.state.is_sounding()
    }

    pub fn reset(&mut self) {
        self.state = EnvelopeState::Off;
        self.level = 0.0;
        self.ramp = Ramp::default();
        self.debounce_counter = 0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn attack_time(&self) -> f32 {
        self.attack_time
    }

    pub fn decay_time(&self) -> f32 {
        self.decay_time
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn is_fixed_duration(&self) -> bool {
        self.fixed_duration
    }

    pub fn debounce_samples(&self) -> u32 {
        self.debounce_samples
    }
}

/// Whole samples in a stage of `seconds`, never fewer than one.
fn ramp_samples(seconds: f32, sample_rate: f32) -> u32 {
    (seconds as f64 * sample_rate as f64).round().max(1.0) as u32
}

fn debounce_samples(sample_rate: f32) -> u32 {
    (DEBOUNCE_TIME * sample_rate).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn run(env: &mut Adsr, samples: usize, note_on: bool) {
        for _ in 0..samples {
            env.process(note_on);
        }
    }

    fn run_until(env: &mut Adsr, note_on: bool, limit: usize, done: impl Fn(&Adsr) -> bool) -> usize {
        for n in 0..limit {
            if done(env) {
                return n;
            }
            env.process(note_on);
        }
        panic!("envelope never reached the expected state");
    }

    #[test]
    fn attack_reaches_full_level_on_schedule() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.05, 0.1, 0.5, 0.1);

        env.process(true);
        assert_eq!(env.state(), EnvelopeState::Attack);

        let mut previous = env.level();
        let mut steps = 0;
        while env.state() == EnvelopeState::Attack {
            env.process(true);
            assert!(env.level() >= previous, "attack must be monotonic");
            previous = env.level();
            steps += 1;
        }

        let expected = (0.05 * SAMPLE_RATE) as i32;
        assert!((steps - expected).abs() <= 1, "attack took {} samples", steps);
        assert_eq!(env.level(), 1.0);
        assert_eq!(env.state(), EnvelopeState::Decay);
    }

    fn attack_samples(env: &mut Adsr) -> usize {
        env.process(true);
        let mut steps = 0;
        while env.state() == EnvelopeState::Attack {
            env.process(true);
            steps += 1;
        }
        steps
    }

    #[test]
    fn long_attacks_stay_on_schedule_at_high_rates() {
        for &sr in &[44_100.0f32, 48_000.0, 96_000.0, 192_000.0] {
            for &attack in &[0.291f32, 1.0] {
                let mut env = Adsr::adsr(sr, attack, 0.1, 0.5, 0.1);
                let steps = attack_samples(&mut env) as i64;
                let expected = (attack as f64 * sr as f64).round() as i64;
                assert!(
                    (steps - expected).abs() <= 1,
                    "attack {attack} s at {sr} Hz took {steps} samples, expected {expected}"
                );
                assert_eq!(env.level(), 1.0);
            }
        }
    }

    #[test]
    fn stage_times_floor_at_one_sample_period() {
        let mut env = Adsr::new(96_000.0);
        env.set_attack(0.0);
        assert_eq!(env.attack_time(), 1.0 / 96_000.0);
        assert_eq!(attack_samples(&mut env), 1);

        env.set_sample_rate(192_000.0);
        env.set_release(-1.0);
        assert_eq!(env.release_time(), 1.0 / 192_000.0);
    }

    #[test]
    fn rate_change_mid_attack_keeps_remaining_time() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.1, 0.1, 0.5, 0.1);
        run(&mut env, 41, true); // Off sample + 40 of 100 attack samples
        assert_eq!(env.state(), EnvelopeState::Attack);
        let level = env.level();

        env.set_sample_rate(2.0 * SAMPLE_RATE);
        assert_eq!(env.level(), level);

        // 60 ms left, now 120 samples
        run(&mut env, 119, true);
        assert_eq!(env.state(), EnvelopeState::Attack);
        env.process(true);
        assert_eq!(env.state(), EnvelopeState::Decay);
        assert_eq!(env.level(), 1.0);
    }

    #[test]
    fn sustain_holds_target_level() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.05, 0.6, 0.2);
        run(&mut env, 80, true);

        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.level() - 0.6).abs() < 1e-6);
        run(&mut env, 500, true);
        assert!((env.level() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn release_debounces_then_falls_to_off() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.01, 0.8, 0.2);
        run(&mut env, 40, true);
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.process(false);
        assert_eq!(env.state(), EnvelopeState::ReleaseDebounce);

        let window = env.debounce_samples() as usize;
        let dwell = run_until(&mut env, false, 1_000, |e| e.state() != EnvelopeState::ReleaseDebounce);
        assert_eq!(dwell, window, "expected exactly one debounce window");
        assert_eq!(env.state(), EnvelopeState::Release);

        run_until(&mut env, false, 1_000, |e| e.state() == EnvelopeState::Off);
        assert_eq!(env.level(), 0.0);
        run(&mut env, 10, false);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn retrigger_is_ignored_while_debouncing() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.01, 0.8, 0.5);
        run(&mut env, 40, true);
        env.process(false);

        for _ in 0..(env.debounce_samples() - 1) {
            env.process(true);
            assert_eq!(env.state(), EnvelopeState::ReleaseDebounce);
        }

        env.process(true);
        assert_eq!(env.state(), EnvelopeState::Release);
        env.process(true);
        assert_eq!(env.state(), EnvelopeState::Attack);
    }

    #[test]
    fn release_retriggers_from_current_level() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.01, 0.8, 0.5);
        run(&mut env, 40, true);
        run_until(&mut env, false, 1_000, |e| e.state() == EnvelopeState::Release);
        run(&mut env, 50, false);

        let before = env.level();
        assert!(before > 0.0 && before < 0.8);
        env.process(true);
        assert_eq!(env.state(), EnvelopeState::Attack);
        assert_eq!(env.level(), before, "retrigger must not jump");
        env.process(true);
        assert!(env.level() > before);
    }

    #[test]
    fn gate_drop_during_decay_releases() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.5, 0.2, 0.1);
        run(&mut env, 30, true);
        assert_eq!(env.state(), EnvelopeState::Decay);

        env.process(false);
        assert_eq!(env.state(), EnvelopeState::ReleaseDebounce);
    }

    #[test]
    fn fixed_duration_forces_zero_sustain() {
        let mut env = Adsr::new(SAMPLE_RATE);
        env.set_fixed_duration(true);
        env.set_sustain(0.7);
        assert_eq!(env.sustain_level(), 0.0);

        env.set_fixed_duration(false);
        env.set_sustain(0.7);
        assert_eq!(env.sustain_level(), 0.7);
    }

    #[test]
    fn fixed_duration_held_gate_parks_in_button_held_off() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.02, 0.5, 0.1);
        env.set_fixed_duration(true);

        let mut saw_sustain = false;
        for _ in 0..100 {
            env.process(true);
            saw_sustain |= env.state() == EnvelopeState::Sustain;
        }
        assert!(!saw_sustain);
        assert_eq!(env.state(), EnvelopeState::ButtonHeldOff);
        assert!(!env.is_active());

        env.process(false);
        assert_eq!(env.state(), EnvelopeState::OffDebounce);
    }

    #[test]
    fn fixed_duration_released_early_waits_one_window() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.01, 0.05, 0.5, 0.1);
        env.set_fixed_duration(true);
        run(&mut env, 5, true);

        // Gate drops mid-attack: the note plays out its decay anyway
        let to_debounce = run_until(&mut env, false, 1_000, |e| e.state() == EnvelopeState::OffDebounce);
        assert!(to_debounce > 40);

        let dwell = run_until(&mut env, false, 1_000, |e| e.state() == EnvelopeState::Off);
        assert_eq!(dwell, env.debounce_samples() as usize);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn debounce_window_follows_sample_rate() {
        let mut env = Adsr::new(44_100.0);
        assert_eq!(env.debounce_samples(), 882);
        env.set_sample_rate(48_000.0);
        assert_eq!(env.debounce_samples(), 960);
    }

    #[test]
    fn level_never_leaves_unit_range() {
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.003, 0.007, 0.3, 0.011);
        for n in 0..5_000 {
            let gate = (n / 37) % 3 != 0;
            let level = env.process(gate);
            assert!((0.0..=1.0).contains(&level), "level {} at sample {}", level, n);
        }
    }
}
