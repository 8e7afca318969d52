//! Lock-free control surface shared between a control thread and the audio
//! thread.
//!
//! Every scalar lives in its own atomic, so a single control can never be
//! torn. The two advanced bundles are written field by field and then
//! published by OR-ing a pending mask; the audio thread claims the mask with
//! `swap(0)` and reads only the fields it names. A bundle written while the
//! audio thread is mid-read may land half in this snapshot and half in the
//! next one, which is harmless: every field is independently valid.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::fm::{FmAlgorithm, NUM_OPERATORS};
use crate::dsp::wavetable::Waveshape;
use crate::timbre::{
    clamp_dimension, AdvancedSpectrum, Dimension, EnvelopeOverrides, OperatorSettings,
    DIMENSION_CENTER,
};

const DEFAULT_Q: f32 = 1.0;

// Pending bits for `AdvancedControls`
const DECAY: u8 = 1 << 0;
const SUSTAIN: u8 = 1 << 1;
const RELEASE: u8 = 1 << 2;
const BRIGHTNESS_Q: u8 = 1 << 3;
const ARTICULATION_Q: u8 = 1 << 4;
const NOTE_LINK: u8 = 1 << 5;

// Pending bits for `AdvancedSpectrum`; operator `i` uses bit `i + 1`
const ALGORITHM: u8 = 1 << 0;

/// Explicit parameters used in advanced mode. `None` leaves a field as it is.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdvancedControls {
    pub decay: Option<f32>,
    pub sustain: Option<f32>,
    pub release: Option<f32>,
    pub brightness_q: Option<f32>,
    pub articulation_q: Option<f32>,
    /// Whether the brightness cutoff and Q follow the note.
    pub note_link: Option<bool>,
}

impl AdvancedControls {
    /// The envelope part of the bundle.
    pub fn envelope(&self) -> EnvelopeOverrides {
        EnvelopeOverrides {
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == AdvancedControls::default()
    }
}

/// Everything `Voice::process` reads from the controls, taken once per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub dimensions: [u8; 4],
    pub frequency: f32,
    pub q: f32,
    pub advanced: bool,
    pub controls: Option<AdvancedControls>,
    pub spectrum: Option<AdvancedSpectrum>,
}

impl ControlSnapshot {
    pub fn dimension(&self, dimension: Dimension) -> u8 {
        self.dimensions[dimension.index()]
    }
}

struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}

struct OperatorSlot {
    amplitude: AtomicF32,
    ratio: AtomicF32,
    waveshape: AtomicU8,
}

impl OperatorSlot {
    fn new() -> Self {
        Self {
            amplitude: AtomicF32::new(0.0),
            ratio: AtomicF32::new(1.0),
            waveshape: AtomicU8::new(Waveshape::Sine.index() as u8),
        }
    }
}

struct ControlBlock {
    dimensions: [AtomicU8; 4],
    frequency: AtomicF32,
    q: AtomicF32,
    advanced: AtomicBool,

    decay: AtomicF32,
    sustain: AtomicF32,
    release: AtomicF32,
    brightness_q: AtomicF32,
    articulation_q: AtomicF32,
    note_link: AtomicBool,
    controls_pending: AtomicU8,

    algorithm: AtomicU8,
    operators: [OperatorSlot; NUM_OPERATORS],
    spectrum_pending: AtomicU8,
}

/// Cloneable handle onto a voice's controls. Every clone writes to the same
/// voice; setters never block.
#[derive(Clone)]
pub struct VoiceControls {
    block: Arc<ControlBlock>,
}

impl VoiceControls {
    pub fn new(frequency: f32) -> Self {
        let block = ControlBlock {
            dimensions: std::array::from_fn(|_| AtomicU8::new(DIMENSION_CENTER)),
            frequency: AtomicF32::new(frequency),
            q: AtomicF32::new(DEFAULT_Q),
            advanced: AtomicBool::new(false),

            decay: AtomicF32::new(0.0),
            sustain: AtomicF32::new(0.0),
            release: AtomicF32::new(0.0),
            brightness_q: AtomicF32::new(DEFAULT_Q),
            articulation_q: AtomicF32::new(DEFAULT_Q),
            note_link: AtomicBool::new(true),
            controls_pending: AtomicU8::new(0),

            algorithm: AtomicU8::new(FmAlgorithm::Additive.index() as u8),
            operators: std::array::from_fn(|_| OperatorSlot::new()),
            spectrum_pending: AtomicU8::new(0),
        };
        Self {
            block: Arc::new(block),
        }
    }

    /// Clamped into the dimension range.
    pub fn set_dimension(&self, dimension: Dimension, value: i32) {
        self.block.dimensions[dimension.index()].store(clamp_dimension(value), Ordering::Relaxed);
    }

    pub fn dimension(&self, dimension: Dimension) -> u8 {
        self.block.dimensions[dimension.index()].load(Ordering::Relaxed)
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.block.frequency.store(frequency, Ordering::Relaxed);
    }

    pub fn frequency(&self) -> f32 {
        self.block.frequency.load(Ordering::Relaxed)
    }

    /// Resonance that accompanies the note, typically derived from velocity.
    pub fn set_resonance_factor(&self, q: f32) {
        self.block.q.store(q, Ordering::Relaxed);
    }

    pub fn resonance_factor(&self) -> f32 {
        self.block.q.load(Ordering::Relaxed)
    }

    pub fn set_advanced_mode(&self, advanced: bool) {
        let _previous = self.block.advanced.swap(advanced, Ordering::Release);
        #[cfg(feature = "tracing")]
        if _previous != advanced {
            tracing::debug!(advanced, "advanced mode changed");
        }
    }

    pub fn is_advanced(&self) -> bool {
        self.block.advanced.load(Ordering::Acquire)
    }

    /// Queue explicit controls. Fields left `None` are not touched, and a
    /// later call before the next snapshot overwrites only what it carries.
    pub fn set_advanced_controls(&self, controls: &AdvancedControls) {
        let b = &self.block;
        let mut mask = 0;
        if let Some(decay) = controls.decay {
            b.decay.store(decay, Ordering::Relaxed);
            mask |= DECAY;
        }
        if let Some(sustain) = controls.sustain {
            b.sustain.store(sustain, Ordering::Relaxed);
            mask |= SUSTAIN;
        }
        if let Some(release) = controls.release {
            b.release.store(release, Ordering::Relaxed);
            mask |= RELEASE;
        }
        if let Some(q) = controls.brightness_q {
            b.brightness_q.store(q, Ordering::Relaxed);
            mask |= BRIGHTNESS_Q;
        }
        if let Some(q) = controls.articulation_q {
            b.articulation_q.store(q, Ordering::Relaxed);
            mask |= ARTICULATION_Q;
        }
        if let Some(link) = controls.note_link {
            b.note_link.store(link, Ordering::Relaxed);
            mask |= NOTE_LINK;
        }
        if mask != 0 {
            b.controls_pending.fetch_or(mask, Ordering::Release);
        }
    }

    /// Queue explicit operator-network settings.
    pub fn set_advanced_spectrum(&self, spectrum: &AdvancedSpectrum) {
        let b = &self.block;
        let mut mask = 0;
        if let Some(algorithm) = spectrum.algorithm {
            b.algorithm.store(algorithm.index() as u8, Ordering::Relaxed);
            mask |= ALGORITHM;
        }
        for (i, (slot, op)) in b.operators.iter().zip(&spectrum.operators).enumerate() {
            if let Some(op) = op {
                slot.amplitude.store(op.amplitude, Ordering::Relaxed);
                slot.ratio.store(op.ratio, Ordering::Relaxed);
                slot.waveshape.store(op.waveshape.index() as u8, Ordering::Relaxed);
                mask |= 1 << (i + 1);
            }
        }
        if mask != 0 {
            b.spectrum_pending.fetch_or(mask, Ordering::Release);
        }
    }

    fn take_controls(&self) -> Option<AdvancedControls> {
        let b = &self.block;
        let mask = b.controls_pending.swap(0, Ordering::Acquire);
        if mask == 0 {
            return None;
        }
        let pick = |bit: u8, field: &AtomicF32| (mask & bit != 0).then(|| field.load(Ordering::Relaxed));
        Some(AdvancedControls {
            decay: pick(DECAY, &b.decay),
            sustain: pick(SUSTAIN, &b.sustain),
            release: pick(RELEASE, &b.release),
            brightness_q: pick(BRIGHTNESS_Q, &b.brightness_q),
            articulation_q: pick(ARTICULATION_Q, &b.articulation_q),
            note_link: (mask & NOTE_LINK != 0).then(|| b.note_link.load(Ordering::Relaxed)),
        })
    }

    fn take_spectrum(&self) -> Option<AdvancedSpectrum> {
        let b = &self.block;
        let mask = b.spectrum_pending.swap(0, Ordering::Acquire);
        if mask == 0 {
            return None;
        }
        let algorithm = (mask & ALGORITHM != 0)
            .then(|| FmAlgorithm::from_index(b.algorithm.load(Ordering::Relaxed) as usize));
        let operators = std::array::from_fn(|i| {
            (mask & (1 << (i + 1)) != 0).then(|| {
                let slot = &b.operators[i];
                OperatorSettings {
                    amplitude: slot.amplitude.load(Ordering::Relaxed),
                    ratio: slot.ratio.load(Ordering::Relaxed),
                    waveshape: Waveshape::from_index(slot.waveshape.load(Ordering::Relaxed) as usize),
                }
            })
        });
        Some(AdvancedSpectrum {
            algorithm,
            operators,
        })
    }

    /// Read every control and claim any pending advanced bundles. Only the
    /// audio thread should call this.
    ///
    /// The masks are claimed before the mode is read: a bundle published
    /// after `set_advanced_mode(true)` is always seen together with the mode.
    pub fn snapshot(&self) -> ControlSnapshot {
        let b = &self.block;
        let controls = self.take_controls();
        let spectrum = self.take_spectrum();
        ControlSnapshot {
            dimensions: std::array::from_fn(|i| b.dimensions[i].load(Ordering::Relaxed)),
            frequency: b.frequency.load(Ordering::Relaxed),
            q: b.q.load(Ordering::Relaxed),
            advanced: b.advanced.load(Ordering::Acquire),
            controls,
            spectrum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_centered() {
        let controls = VoiceControls::new(440.0);
        let snap = controls.snapshot();
        assert_eq!(snap.dimensions, [128; 4]);
        assert_eq!(snap.frequency, 440.0);
        assert_eq!(snap.q, 1.0);
        assert!(!snap.advanced);
        assert!(snap.controls.is_none());
        assert!(snap.spectrum.is_none());
    }

    #[test]
    fn dimensions_clamp() {
        let controls = VoiceControls::new(440.0);
        controls.set_dimension(Dimension::Brightness, -12);
        controls.set_dimension(Dimension::Envelope, 9_000);
        let snap = controls.snapshot();
        assert_eq!(snap.dimension(Dimension::Brightness), 0);
        assert_eq!(snap.dimension(Dimension::Envelope), 255);
    }

    #[test]
    fn bundles_are_consumed_once() {
        let controls = VoiceControls::new(440.0);
        controls.set_advanced_controls(&AdvancedControls {
            decay: Some(0.3),
            note_link: Some(false),
            ..AdvancedControls::default()
        });

        let first = controls.snapshot().controls;
        assert_eq!(
            first,
            Some(AdvancedControls {
                decay: Some(0.3),
                note_link: Some(false),
                ..AdvancedControls::default()
            })
        );
        assert!(controls.snapshot().controls.is_none());
    }

    #[test]
    fn pending_fields_accumulate() {
        let controls = VoiceControls::new(440.0);
        controls.set_advanced_controls(&AdvancedControls {
            decay: Some(0.3),
            ..AdvancedControls::default()
        });
        controls.set_advanced_controls(&AdvancedControls {
            release: Some(0.1),
            decay: Some(0.2),
            ..AdvancedControls::default()
        });

        let taken = controls.snapshot().controls.unwrap_or_default();
        assert_eq!(taken.decay, Some(0.2));
        assert_eq!(taken.release, Some(0.1));
        assert_eq!(taken.sustain, None);
    }

    #[test]
    fn empty_bundle_publishes_nothing() {
        let controls = VoiceControls::new(440.0);
        controls.set_advanced_controls(&AdvancedControls::default());
        controls.set_advanced_spectrum(&AdvancedSpectrum::default());
        let snap = controls.snapshot();
        assert!(snap.controls.is_none());
        assert!(snap.spectrum.is_none());
    }

    #[test]
    fn spectrum_carries_only_given_operators() {
        let controls = VoiceControls::new(440.0);
        let mut spectrum = AdvancedSpectrum {
            algorithm: Some(FmAlgorithm::TwoStacks),
            ..AdvancedSpectrum::default()
        };
        spectrum.operators[3] = Some(OperatorSettings {
            amplitude: 0.4,
            ratio: 7.0,
            waveshape: Waveshape::Square,
        });
        controls.set_advanced_spectrum(&spectrum);

        assert_eq!(controls.snapshot().spectrum, Some(spectrum));
    }

    #[test]
    fn bundle_sent_after_mode_change_arrives_with_the_mode() {
        const ROUNDS: u32 = 2_000;
        let controls = VoiceControls::new(440.0);
        let writer = controls.clone();

        let handle = std::thread::spawn(move || {
            writer.set_advanced_mode(true);
            for i in 1..=ROUNDS {
                writer.set_advanced_controls(&AdvancedControls {
                    decay: Some(i as f32),
                    ..AdvancedControls::default()
                });
            }
        });

        let mut last = 0.0;
        while last < ROUNDS as f32 {
            let snap = controls.snapshot();
            if let Some(bundle) = snap.controls {
                assert!(snap.advanced, "bundle claimed without its advanced mode");
                last = bundle.decay.unwrap_or(last);
            }
            std::hint::spin_loop();
        }
        handle.join().unwrap();
        assert_eq!(last, ROUNDS as f32);
    }

    #[test]
    fn clones_share_state_across_threads() {
        let controls = VoiceControls::new(440.0);
        let writer = controls.clone();
        let handle = std::thread::spawn(move || {
            writer.set_frequency(220.0);
            writer.set_dimension(Dimension::Spectrum, 3);
            writer.set_advanced_mode(true);
        });
        handle.join().unwrap();

        let snap = controls.snapshot();
        assert_eq!(snap.frequency, 220.0);
        assert_eq!(snap.dimension(Dimension::Spectrum), 3);
        assert!(snap.advanced);
    }
}
