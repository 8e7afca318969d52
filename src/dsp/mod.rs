//! Low-level DSP primitives used by the timbre mappers and the voice.
//!
//! These components are allocation-free on the per-sample path, making them
//! safe to embed directly inside a voice. They stay focused on the
//! signal-processing math; the mappers in [`crate::timbre`] decide what
//! parameters to feed them.

/// Debounced attack/decay/sustain/release state machine.
pub mod envelope;
/// Second-order IIR section with low/high/band-pass responses.
pub mod filter;
/// Four-operator FM network and its modulation topologies.
pub mod fm;
/// Phase-accumulating wavetable oscillator.
pub mod operator;
/// Shared, immutable single-cycle waveform tables.
pub mod wavetable;

pub use envelope::{Adsr, EnvelopeState};
pub use filter::{Biquad, FilterType};
pub use fm::{FmAlgorithm, FmPatch, OperatorNetwork, NUM_OPERATORS};
pub use operator::Operator;
pub use wavetable::{WavetableBank, Waveshape, WAVETABLE_SIZE};
