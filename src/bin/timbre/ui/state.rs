//! Voice state published by the audio thread
//!
//! Sent once per audio callback; `Copy` and fixed-size so the push never
//! allocates.

use timbre_dsp::{
    dsp::{filter::RESPONSE_POINTS, EnvelopeState, FmAlgorithm},
    timbre::Dimension,
    Voice,
};

#[derive(Clone, Copy, Debug)]
pub struct VoiceStatus {
    /// Applied dimension values, indexed by `Dimension::index`
    pub dimensions: [u8; 4],
    pub advanced: bool,
    /// Key currently holding the gate open
    pub note: Option<u8>,
    pub frequency: f32,

    pub envelope_state: EnvelopeState,
    pub envelope_level: f32,
    pub attack_time: f32,
    pub decay_time: f32,

    pub brightness_cutoff: f32,
    pub brightness_q: f32,
    pub articulation_cutoff: f32,
    pub algorithm: FmAlgorithm,

    pub brightness_response: [f32; RESPONSE_POINTS],
    pub articulation_curve: [f32; RESPONSE_POINTS],
}

impl VoiceStatus {
    pub fn capture(voice: &Voice, note: Option<u8>) -> Self {
        Self {
            dimensions: Dimension::ALL.map(|d| voice.dimension(d)),
            advanced: voice.is_advanced(),
            note,
            frequency: voice.frequency(),
            envelope_state: voice.envelope_state(),
            envelope_level: voice.envelope_level(),
            attack_time: voice.attack_time(),
            decay_time: voice.decay_time(),
            brightness_cutoff: voice.brightness_cutoff(),
            brightness_q: voice.brightness_q(),
            articulation_cutoff: voice.articulation_cutoff(),
            algorithm: voice.fm_patch().algorithm,
            brightness_response: voice.brightness_response(),
            articulation_curve: voice.articulation_curve(),
        }
    }
}
