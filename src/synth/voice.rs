use crate::config::{ConfigError, VoiceConfig};
use crate::dsp::envelope::EnvelopeState;
use crate::dsp::filter::RESPONSE_POINTS;
use crate::dsp::fm::FmPatch;
use crate::dsp::wavetable::WavetableBank;
use crate::timbre::{
    AdvancedSpectrum, ArticulationMapper, BrightnessMapper, Dimension, EnvelopeMapper,
    SpectrumMapper,
};

use super::control::{AdvancedControls, ControlSnapshot, VoiceControls};

/// One monophonic voice: operator network → brightness filter → articulation
/// sweep → envelope.
///
/// The audio thread owns the `Voice` and calls [`Voice::process`]. Any other
/// thread changes parameters through the `&self` setters or a cloned
/// [`VoiceControls`] handle; the voice picks them up at the top of the next
/// `process` call.
pub struct Voice {
    controls: VoiceControls,
    bank: WavetableBank,
    sample_rate: f32,

    spectrum: SpectrumMapper,
    brightness: BrightnessMapper,
    articulation: ArticulationMapper,
    envelope: EnvelopeMapper,

    // Applied state, compared against each snapshot
    frequency: f32,
    q: f32,
    advanced: bool,
    was_active: bool,
}

impl Voice {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        let bank = WavetableBank::new();
        let controls = VoiceControls::new(frequency);
        let q = controls.resonance_factor();

        let mut brightness = BrightnessMapper::new(sample_rate, frequency);
        brightness.set_note(frequency, q);

        Self {
            spectrum: SpectrumMapper::new(bank.clone(), sample_rate, frequency),
            brightness,
            articulation: ArticulationMapper::new(sample_rate, frequency),
            envelope: EnvelopeMapper::new(sample_rate),
            controls,
            bank,
            sample_rate,
            frequency,
            q,
            advanced: false,
            was_active: false,
        }
    }

    /// Validate `config` and build a voice with its starting values applied.
    pub fn from_config(config: &VoiceConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            #[cfg(feature = "tracing")]
            tracing::warn!(%err, "rejected voice config");
            return Err(err);
        }

        let mut voice = Self::new(config.sample_rate, config.frequency);
        voice.set_resonance_factor(config.resonance);
        voice.set_advanced_mode(config.advanced);
        for dimension in Dimension::ALL {
            voice.set_dimension(dimension, config.dimension(dimension) as i32);
        }
        let snapshot = voice.controls.snapshot();
        voice.apply(&snapshot);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = config.sample_rate,
            frequency = config.frequency,
            dimensions = ?config.dimensions,
            "voice created"
        );

        Ok(voice)
    }

    /// Move to a new stream rate. Rate-dependent tables and filter
    /// coefficients are rebuilt here, never on the per-sample path.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.spectrum.set_sample_rate(sample_rate);
        self.brightness.set_sample_rate(sample_rate);
        self.articulation.set_sample_rate(sample_rate);
        self.envelope.set_sample_rate(sample_rate);

        #[cfg(feature = "tracing")]
        tracing::debug!(sample_rate, "voice sample rate changed");
    }

    /// Handle for driving this voice from another thread.
    pub fn controls(&self) -> VoiceControls {
        self.controls.clone()
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.controls.set_frequency(frequency);
    }

    pub fn set_resonance_factor(&self, q: f32) {
        self.controls.set_resonance_factor(q);
    }

    pub fn set_dimension(&self, dimension: Dimension, value: i32) {
        self.controls.set_dimension(dimension, value);
    }

    pub fn set_spectrum(&self, value: i32) {
        self.set_dimension(Dimension::Spectrum, value);
    }

    pub fn set_brightness(&self, value: i32) {
        self.set_dimension(Dimension::Brightness, value);
    }

    pub fn set_articulation(&self, value: i32) {
        self.set_dimension(Dimension::Articulation, value);
    }

    pub fn set_envelope(&self, value: i32) {
        self.set_dimension(Dimension::Envelope, value);
    }

    pub fn set_advanced_mode(&self, advanced: bool) {
        self.controls.set_advanced_mode(advanced);
    }

    /// Dropped by the voice unless advanced mode is on when it is applied.
    pub fn set_advanced_controls(&self, controls: &AdvancedControls) {
        self.controls.set_advanced_controls(controls);
    }

    /// Dropped by the voice unless advanced mode is on when it is applied.
    pub fn set_advanced_spectrum(&self, spectrum: &AdvancedSpectrum) {
        self.controls.set_advanced_spectrum(spectrum);
    }

    fn apply(&mut self, snap: &ControlSnapshot) {
        if snap.advanced != self.advanced {
            self.advanced = snap.advanced;
            self.spectrum.set_advanced_mode(snap.advanced);
            self.brightness.set_advanced_mode(snap.advanced);
            self.articulation.set_advanced_mode(snap.advanced);
            self.envelope.set_advanced_mode(snap.advanced);
        }

        if snap.frequency != self.frequency || snap.q != self.q {
            self.frequency = snap.frequency;
            self.q = snap.q;
            self.spectrum.set_frequency(snap.frequency);
            self.brightness.set_note(snap.frequency, snap.q);
            self.articulation.set_frequency(snap.frequency);
        }

        self.spectrum.update(snap.dimension(Dimension::Spectrum));
        self.brightness.update(snap.dimension(Dimension::Brightness));
        self.articulation.update(snap.dimension(Dimension::Articulation));
        self.envelope.update(snap.dimension(Dimension::Envelope));

        if !self.advanced {
            return;
        }
        if let Some(controls) = &snap.controls {
            self.envelope.set_advanced(&controls.envelope());
            self.brightness
                .set_advanced(controls.note_link, controls.brightness_q);
            if let Some(q) = controls.articulation_q {
                self.articulation.set_q(q);
            }
        }
        if let Some(spectrum) = &snap.spectrum {
            self.spectrum.apply_advanced(spectrum);
        }
    }

    /// Next output sample for the given gate.
    #[inline]
    pub fn process(&mut self, note_on: bool) -> f32 {
        let snapshot = self.controls.snapshot();
        self.apply(&snapshot);

        let amplitude = self.envelope.process(note_on);
        let active = self.envelope.is_active();
        if active && !self.was_active {
            self.brightness.reset();
            self.articulation.reset();
        }
        self.was_active = active;

        if !active {
            return 0.0;
        }

        let raw = self.spectrum.process();
        let bright = self.brightness.process(raw);
        let shaped = self.articulation.process(bright);
        shaped * amplitude
    }

    /// Fill `buffer` with a constant gate.
    pub fn render(&mut self, buffer: &mut [f32], note_on: bool) {
        for sample in buffer.iter_mut() {
            *sample = self.process(note_on);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn resonance_factor(&self) -> f32 {
        self.q
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    /// Value currently applied for `dimension` (as of the last `process`).
    pub fn dimension(&self, dimension: Dimension) -> u8 {
        match dimension {
            Dimension::Spectrum => self.spectrum.value(),
            Dimension::Brightness => self.brightness.value(),
            Dimension::Articulation => self.articulation.value(),
            Dimension::Envelope => self.envelope.value(),
        }
    }

    pub fn spectrum(&self) -> u8 {
        self.spectrum.value()
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.value()
    }

    pub fn articulation(&self) -> u8 {
        self.articulation.value()
    }

    pub fn envelope(&self) -> u8 {
        self.envelope.value()
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn attack_time(&self) -> f32 {
        self.envelope.attack_time()
    }

    pub fn decay_time(&self) -> f32 {
        self.envelope.decay_time()
    }

    pub fn brightness_cutoff(&self) -> f32 {
        self.brightness.cutoff()
    }

    pub fn brightness_q(&self) -> f32 {
        self.brightness.q()
    }

    pub fn articulation_factor(&self) -> f32 {
        self.articulation.growth_factor()
    }

    pub fn articulation_cutoff(&self) -> f32 {
        self.articulation.cutoff()
    }

    pub fn fm_patch(&self) -> &FmPatch {
        self.spectrum.patch()
    }

    /// Brightness filter response on the 0..1 display scale.
    pub fn brightness_response(&self) -> [f32; RESPONSE_POINTS] {
        self.brightness.magnitude_response_db()
    }

    /// Normalized articulation sweep over its longest duration.
    pub fn articulation_curve(&self) -> [f32; RESPONSE_POINTS] {
        self.articulation.cutoff_curve()
    }

    pub fn wavetables(&self) -> &WavetableBank {
        &self.bank
    }
}
