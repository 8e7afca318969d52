//! Construction-time voice settings.
//!
//! [`VoiceConfig`] collects what a host knows before the audio stream starts:
//! the stream rate, the initial note and the starting position of each
//! dimension. Runtime changes go through [`VoiceControls`](crate::VoiceControls)
//! instead.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timbre::{Dimension, DIMENSION_CENTER};

const MIN_SAMPLE_RATE: f32 = 8_000.0;
const MAX_SAMPLE_RATE: f32 = 384_000.0;

/// Reasons a [`VoiceConfig`] cannot build a voice.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate {0} Hz outside [8000, 384000]")]
    SampleRate(f32),

    /// Frequencies must be positive and below Nyquist.
    #[error("frequency {frequency} Hz invalid at sample rate {sample_rate} Hz")]
    Frequency { frequency: f32, sample_rate: f32 },

    #[error("resonance factor {0} must be finite and positive")]
    Resonance(f32),
}

/// Settings for a new [`Voice`](crate::Voice).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub sample_rate: f32,
    pub frequency: f32,
    /// Note resonance, normally derived from velocity.
    pub resonance: f32,
    /// Starting values, indexed by [`Dimension::index`].
    pub dimensions: [u8; 4],
    pub advanced: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            frequency: 440.0,
            resonance: 1.0,
            dimensions: [DIMENSION_CENTER; 4],
            advanced: false,
        }
    }
}

impl VoiceConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension, value: u8) -> Self {
        self.dimensions[dimension.index()] = value;
        self
    }

    pub fn dimension(&self, dimension: Dimension) -> u8 {
        self.dimensions[dimension.index()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        let nyquist = self.sample_rate * 0.5;
        if !(self.frequency > 0.0 && self.frequency < nyquist) {
            return Err(ConfigError::Frequency {
                frequency: self.frequency,
                sample_rate: self.sample_rate,
            });
        }
        if !(self.resonance.is_finite() && self.resonance > 0.0) {
            return Err(ConfigError::Resonance(self.resonance));
        }
        Ok(())
    }
}
