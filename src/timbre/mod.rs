//! Timbre dimensions.
//!
//! Each mapper turns one bounded integer control into synthesis parameters
//! through a lookup table built at construction (and, where the table depends
//! on it, on sample-rate change). Updating a mapper with the value it already
//! holds is a no-op.

/// Articulation: a per-note cutoff sweep.
pub mod articulation;
/// Brightness: a static, note-relative cutoff.
pub mod brightness;
/// Envelope: attack/decay shaping and fixed-vs-sustained notes.
pub mod envelope;
/// Spectrum: operator network mix.
pub mod spectrum;

pub use articulation::ArticulationMapper;
pub use brightness::BrightnessMapper;
pub use envelope::{EnvelopeMapper, EnvelopeOverrides};
pub use spectrum::{AdvancedSpectrum, OperatorSettings, SpectrumMapper};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;
use crate::DIMENSION_STEPS;

/// Value every dimension starts at.
pub const DIMENSION_CENTER: u8 = 128;

/// Clamp any integer into `0..DIMENSION_STEPS`.
pub fn clamp_dimension(value: i32) -> u8 {
    value.clamp(0, DIMENSION_STEPS as i32 - 1) as u8
}

/// One of the four timbre dimensions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Spectrum,
    Brightness,
    Articulation,
    Envelope,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Spectrum,
        Dimension::Brightness,
        Dimension::Articulation,
        Dimension::Envelope,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Spectrum => "spectrum",
            Dimension::Brightness => "brightness",
            Dimension::Articulation => "articulation",
            Dimension::Envelope => "envelope",
        }
    }
}

/// Which filter stage a brightness or articulation value selects.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterZone {
    LowPass,
    AllPass,
    HighPass,
}

impl FilterZone {
    /// Filter response for this zone; `None` means the stage is bypassed.
    pub fn filter_type(self) -> Option<FilterType> {
        match self {
            FilterZone::LowPass => Some(FilterType::LowPass),
            FilterZone::AllPass => None,
            FilterZone::HighPass => Some(FilterType::HighPass),
        }
    }
}

/// Split of the dimension range into low-pass, all-pass and high-pass zones.
///
/// Values `<= low_pass_max` are low-pass, values `>= high_pass_min` are
/// high-pass, everything in between bypasses the filter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneLayout {
    pub low_pass_max: u8,
    pub high_pass_min: u8,
}

impl ZoneLayout {
    /// All-pass band of `width` (a fraction of the range) on each side of the
    /// center. The standard layout uses 0.05.
    pub fn with_all_pass_width(width: f32) -> Self {
        let width = width.clamp(0.0, 0.5);
        let steps = DIMENSION_STEPS as f32;
        let low_pass_max = (steps * (0.5 - width)) as i32;
        let high_pass_min = ((steps * (0.5 + width)) as i32).max(low_pass_max + 1);
        Self {
            low_pass_max: clamp_dimension(low_pass_max),
            high_pass_min: clamp_dimension(high_pass_min),
        }
    }

    pub fn zone(&self, value: u8) -> FilterZone {
        if value <= self.low_pass_max {
            FilterZone::LowPass
        } else if value >= self.high_pass_min {
            FilterZone::HighPass
        } else {
            FilterZone::AllPass
        }
    }

    /// Position inside the low-pass zone: 0 at value 0, 1 at its upper edge.
    pub(crate) fn low_pass_position(&self, value: u8) -> f32 {
        if self.low_pass_max == 0 {
            1.0
        } else {
            value as f32 / self.low_pass_max as f32
        }
    }

    /// Position inside the high-pass zone: 0 at its lower edge, approaching 1
    /// at the top of the range.
    pub(crate) fn high_pass_position(&self, value: u8) -> f32 {
        let span = DIMENSION_STEPS as f32 - self.high_pass_min as f32;
        if span <= 0.0 {
            0.0
        } else {
            (value as f32 - self.high_pass_min as f32) / span
        }
    }
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self::with_all_pass_width(0.05)
    }
}
