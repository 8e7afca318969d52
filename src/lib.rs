pub mod config;
pub mod dsp;
pub mod io;
pub mod synth; // The voice and its cross-thread control block
pub mod timbre; // Dimension value -> synthesis parameter mappers

pub use config::{ConfigError, VoiceConfig};
pub use synth::{Voice, VoiceControls};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Every timbre dimension takes values in `0..DIMENSION_STEPS`.
pub const DIMENSION_STEPS: usize = 256;

