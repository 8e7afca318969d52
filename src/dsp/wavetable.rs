use std::f32::consts::TAU;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Samples per single-cycle table.
pub const WAVETABLE_SIZE: usize = 512;

/// Waveform stored in a [`WavetableBank`]. The discriminant is the table index.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveshape {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
}

impl Waveshape {
    pub const ALL: [Waveshape; 4] = [
        Waveshape::Sine,
        Waveshape::Triangle,
        Waveshape::Square,
        Waveshape::Saw,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`Waveshape::index`]; out-of-range indices fall back to sine.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveshape::Sine => "sine",
            Waveshape::Triangle => "triangle",
            Waveshape::Square => "square",
            Waveshape::Saw => "saw",
        }
    }
}

/// Immutable collection of single-cycle waveforms, one per [`Waveshape`].
///
/// Built once and shared by handle: cloning only bumps a reference count, so
/// every operator in a network reads the same memory and nothing is ever
/// rebuilt on the audio path.
#[derive(Clone)]
pub struct WavetableBank {
    tables: Arc<[Box<[f32]>]>,
}

impl WavetableBank {
    /// Build the standard bank: sine, triangle, square and saw, all in [-1, 1].
    pub fn new() -> Self {
        let len = WAVETABLE_SIZE as f32;
        let half = WAVETABLE_SIZE / 2;

        let tables: Vec<Box<[f32]>> = Waveshape::ALL
            .iter()
            .map(|shape| {
                (0..WAVETABLE_SIZE)
                    .map(|i| {
                        let x = i as f32;
                        match shape {
                            // One extra slot in the divisor keeps the last
                            // sample from duplicating the first on wrap.
                            Waveshape::Sine => (TAU * x / (len + 1.0)).sin(),
                            Waveshape::Triangle if i < half => 4.0 * x / len - 1.0,
                            Waveshape::Triangle => 3.0 - 4.0 * x / len,
                            Waveshape::Square if i < half => 1.0,
                            Waveshape::Square => -1.0,
                            Waveshape::Saw => 2.0 * (len - x) / len - 1.0,
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            tables: tables.into(),
        }
    }

    /// Bank from caller-supplied tables, indexed in [`Waveshape`] order.
    /// Missing shapes read as empty tables, which operators render as silence.
    pub fn from_tables(tables: Vec<Vec<f32>>) -> Self {
        let tables: Vec<Box<[f32]>> = tables.into_iter().map(Vec::into_boxed_slice).collect();
        Self {
            tables: tables.into(),
        }
    }

    pub fn table(&self, shape: Waveshape) -> &[f32] {
        self.tables.get(shape.index()).map(|t| &t[..]).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// True when both handles point at the same underlying tables.
    pub fn shares_storage_with(&self, other: &WavetableBank) -> bool {
        Arc::ptr_eq(&self.tables, &other.tables)
    }
}

impl Default for WavetableBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_table_per_shape() {
        let bank = WavetableBank::new();
        assert_eq!(bank.len(), Waveshape::ALL.len());
        for shape in Waveshape::ALL {
            assert_eq!(bank.table(shape).len(), WAVETABLE_SIZE, "{}", shape.name());
        }
    }

    #[test]
    fn tables_stay_in_unit_range() {
        let bank = WavetableBank::new();
        for shape in Waveshape::ALL {
            assert!(
                bank.table(shape).iter().all(|s| (-1.0..=1.0).contains(s)),
                "{} table escapes [-1, 1]",
                shape.name()
            );
        }
    }

    #[test]
    fn shape_landmarks() {
        let bank = WavetableBank::new();
        let half = WAVETABLE_SIZE / 2;

        assert_eq!(bank.table(Waveshape::Sine)[0], 0.0);
        assert_eq!(bank.table(Waveshape::Triangle)[0], -1.0);
        assert_eq!(bank.table(Waveshape::Triangle)[half], 1.0);
        assert_eq!(bank.table(Waveshape::Square)[half - 1], 1.0);
        assert_eq!(bank.table(Waveshape::Square)[half], -1.0);
        assert_eq!(bank.table(Waveshape::Saw)[0], 1.0);
    }

    #[test]
    fn clones_share_storage() {
        let bank = WavetableBank::new();
        let handle = bank.clone();
        assert!(bank.shares_storage_with(&handle));
        assert!(!bank.shares_storage_with(&WavetableBank::new()));
    }

    #[test]
    fn missing_tables_read_empty() {
        let bank = WavetableBank::from_tables(vec![vec![0.0; 8]]);
        assert_eq!(bank.table(Waveshape::Sine).len(), 8);
        assert!(bank.table(Waveshape::Saw).is_empty());
    }
}
