//! Fixed frequency tables indexing every per-band array.

use serde::{Deserialize, Serialize};

/// 1/3-octave grid (Hz) used by 19-point arrays.
pub const FREQS_19: [u32; 19] = [
    125, 160, 200, 250, 315, 400, 500, 630, 800, 1000, 1250, 1600, 2000, 2500, 3150, 4000, 5000,
    6300, 8000,
];

/// Audiometric grid (Hz) used by 9-point arrays.
pub const FREQS_9: [u32; 9] = [250, 500, 1000, 1500, 2000, 3000, 4000, 6000, 8000];

/// Length of input/output curves swept over input level.
pub const SWEPT_LEVEL_LEN: usize = 100;

/// "Not measured" marker in 9-point audiometric arrays. Distinct from a real 0 dB.
pub const NOT_MEASURED: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandGrid {
    Audiometric,
    ThirdOctave,
}

impl BandGrid {
    pub fn freqs(self) -> &'static [u32] {
        match self {
            BandGrid::Audiometric => &FREQS_9,
            BandGrid::ThirdOctave => &FREQS_19,
        }
    }

    pub fn len(self) -> usize {
        self.freqs().len()
    }

    /// Grid whose length matches `len`, if any.
    pub fn for_len(len: usize) -> Option<BandGrid> {
        match len {
            9 => Some(BandGrid::Audiometric),
            19 => Some(BandGrid::ThirdOctave),
            _ => None,
        }
    }

    pub fn freq_at(self, index: usize) -> Option<u32> {
        self.freqs().get(index).copied()
    }
}
