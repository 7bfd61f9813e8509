//! The fixed row codebook.

use crate::BitMatrix;

/// Number of data rows and columns inside the border.
pub const GRID: usize = 5;

/// Cells per side including the one-cell border.
pub const CELLS: usize = GRID + 2;

/// Allowed 5-bit row patterns. Every data row of a valid marker is one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codebook {
    pub rows: [[u8; GRID]; 4],
}

/// The codebook printed markers are generated from.
pub const CODEBOOK: Codebook = Codebook {
    rows: [
        [1, 0, 0, 0, 0],
        [1, 0, 1, 1, 1],
        [0, 1, 0, 0, 1],
        [0, 1, 1, 1, 0],
    ],
};

impl Codebook {
    /// Smallest Hamming distance from `row` to any codebook row.
    pub fn row_distance(&self, row: &[u8; GRID]) -> u32 {
        self.rows
            .iter()
            .map(|word| word.iter().zip(row).filter(|(a, b)| a != b).count() as u32)
            .min()
            .unwrap_or(GRID as u32)
    }

    /// Sum of per-row distances. Rows are matched independently of each other.
    pub fn score(&self, bits: &BitMatrix) -> u32 {
        bits.iter().map(|row| self.row_distance(row)).sum()
    }

    /// Build the bit matrix whose rows are codebook words `words[r]`.
    ///
    /// Returns `None` if any index is out of range.
    pub fn compose(&self, words: [usize; GRID]) -> Option<BitMatrix> {
        let mut out = [[0u8; GRID]; GRID];
        for (dst, w) in out.iter_mut().zip(words) {
            *dst = *self.rows.get(w)?;
        }
        Some(out)
    }
}

impl Default for Codebook {
    fn default() -> Self {
        CODEBOOK
    }
}
