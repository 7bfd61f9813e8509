//! Rotation disambiguation and identity extraction.

use crate::codebook::{Codebook, GRID};
use serde::{Deserialize, Serialize};

/// Inner data bits, `bits[row][col]`, 1 = white cell.
pub type BitMatrix = [[u8; GRID]; GRID];

/// Identity reported for candidates that do not decode.
pub const INVALID_ID: i32 = -1;

/// Outcome of matching one observed bit matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// 10-bit identity, or [`INVALID_ID`].
    pub id: i32,
    /// Quarter turns `0..=3` that bring the observation to canonical orientation.
    pub rotation: u8,
    /// Best (lowest) codebook score among the four orientations.
    pub score: u32,
}

impl Match {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }

    pub fn invalid() -> Self {
        Self {
            id: INVALID_ID,
            rotation: 0,
            score: u32::MAX,
        }
    }
}

/// One quarter turn counterclockwise: `out[i][j] = m[j][n - 1 - i]`.
pub fn rotate_ccw(m: &BitMatrix) -> BitMatrix {
    let mut out = [[0u8; GRID]; GRID];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = m[j][GRID - 1 - i];
        }
    }
    out
}

/// One quarter turn clockwise, the inverse of [`rotate_ccw`].
pub fn rotate_cw(m: &BitMatrix) -> BitMatrix {
    let mut out = [[0u8; GRID]; GRID];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = m[GRID - 1 - j][i];
        }
    }
    out
}

/// `variants[k]` is `m` turned counterclockwise `k` times.
pub fn rotation_variants(m: &BitMatrix) -> [BitMatrix; 4] {
    let r1 = rotate_ccw(m);
    let r2 = rotate_ccw(&r1);
    let r3 = rotate_ccw(&r2);
    [*m, r1, r2, r3]
}

/// Columns 1 and 3 of every row, row 0 in the most significant position.
pub fn bits_to_id(m: &BitMatrix) -> i32 {
    m.iter().fold(0i32, |acc, row| {
        (acc << 2) | ((row[1] as i32 & 1) << 1) | (row[3] as i32 & 1)
    })
}

/// Score all four orientations and keep the best one.
///
/// Ties go to the lowest rotation index. Only an exact match (score 0)
/// yields an identity.
pub fn match_bits(codebook: &Codebook, observed: &BitMatrix) -> Match {
    let variants = rotation_variants(observed);
    let scores = variants.map(|v| codebook.score(&v));

    let mut best = 0usize;
    for k in 1..4 {
        if scores[k] < scores[best] {
            best = k;
        }
    }

    if scores[best] != 0 {
        return Match {
            id: INVALID_ID,
            rotation: best as u8,
            score: scores[best],
        };
    }

    Match {
        id: bits_to_id(&variants[best]),
        rotation: best as u8,
        score: 0,
    }
}
