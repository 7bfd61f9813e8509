//! Reading the 7x7 cell grid of a rectified patch.

use crate::codebook::{Codebook, CELLS, GRID};
use crate::matcher::{match_bits, BitMatrix, Match};
use crate::threshold::otsu_threshold;
use quadmark_core::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why a patch produced no bit matrix.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch {width}x{height} is not a square of at least {CELLS} px")]
    BadSize { width: usize, height: usize },
    #[error("border cell ({row}, {col}) is mostly white")]
    BorderNotDark { row: usize, col: usize },
}

/// Count white pixels (`> threshold`) in cell `(row, col)`.
fn white_count(patch: &GrayImage, cell: usize, row: usize, col: usize, threshold: u8) -> usize {
    let (x0, y0) = (col * cell, row * cell);
    (y0..y0 + cell)
        .map(|y| {
            let start = y * patch.width + x0;
            patch.data[start..start + cell]
                .iter()
                .filter(|&&v| v > threshold)
                .count()
        })
        .sum()
}

/// Binarize the patch with its own Otsu threshold, check the dark border
/// ring and read the inner 5x5 bits.
///
/// Border rows 0 and 6 are checked over all seven cells; rows 1..=5 only at
/// columns 0 and 6. A border cell fails when more than half its pixels are
/// white; an inner cell is 1 when more than half are white.
pub fn read_bits(patch: &GrayImage) -> Result<BitMatrix, PatchError> {
    if patch.width != patch.height || patch.width < CELLS {
        return Err(PatchError::BadSize {
            width: patch.width,
            height: patch.height,
        });
    }

    let threshold = otsu_threshold(&patch.data);
    let cell = patch.width / CELLS;
    let area = cell * cell;

    for row in 0..CELLS {
        let step = if row == 0 || row == CELLS - 1 { 1 } else { CELLS - 1 };
        for col in (0..CELLS).step_by(step) {
            if 2 * white_count(patch, cell, row, col, threshold) > area {
                return Err(PatchError::BorderNotDark { row, col });
            }
        }
    }

    let mut bits = [[0u8; GRID]; GRID];
    for (r, out_row) in bits.iter_mut().enumerate() {
        for (c, bit) in out_row.iter_mut().enumerate() {
            let white = white_count(patch, cell, r + 1, c + 1, threshold);
            *bit = u8::from(2 * white > area);
        }
    }
    Ok(bits)
}

/// Full patch decoding: border check, bit extraction and codebook match.
///
/// Any failure is reported as an invalid [`Match`].
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip_all, fields(size = patch.width))
)]
pub fn decode_patch(codebook: &Codebook, patch: &GrayImage) -> Match {
    match read_bits(patch) {
        Ok(bits) => match_bits(codebook, &bits),
        Err(err) => {
            log::trace!("patch rejected: {err}");
            Match::invalid()
        }
    }
}

/// Draw the canonical patch for `bits`: black border, white cells for 1.
///
/// Pixels beyond `7 * (size / 7)` stay black.
pub fn render_patch(bits: &BitMatrix, size: usize) -> GrayImage {
    let mut img = GrayImage::filled(size, size, 0);
    let cell = size / CELLS;
    for (r, row) in bits.iter().enumerate() {
        for (c, &bit) in row.iter().enumerate() {
            if bit == 0 {
                continue;
            }
            let (x0, y0) = ((c + 1) * cell, (r + 1) * cell);
            for y in y0..y0 + cell {
                for x in x0..x0 + cell {
                    img.set(x, y, 255);
                }
            }
        }
    }
    img
}
