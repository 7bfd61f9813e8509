//! Identity decoding for square fiducial markers.
//!
//! This crate focuses on:
//! - the fixed row codebook the markers are printed from,
//! - reading the 7x7 cell grid of a rectified patch (dark border, 5x5 data),
//! - scoring the four orientations and extracting the 10-bit identity.
//!
//! It does **not** find markers in an image. It expects a canonical square
//! patch, for example produced by `quadmark-detect` after rectification.

mod codebook;
mod matcher;
mod patch;
mod threshold;

pub use codebook::{Codebook, CELLS, CODEBOOK, GRID};
pub use matcher::{
    bits_to_id, match_bits, rotate_ccw, rotate_cw, rotation_variants, BitMatrix, Match,
    INVALID_ID,
};
pub use patch::{decode_patch, read_bits, render_patch, PatchError};
pub use threshold::otsu_threshold;
