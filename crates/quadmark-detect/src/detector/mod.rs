//! Marker detection pipeline.
//!
//! This module wires together adaptive thresholding, contour extraction,
//! quadrilateral filtering, patch decoding, subpixel corner refinement and
//! pose estimation behind [`MarkerDetector`].

mod error;
mod params;
mod pipeline;
mod result;

pub use error::{DetectError, ParamsError};
pub use params::DetectorParams;
pub use pipeline::MarkerDetector;
pub use result::{DecodedQuad, Marker};
