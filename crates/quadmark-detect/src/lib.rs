//! Square fiducial marker detection.
//!
//! Current focus:
//! - candidate quadrilaterals from an inverted adaptive threshold and border
//!   following,
//! - rectification and identity decoding (via `quadmark-decode`),
//! - subpixel corners in canonical order and a metric pose per marker.
//!
//! Image operations go through the [`VisionOps`] trait; [`NativeOps`] is the
//! default pure-Rust backend.

pub mod contour;
mod detector;
mod io;
pub mod pnp;
pub mod preprocess;
pub mod quad;
pub mod refine;
pub mod synthetic;
mod vision;

pub use detector::{DecodedQuad, DetectError, DetectorParams, Marker, MarkerDetector, ParamsError};
pub use io::{DetectConfig, DetectReport, IoError, MarkerReport};
pub use quad::Quad;
pub use refine::SubpixParams;
pub use vision::{NativeOps, RvecTvec, VisionOps};

pub use quadmark_core::{CameraError, CameraModel, ChannelOrder, Frame, GrayImage, Pose};
