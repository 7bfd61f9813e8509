//! High-level facade crate for the `quadmark-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - (feature-gated) helpers that run the marker detector on `image` buffers
//!   and produce JSON reports
//!
//! ## Quickstart
//!
//! ```no_run
//! use quadmark::detect;
//! use quadmark::{CameraModel, DetectorParams, MarkerDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("frame.png")?;
//! let detector = MarkerDetector::new(CameraModel::default(), DetectorParams::default())?;
//!
//! for marker in detect::detect_image(&detector, &img)? {
//!     println!("marker {} at {:?}", marker.id, marker.pose.translation);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `quadmark::core`: frames, gray images, homographies, camera model, poses
//!   and OpenGL hand-off matrices.
//! - `quadmark::decode`: codebook, patch reading and rotation disambiguation.
//! - `quadmark::detector`: the detection pipeline, its parameters and JSON I/O.
//! - `quadmark::detect` (feature `image`): helpers from `image` buffers.

pub use quadmark_core as core;
pub use quadmark_decode as decode;
pub use quadmark_detect as detector;

pub use quadmark_core::{CameraModel, ChannelOrder, Frame, Pose};
pub use quadmark_detect::{DetectConfig, DetectReport, DetectorParams, Marker, MarkerDetector};

#[cfg(feature = "image")]
pub mod detect;
