//! Core types and utilities for square fiducial marker detection.
//!
//! This crate is small and purely geometric: borrowed frames and gray images,
//! four-point homographies and patch warping, a pinhole camera with
//! Brown–Conrady distortion, rigid poses, and the matrices handed to an
//! OpenGL renderer. It has no notion of markers or codebooks.

mod camera;
pub mod gl;
mod homography;
mod image;
mod logger;
mod pose;

pub use camera::{BrownConrady5, CameraError, CameraModel};
pub use homography::{homography_from_4pt, warp_to_patch, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, ChannelOrder, Frame, GrayImage, GrayImageView};
pub use pose::{rodrigues, rodrigues_inverse, Pose};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
