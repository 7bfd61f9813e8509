use crate::core::{ChannelOrder, Frame, GrayImage};
use crate::detector::{DetectConfig, DetectError, DetectReport, IoError, Marker, MarkerDetector};
use ::image::DynamicImage;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum QuadmarkError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error("no input image given")]
    MissingImage,
}

/// Borrow an `image::GrayImage` as a detector frame.
pub fn gray_frame(img: &::image::GrayImage) -> Frame<'_> {
    Frame::new(
        img.width() as usize,
        img.height() as usize,
        ChannelOrder::Gray,
        img.as_raw(),
    )
}

/// Borrow an `image::RgbImage` as a detector frame.
pub fn rgb_frame(img: &::image::RgbImage) -> Frame<'_> {
    Frame::new(
        img.width() as usize,
        img.height() as usize,
        ChannelOrder::Rgb,
        img.as_raw(),
    )
}

/// Borrow an `image::RgbaImage` as a detector frame.
pub fn rgba_frame(img: &::image::RgbaImage) -> Frame<'_> {
    Frame::new(
        img.width() as usize,
        img.height() as usize,
        ChannelOrder::Rgba,
        img.as_raw(),
    )
}

/// Detect markers in any decoded image.
///
/// 8-bit gray, RGB and RGBA buffers are borrowed directly; other pixel
/// formats are converted to RGB first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, img), fields(width = img.width(), height = img.height()))
)]
pub fn detect_image(detector: &MarkerDetector, img: &DynamicImage) -> Result<Vec<Marker>, DetectError> {
    match img {
        DynamicImage::ImageLuma8(gray) => detector.detect(&gray_frame(gray)),
        DynamicImage::ImageRgb8(rgb) => detector.detect(&rgb_frame(rgb)),
        DynamicImage::ImageRgba8(rgba) => detector.detect(&rgba_frame(rgba)),
        other => detector.detect(&rgb_frame(&other.to_rgb8())),
    }
}

/// Copy an `image::GrayImage` into the crate's owned gray image.
pub fn to_gray_image(img: &::image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Load `image_path`, run the detector described by `cfg` and build a report.
///
/// Configuration and image errors are returned; the report itself always
/// reflects a completed detection run.
pub fn run_config(cfg: &DetectConfig, image_path: &Path) -> Result<DetectReport, QuadmarkError> {
    let detector = cfg.build_detector()?;
    log::info!("loading image {}", image_path.display());
    let img = ::image::open(image_path)?;
    log::info!("image size {}x{}", img.width(), img.height());

    let mut report = DetectReport::new(cfg, img.width() as usize, img.height() as usize);
    report.image_path = Some(image_path.to_string_lossy().into_owned());
    match detect_image(&detector, &img) {
        Ok(markers) => {
            log::info!("{} markers detected", markers.len());
            report.set_markers(markers);
        }
        Err(err) => {
            log::warn!("detection failed: {err}");
            report.set_error(&err);
        }
    }
    Ok(report)
}
