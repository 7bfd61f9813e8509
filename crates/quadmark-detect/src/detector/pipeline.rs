use super::{DecodedQuad, DetectError, DetectorParams, Marker};
use crate::contour::arc_length;
use crate::pnp::unit_square;
use crate::preprocess::adaptive_threshold_inv;
use crate::quad::{remove_near_duplicates, Quad};
use crate::vision::{NativeOps, VisionOps};
use nalgebra::Point2;
use quadmark_core::{CameraModel, Frame, GrayImage, Pose};
use quadmark_decode::{decode_patch, Codebook, CODEBOOK};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Square fiducial marker detector for one fixed camera.
///
/// The camera model, parameters and codebook are immutable for the lifetime
/// of the detector; [`MarkerDetector::detect`] takes `&self` and keeps all
/// scratch state local to the call.
#[derive(Clone, Debug)]
pub struct MarkerDetector<V: VisionOps = NativeOps> {
    camera: CameraModel,
    params: DetectorParams,
    codebook: Codebook,
    ops: V,
}

impl MarkerDetector<NativeOps> {
    /// Create a detector backed by the pure-Rust image operations.
    pub fn new(camera: CameraModel, params: DetectorParams) -> Result<Self, DetectError> {
        Self::with_ops(camera, params, NativeOps)
    }
}

impl<V: VisionOps> MarkerDetector<V> {
    /// Create a detector that routes image operations through `ops`.
    pub fn with_ops(camera: CameraModel, params: DetectorParams, ops: V) -> Result<Self, DetectError> {
        camera.validate()?;
        params.validate()?;
        Ok(Self {
            camera,
            params,
            codebook: CODEBOOK,
            ops,
        })
    }

    #[inline]
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    #[inline]
    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    #[inline]
    pub fn ops(&self) -> &V {
        &self.ops
    }

    /// Detect every marker visible in `frame`.
    ///
    /// An empty frame yields no markers. Markers are returned in candidate
    /// order; a marker whose pose cannot be solved is omitted.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn detect(&self, frame: &Frame<'_>) -> Result<Vec<Marker>, DetectError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let expected = frame.expected_len().ok_or(DetectError::FrameTooLarge {
            width: frame.width,
            height: frame.height,
        })?;
        if expected != frame.data.len() {
            return Err(DetectError::InvalidFrameBuffer {
                expected,
                got: frame.data.len(),
            });
        }
        let gray = frame.to_gray().ok_or(DetectError::InvalidFrameBuffer {
            expected,
            got: frame.data.len(),
        })?;
        Ok(self.detect_gray(&gray))
    }

    /// Run the full pipeline on an already grayscale image.
    pub fn detect_gray(&self, gray: &GrayImage) -> Vec<Marker> {
        if gray.width == 0 || gray.height == 0 {
            return Vec::new();
        }
        let binary = self.binarize(gray);
        let quads = self.find_candidates(&binary);
        let decoded = self.decode_candidates(gray, &quads);
        if decoded.is_empty() {
            log::debug!("no candidate decoded ({} quads)", quads.len());
            return Vec::new();
        }
        let markers = self.finalize(gray, decoded);
        log::debug!("detected {} markers", markers.len());
        markers
    }

    /// Inverted Gaussian adaptive threshold: dark regions become foreground.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn binarize(&self, gray: &GrayImage) -> GrayImage {
        adaptive_threshold_inv(gray, self.params.adaptive_window, self.params.adaptive_c)
    }

    /// Convex quadrilateral candidates of a binary image.
    ///
    /// Every returned quad has non-negative winding, no pair of adjacent
    /// corners closer than `min_corner_dist_sq`, and no near-duplicate.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn find_candidates(&self, binary: &GrayImage) -> Vec<Quad> {
        let contours = self.ops.find_contours(binary);
        let total = contours.len();

        let mut quads = Vec::new();
        for contour in contours
            .iter()
            .filter(|c| c.len() >= self.params.min_contour_points)
        {
            let epsilon = self.params.poly_epsilon_rel * arc_length(contour);
            let poly = self.ops.approx_polygon(contour, epsilon);
            if poly.len() != 4 || !self.ops.is_convex(&poly) {
                continue;
            }
            let mut quad = Quad::new(std::array::from_fn(|i| {
                Point2::new(poly[i].x as f32, poly[i].y as f32)
            }));
            if quad.min_side_sq() <= self.params.min_corner_dist_sq {
                log::trace!("quad rejected: side too short {:?}", quad.corners);
                continue;
            }
            quad.normalize_winding();
            quads.push(quad);
        }

        let before = quads.len();
        let quads = remove_near_duplicates(quads, self.params.near_dist_sq);
        log::debug!(
            "contours={} quads={} after_dedup={}",
            total,
            before,
            quads.len()
        );
        quads
    }

    /// Rectify and decode each candidate, keeping only valid identities.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(candidates = quads.len())))]
    pub fn decode_candidates(&self, gray: &GrayImage, quads: &[Quad]) -> Vec<DecodedQuad> {
        let view = gray.view();
        quads
            .iter()
            .filter_map(|quad| {
                let Some(patch) = self.ops.warp_quad(&view, &quad.corners, self.params.patch_size) else {
                    log::trace!("quad rejected: singular rectification {:?}", quad.corners);
                    return None;
                };
                let decoded = decode_patch(&self.codebook, &patch);
                if !decoded.is_valid() {
                    log::trace!("quad rejected: score {}", decoded.score);
                    return None;
                }
                Some(DecodedQuad {
                    quad: *quad,
                    decoded,
                })
            })
            .collect()
    }

    /// Refine corners of all decoded candidates together, reorder them to
    /// canonical order and solve each pose.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(decoded = decoded.len())))]
    fn finalize(&self, gray: &GrayImage, decoded: Vec<DecodedQuad>) -> Vec<Marker> {
        let mut corners: Vec<Point2<f32>> = decoded
            .iter()
            .flat_map(|d| d.quad.corners)
            .collect();
        self.ops
            .refine_corners(&gray.view(), &mut corners, &self.params.subpix);

        decoded
            .iter()
            .zip(corners.chunks_exact(4))
            .filter_map(|(d, refined)| {
                let quad = Quad::new([refined[0], refined[1], refined[2], refined[3]])
                    .rotated_left(d.decoded.rotation);
                let Some(pose) = self.estimate_pose(&quad.corners) else {
                    log::trace!("marker {} omitted: no pose", d.decoded.id);
                    return None;
                };
                Some(Marker {
                    id: d.decoded.id,
                    rotation: d.decoded.rotation,
                    corners: quad.corners,
                    pose,
                })
            })
            .collect()
    }

    /// Marker-in-camera pose from canonical-order corners, scaled to
    /// `marker_length` units.
    pub fn estimate_pose(&self, corners: &[Point2<f32>; 4]) -> Option<Pose> {
        let (rvec, tvec) = self.ops.solve_pnp(&unit_square(), corners, &self.camera)?;
        let camera_in_marker = Pose::new(self.ops.rotation_matrix(&rvec), tvec);
        let pose = camera_in_marker.inverse().scaled(self.params.marker_length);
        pose.is_finite().then_some(pose)
    }
}
