//! Image-processing primitives the detector depends on.
//!
//! [`MarkerDetector`](crate::MarkerDetector) only talks to the image through
//! [`VisionOps`], so an alternative backend (or a test double) can be swapped
//! in without touching the pipeline. [`NativeOps`] is the pure-Rust default.

use crate::contour::{self, Contour};
use crate::pnp;
use crate::quad;
use crate::refine::{self, SubpixParams};
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use quadmark_core::{homography_from_4pt, rodrigues, warp_to_patch, CameraModel, GrayImage, GrayImageView};

/// Rotation vector and translation vector, in that order.
pub type RvecTvec = (Vector3<f64>, Vector3<f64>);

pub trait VisionOps {
    /// Outer and hole borders of the nonzero pixels of `binary`, flat.
    fn find_contours(&self, binary: &GrayImage) -> Vec<Contour>;

    /// Closed polygon approximation of `contour` with tolerance `epsilon` px.
    fn approx_polygon(&self, contour: &[Point2<i32>], epsilon: f64) -> Vec<Point2<i32>>;

    fn is_convex(&self, polygon: &[Point2<i32>]) -> bool;

    /// Resample the quadrilateral `corners` of `gray` into a `size x size`
    /// patch; corner `i` maps to patch corner `i` of `(0,0) (S,0) (S,S) (0,S)`.
    fn warp_quad(&self, gray: &GrayImageView<'_>, corners: &[Point2<f32>; 4], size: usize) -> Option<GrayImage>;

    /// Subpixel refinement of a batch of corners, in place.
    fn refine_corners(&self, gray: &GrayImageView<'_>, corners: &mut [Point2<f32>], params: &SubpixParams);

    /// Solve the pose from planar object points and their image points.
    ///
    /// The result is the camera's pose in the object frame (`x_obj = R x_cam + t`).
    fn solve_pnp(&self, object: &[Point3<f64>; 4], image: &[Point2<f32>; 4], camera: &CameraModel) -> Option<RvecTvec>;

    /// Rotation vector to rotation matrix.
    fn rotation_matrix(&self, rvec: &Vector3<f64>) -> Matrix3<f64>;
}

/// Pure-Rust implementation of [`VisionOps`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeOps;

impl VisionOps for NativeOps {
    fn find_contours(&self, binary: &GrayImage) -> Vec<Contour> {
        contour::find_contours(binary)
    }

    fn approx_polygon(&self, contour: &[Point2<i32>], epsilon: f64) -> Vec<Point2<i32>> {
        quad::approx_poly_dp(contour, epsilon)
    }

    fn is_convex(&self, polygon: &[Point2<i32>]) -> bool {
        quad::is_convex(polygon)
    }

    fn warp_quad(&self, gray: &GrayImageView<'_>, corners: &[Point2<f32>; 4], size: usize) -> Option<GrayImage> {
        let s = size as f64;
        let patch = [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ];
        let img = corners.map(|p| Point2::new(p.x as f64, p.y as f64));
        let h_img_from_patch = homography_from_4pt(&patch, &img)?;
        Some(warp_to_patch(gray, &h_img_from_patch, size))
    }

    fn refine_corners(&self, gray: &GrayImageView<'_>, corners: &mut [Point2<f32>], params: &SubpixParams) {
        refine::refine_corners(gray, corners, params);
    }

    fn solve_pnp(&self, object: &[Point3<f64>; 4], image: &[Point2<f32>; 4], camera: &CameraModel) -> Option<RvecTvec> {
        let image = image.map(|p| Point2::new(p.x as f64, p.y as f64));
        let object_in_camera = pnp::solve_planar_pnp(object, &image, camera)?;
        let camera_in_object = object_in_camera.inverse();
        Some((camera_in_object.rvec(), camera_in_object.translation))
    }

    fn rotation_matrix(&self, rvec: &Vector3<f64>) -> Matrix3<f64> {
        rodrigues(rvec)
    }
}
