//! Synthetic marker images with known ground truth.
//!
//! Used by tests, the benchmark and demos. Each image pixel is supersampled:
//! the viewing ray of every subsample is intersected with the marker plane
//! and the printed pattern is looked up there.

use nalgebra::{Point2, Point3, Vector3};
use quadmark_core::{CameraModel, GrayImage, Pose};
use quadmark_decode::{BitMatrix, CELLS};

/// Intensity of the printed black ink.
pub const INK: u8 = 10;
/// Intensity of the paper and of white cells.
pub const PAPER: u8 = 240;

/// One printed marker placed in front of the camera.
#[derive(Clone, Copy, Debug)]
pub struct PlacedMarker {
    pub bits: BitMatrix,
    /// Edge length of the black square, in scene units.
    pub length: f64,
    /// Marker frame to camera frame; marker x right, y down, z into the paper.
    pub pose: Pose,
}

impl PlacedMarker {
    /// Image positions of the four outer corners, canonical order.
    pub fn projected_corners(&self, camera: &CameraModel) -> Option<[Point2<f64>; 4]> {
        let h = 0.5 * self.length;
        let corners = [
            Point3::new(-h, -h, 0.0),
            Point3::new(h, -h, 0.0),
            Point3::new(h, h, 0.0),
            Point3::new(-h, h, 0.0),
        ];
        let mut out = [Point2::origin(); 4];
        for (dst, c) in out.iter_mut().zip(corners) {
            *dst = camera.project(&self.pose.transform_point(&c))?;
        }
        Some(out)
    }

    /// Printed intensity at marker-plane point `(x, y)`, `None` off the marker.
    fn ink_at(&self, x: f64, y: f64) -> Option<u8> {
        let cell = self.length / CELLS as f64;
        let col = ((x + 0.5 * self.length) / cell).floor();
        let row = ((y + 0.5 * self.length) / cell).floor();
        if !(0.0..CELLS as f64).contains(&col) || !(0.0..CELLS as f64).contains(&row) {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        let inner = (1..CELLS - 1).contains(&row) && (1..CELLS - 1).contains(&col);
        let white = inner && self.bits[row - 1][col - 1] != 0;
        Some(if white { PAPER } else { INK })
    }
}

/// Render `markers` on a sheet of paper that fills the view.
///
/// `supersample` subsamples per pixel axis (1 disables antialiasing).
pub fn render_scene(
    camera: &CameraModel,
    width: usize,
    height: usize,
    markers: &[PlacedMarker],
    supersample: usize,
) -> GrayImage {
    let ss = supersample.max(1);
    let inv: Vec<(Pose, Vector3<f64>)> = markers
        .iter()
        .map(|m| {
            let inv = m.pose.inverse();
            (inv, inv.translation)
        })
        .collect();

    let mut img = GrayImage::filled(width, height, PAPER);
    for v in 0..height {
        for u in 0..width {
            let mut acc = 0u32;
            for sy in 0..ss {
                for sx in 0..ss {
                    let px = Point2::new(
                        u as f64 - 0.5 + (sx as f64 + 0.5) / ss as f64,
                        v as f64 - 0.5 + (sy as f64 + 0.5) / ss as f64,
                    );
                    let n = camera.normalize(&px);
                    let ray = Vector3::new(n.x, n.y, 1.0);
                    let mut value = PAPER;
                    let mut nearest = f64::INFINITY;
                    for (m, (cam_to_marker, origin)) in markers.iter().zip(&inv) {
                        // ray origin and direction in the marker frame
                        let dir = cam_to_marker.rotation * ray;
                        if dir.z.abs() < 1e-12 {
                            continue;
                        }
                        let lambda = -origin.z / dir.z;
                        if lambda <= 0.0 || lambda >= nearest {
                            continue;
                        }
                        let hit = origin + dir * lambda;
                        if let Some(ink) = m.ink_at(hit.x, hit.y) {
                            value = ink;
                            nearest = lambda;
                        }
                    }
                    acc += value as u32;
                }
            }
            let n = (ss * ss) as u32;
            img.set(u, v, ((acc + n / 2) / n) as u8);
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;
    use quadmark_decode::CODEBOOK;

    #[test]
    fn frontal_marker_covers_expected_pixels() {
        let camera = CameraModel::pinhole(500.0, 500.0, 50.0, 50.0);
        let marker = PlacedMarker {
            bits: CODEBOOK.compose([0, 0, 0, 0, 0]).expect("valid words"),
            length: 0.14,
            pose: Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 1.0)),
        };
        // 70 px wide square centred on the principal point
        let img = render_scene(&camera, 100, 100, &[marker], 1);
        assert_eq!(img.get(50, 50), INK);
        assert_eq!(img.get(16, 50), INK);
        assert_eq!(img.get(10, 50), PAPER);
        // row 1, column 1 is a white data cell
        assert_eq!(img.get(15 + 15, 15 + 15), PAPER);

        let corners = marker.projected_corners(&camera).expect("visible");
        assert!((corners[0] - Point2::new(15.0, 15.0)).norm() < 1e-9);
        assert!((corners[2] - Point2::new(85.0, 85.0)).norm() < 1e-9);
    }
}
