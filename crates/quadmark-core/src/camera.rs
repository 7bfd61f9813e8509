//! Pinhole camera with Brown–Conrady distortion.
//!
//! Coordinates follow the usual computer-vision convention: x right, y down,
//! z forward; pixel `(u, v)` is addressed by pixel index (pixel centres at
//! integers).

use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Radial (`k1, k2, k3`) and tangential (`p1, p2`) lens distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady5 {
    /// Build from coefficients in the common `[k1, k2, p1, p2, k3]` order.
    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs().iter().all(|&c| c == 0.0)
    }

    /// Apply distortion to an undistorted normalized point.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xy = x * y;
        let dx = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;
        Vector2::new(x * radial + dx, y * radial + dy)
    }

    /// Invert [`BrownConrady5::distort`] by fixed-point iteration.
    pub fn undistort(&self, n: Vector2<f64>) -> Vector2<f64> {
        if self.is_zero() {
            return n;
        }
        let mut u = n;
        for _ in 0..UNDISTORT_ITERS {
            let err = self.distort(u) - n;
            u -= err;
        }
        u
    }
}

const UNDISTORT_ITERS: usize = 20;

/// Why a [`CameraModel`] cannot be used.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CameraError {
    #[error("camera parameters must be finite")]
    NonFinite,
    #[error("focal lengths must be positive (fx={fx}, fy={fy})")]
    NonPositiveFocal { fx: f64, fy: f64 },
}

/// Camera intrinsics and distortion, fixed for the lifetime of a detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub distortion: BrownConrady5,
}

impl Default for CameraModel {
    /// The 1280x720 webcam calibration the marker pipeline was tuned on.
    fn default() -> Self {
        Self {
            fx: 947.215_854_896_464_2,
            fy: 949.846_014_361_774,
            cx: 652.569_297_135_965,
            cy: 366.380_131_132_092_8,
            distortion: BrownConrady5::from_coeffs([
                5.763_143_522_360_855e-2,
                -4.353_614_889_486_972_5e-1,
                -6.340_272_290_883_497e-3,
                1.184_858_349_111_448_5e-3,
                6.384_749_001_495_104e-1,
            ]),
        }
    }
}

impl CameraModel {
    /// Distortion-free pinhole camera.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            distortion: BrownConrady5::default(),
        }
    }

    pub fn with_distortion(mut self, distortion: BrownConrady5) -> Self {
        self.distortion = distortion;
        self
    }

    /// Intrinsic matrix `K`.
    pub fn k(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Check that the intrinsics describe a usable camera.
    pub fn validate(&self) -> Result<(), CameraError> {
        let all = [self.fx, self.fy, self.cx, self.cy];
        if !all.iter().chain(self.distortion.coeffs().iter()).all(|v| v.is_finite()) {
            return Err(CameraError::NonFinite);
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CameraError::NonPositiveFocal {
                fx: self.fx,
                fy: self.fy,
            });
        }
        Ok(())
    }

    /// Project a camera-frame point to pixels. `None` at or behind the camera plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= f64::EPSILON {
            return None;
        }
        let d = self.distortion.distort(Vector2::new(p.x / p.z, p.y / p.z));
        Some(Point2::new(self.fx * d.x + self.cx, self.fy * d.y + self.cy))
    }

    /// Pixel to undistorted normalized image coordinates.
    pub fn normalize(&self, px: &Point2<f64>) -> Point2<f64> {
        let d = Vector2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy);
        let u = self.distortion.undistort(d);
        Point2::new(u.x, u.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn undistort_inverts_distort_inside_the_image() {
        let cam = CameraModel::default();
        for px in [
            Point2::new(652.0, 366.0),
            Point2::new(100.0, 80.0),
            Point2::new(1200.0, 650.0),
            Point2::new(400.0, 600.0),
        ] {
            let n = cam.normalize(&px);
            let back = cam.project(&Point3::new(n.x, n.y, 1.0)).expect("in front");
            assert_relative_eq!(back.x, px.x, epsilon = 1e-3);
            assert_relative_eq!(back.y, px.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn pinhole_projection_matches_k() {
        let cam = CameraModel::pinhole(800.0, 810.0, 320.0, 240.0);
        let p = cam.project(&Point3::new(0.1, -0.05, 2.0)).expect("in front");
        assert_relative_eq!(p.x, 320.0 + 800.0 * 0.05, epsilon = 1e-12);
        assert_relative_eq!(p.y, 240.0 - 810.0 * 0.025, epsilon = 1e-12);
        assert!(cam.project(&Point3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn validation_rejects_bad_focal_length() {
        assert!(CameraModel::default().validate().is_ok());
        assert_eq!(
            CameraModel::pinhole(0.0, 1.0, 0.0, 0.0).validate(),
            Err(CameraError::NonPositiveFocal { fx: 0.0, fy: 1.0 })
        );
        assert_eq!(
            CameraModel::pinhole(f64::NAN, 1.0, 0.0, 0.0).validate(),
            Err(CameraError::NonFinite)
        );
    }

    #[test]
    fn deserializes_without_distortion() {
        let cam: CameraModel =
            serde_json::from_str(r#"{"fx":500,"fy":500,"cx":320,"cy":240}"#).expect("json");
        assert!(cam.distortion.is_zero());
    }
}
