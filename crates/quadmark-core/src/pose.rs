//! Rigid transforms.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation vector (axis times angle, radians) to rotation matrix.
pub fn rodrigues(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rvec).into_inner()
}

/// Rotation matrix to rotation vector. The input is projected onto SO(3) first.
pub fn rodrigues_inverse(r: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix(r).scaled_axis()
}

/// Rigid transform `x_dst = rotation * x_src + translation`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    pub fn from_rvec_tvec(rvec: &Vector3<f64>, tvec: &Vector3<f64>) -> Self {
        Self::new(rodrigues(rvec), *tvec)
    }

    pub fn rvec(&self) -> Vector3<f64> {
        rodrigues_inverse(&self.rotation)
    }

    /// `(R^T, -R^T t)`.
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self::new(rt, -(rt * self.translation))
    }

    /// `self * other`, i.e. apply `other` first.
    pub fn compose(&self, other: &Pose) -> Self {
        Self::new(
            self.rotation * other.rotation,
            self.rotation * other.translation + self.translation,
        )
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    /// Same rotation, translation multiplied by `s`.
    pub fn scaled(&self, s: f64) -> Self {
        Self::new(self.rotation, self.translation * s)
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.iter().chain(self.translation.iter()).all(|v| v.is_finite())
    }

    /// Homogeneous 4x4 form `[R | t; 0 0 0 1]`.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Read the rotation and translation blocks of a homogeneous transform.
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        Self::new(
            m.fixed_view::<3, 3>(0, 0).into_owned(),
            m.fixed_view::<3, 1>(0, 3).into_owned(),
        )
    }

    /// Angle in radians of the relative rotation between `self` and `other`.
    pub fn rotation_angle_to(&self, other: &Pose) -> f64 {
        let rel = self.rotation.transpose() * other.rotation;
        let c = ((rel.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        c.acos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pose() -> Pose {
        Pose::new(
            Rotation3::from_euler_angles(0.3, -0.2, 1.1).into_inner(),
            Vector3::new(0.1, -0.04, 0.7),
        )
    }

    #[test]
    fn inverse_is_involutive() {
        let p = sample_pose();
        let back = p.inverse().inverse();
        assert_relative_eq!(back.to_matrix(), p.to_matrix(), epsilon = 1e-12);
        assert_relative_eq!(
            p.inverse().to_matrix(),
            p.to_matrix().try_inverse().expect("rigid"),
            epsilon = 1e-12
        );
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let p = sample_pose();
        let id = p.compose(&p.inverse());
        assert_relative_eq!(id.to_matrix(), Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn rodrigues_matches_axis_angle() {
        let rvec = Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let r = rodrigues(&rvec);
        assert_relative_eq!(r * Vector3::x(), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(rodrigues_inverse(&r), rvec, epsilon = 1e-12);
        assert_relative_eq!(rodrigues(&Vector3::zeros()), Matrix3::identity());
    }

    #[test]
    fn matrix_round_trip() {
        let p = sample_pose();
        assert_eq!(Pose::from_matrix(&p.to_matrix()), p);
        let q = Pose::from_rvec_tvec(&p.rvec(), &p.translation);
        assert!(p.rotation_angle_to(&q) < 1e-6);
    }
}
