//! Hand-off matrices for an OpenGL renderer.
//!
//! Poses are expressed in camera axes (x right, y down, z forward). OpenGL eye
//! space uses x right, y up, z backward, so the model-view matrix is
//! `diag(1, -1, -1, 1) * [R | t]`. Matrices are emitted column-major, ready
//! for `glUniformMatrix4fv(.., transpose = false, ..)`.

use crate::{CameraModel, Pose};
use nalgebra::Matrix4;

/// Near and far clip planes of the default projection.
pub const DEFAULT_NEAR: f64 = 0.01;
pub const DEFAULT_FAR: f64 = 100.0;

/// Camera-axes to OpenGL-eye-axes flip.
pub fn cv_to_gl() -> Matrix4<f64> {
    Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, -1.0, -1.0, 1.0))
}

/// Model-view matrix for a marker-in-camera pose.
pub fn model_view(pose: &Pose) -> Matrix4<f64> {
    cv_to_gl() * pose.to_matrix()
}

/// Perspective projection matching `camera` for a `width x height` image drawn
/// with row 0 at the top of the viewport.
pub fn projection(camera: &CameraModel, width: f64, height: f64, near: f64, far: f64) -> Matrix4<f64> {
    let mut p = Matrix4::zeros();
    p[(0, 0)] = 2.0 * camera.fx / width;
    p[(1, 1)] = 2.0 * camera.fy / height;
    p[(0, 2)] = 1.0 - 2.0 * camera.cx / width;
    p[(1, 2)] = 2.0 * camera.cy / height - 1.0;
    p[(2, 2)] = -(far + near) / (far - near);
    p[(2, 3)] = -2.0 * far * near / (far - near);
    p[(3, 2)] = -1.0;
    p
}

/// Flatten to column-major `f32`.
pub fn to_column_major(m: &Matrix4<f64>) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for (dst, src) in out.iter_mut().zip(m.iter()) {
        *dst = *src as f32;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3, Vector3, Vector4};

    #[test]
    fn clip_space_round_trip_lands_on_pixel() {
        let cam = crate::CameraModel::pinhole(800.0, 780.0, 310.0, 250.0);
        let (w, h) = (640.0, 480.0);
        let pose = Pose::new(
            Rotation3::from_euler_angles(0.4, 0.1, -0.3).into_inner(),
            Vector3::new(0.05, -0.02, 0.6),
        );
        let mvp = projection(&cam, w, h, DEFAULT_NEAR, DEFAULT_FAR) * model_view(&pose);

        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, -0.5, 0.0),
            Point3::new(-0.3, 0.2, 0.1),
        ] {
            let clip = mvp * Vector4::new(p.x, p.y, p.z, 1.0);
            let ndc = clip.xyz() / clip.w;
            // viewport with row 0 at the top
            let u = (ndc.x + 1.0) * 0.5 * w;
            let v = (1.0 - ndc.y) * 0.5 * h;

            let px = cam.project(&pose.transform_point(&p)).expect("in front");
            assert_relative_eq!(u, px.x, epsilon = 1e-9);
            assert_relative_eq!(v, px.y, epsilon = 1e-9);
            assert!(ndc.z > -1.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn model_view_points_the_marker_down_negative_z() {
        let pose = Pose::new(nalgebra::Matrix3::identity(), Vector3::new(0.0, 0.0, 2.0));
        let mv = model_view(&pose);
        let eye = mv * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(eye.z, -2.0);
        let up = mv * Vector4::new(0.0, -1.0, 0.0, 0.0);
        assert_relative_eq!(up.y, 1.0);
    }

    #[test]
    fn column_major_layout() {
        let pose = Pose::new(nalgebra::Matrix3::identity(), Vector3::new(1.0, 2.0, 3.0));
        let flat = to_column_major(&model_view(&pose));
        assert_eq!(&flat[12..16], &[1.0, -2.0, -3.0, 1.0]);
        assert_eq!(flat[5], -1.0);
    }
}
