//! Pose of a planar square from its four image corners.
//!
//! Linear start from the plane-induced homography in normalized (undistorted)
//! coordinates, then `levenberg_marquardt` on pixel reprojection error through
//! the full camera model.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, Matrix3, Point2, Point3, SMatrix, SVector, Vector3, U6, U8};
use quadmark_core::{homography_from_4pt, CameraModel, Pose};

type Params = SVector<f64, 6>;
type Residuals = SVector<f64, 8>;
type Jacobian = SMatrix<f64, 8, 6>;

const MAX_ITERS: usize = 50;

/// Decompose a homography `n ~ H [X Y 1]^T` (object plane to normalized
/// image) into the plane's pose in the camera frame.
pub fn pose_from_homography(h: &Matrix3<f64>) -> Option<Pose> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let denom = 0.5 * (h1.norm() + h2.norm());
    if denom <= 1e-12 {
        return None;
    }
    let mut lambda = 1.0 / denom;
    if (lambda * h3).z < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * h1;
    let r2 = lambda * h2;
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }

    let mut r = Matrix3::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        rot = u_flipped * v_t;
    }

    let pose = Pose::new(rot, lambda * h3);
    pose.is_finite().then_some(pose)
}

/// Reprojection error of the four object points as a function of
/// `[rvec | tvec]`.
struct ReprojectionProblem<'a> {
    object: &'a [Point3<f64>; 4],
    image: &'a [Point2<f64>; 4],
    camera: &'a CameraModel,
    params: Params,
}

impl ReprojectionProblem<'_> {
    fn residuals_at(&self, x: &Params) -> Option<Residuals> {
        let pose = params_to_pose(x);
        let mut r = Residuals::zeros();
        for (k, (obj, px)) in self.object.iter().zip(self.image).enumerate() {
            let proj = self.camera.project(&pose.transform_point(obj))?;
            r[2 * k] = proj.x - px.x;
            r[2 * k + 1] = proj.y - px.y;
        }
        Some(r)
    }
}

impl LeastSquaresProblem<f64, U8, U6> for ReprojectionProblem<'_> {
    type ResidualStorage = Owned<f64, U8>;
    type JacobianStorage = Owned<f64, U8, U6>;
    type ParameterStorage = Owned<f64, U6>;

    fn set_params(&mut self, x: &Params) {
        self.params = *x;
    }

    fn params(&self) -> Params {
        self.params
    }

    fn residuals(&self) -> Option<Residuals> {
        self.residuals_at(&self.params)
    }

    /// Central differences.
    fn jacobian(&self) -> Option<Jacobian> {
        let mut jac = Jacobian::zeros();
        for c in 0..6 {
            let step = 1e-6 * self.params[c].abs().max(1.0);
            let mut xp = self.params;
            let mut xm = self.params;
            xp[c] += step;
            xm[c] -= step;
            let d = (self.residuals_at(&xp)? - self.residuals_at(&xm)?) / (2.0 * step);
            jac.set_column(c, &d);
        }
        Some(jac)
    }
}

fn pose_to_params(pose: &Pose) -> Params {
    let rvec = pose.rvec();
    let t = pose.translation;
    Params::new(rvec.x, rvec.y, rvec.z, t.x, t.y, t.z)
}

fn params_to_pose(x: &Params) -> Pose {
    Pose::from_rvec_tvec(&x.fixed_rows::<3>(0).into_owned(), &x.fixed_rows::<3>(3).into_owned())
}

/// Minimize reprojection error starting from `initial`.
///
/// Returns `None` when the start cannot be evaluated or the solver ends on a
/// non-finite pose or a higher cost than it started from.
pub fn refine_pose(
    initial: &Pose,
    object: &[Point3<f64>; 4],
    image: &[Point2<f64>; 4],
    camera: &CameraModel,
) -> Option<Pose> {
    let problem = ReprojectionProblem {
        object,
        image,
        camera,
        params: pose_to_params(initial),
    };
    let start_cost = problem.residuals()?.norm_squared();

    let (problem, report) = LevenbergMarquardt::new()
        .with_patience(MAX_ITERS)
        .minimize(problem);
    log::trace!(
        "pose refinement: {:?} after {} evaluations",
        report.termination,
        report.number_of_evaluations
    );

    let cost = problem.residuals()?.norm_squared();
    let pose = params_to_pose(&problem.params);
    (pose.is_finite() && cost <= start_cost).then_some(pose)
}

/// Pose of the object in the camera frame (`x_cam = R x_obj + t`).
///
/// `object` must lie on the `z = 0` plane. Returns `None` for degenerate
/// correspondences or when the solution puts the object behind the camera.
pub fn solve_planar_pnp(
    object: &[Point3<f64>; 4],
    image: &[Point2<f64>; 4],
    camera: &CameraModel,
) -> Option<Pose> {
    let plane = object.map(|p| Point2::new(p.x, p.y));
    let normalized = image.map(|p| camera.normalize(&p));
    let h = homography_from_4pt(&plane, &normalized)?;
    let initial = pose_from_homography(&h.h)?;
    let pose = refine_pose(&initial, object, image, camera).unwrap_or(initial);

    let in_front = object
        .iter()
        .all(|p| pose.transform_point(p).z > f64::EPSILON);
    (in_front && pose.translation.z > 0.0).then_some(pose)
}

/// The four corners of the unit marker, centred, on `z = 0`, x right and y down.
pub fn unit_square() -> [Point3<f64>; 4] {
    [
        Point3::new(-0.5, -0.5, 0.0),
        Point3::new(0.5, -0.5, 0.0),
        Point3::new(0.5, 0.5, 0.0),
        Point3::new(-0.5, 0.5, 0.0),
    ]
}

/// Direction of the marker normal in the camera frame for a given pose.
pub fn normal_in_camera(pose: &Pose) -> Vector3<f64> {
    pose.rotation.column(2).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;
    use quadmark_core::BrownConrady5;

    fn project_all(pose: &Pose, camera: &CameraModel) -> [Point2<f64>; 4] {
        unit_square().map(|p| camera.project(&pose.transform_point(&p)).expect("in front"))
    }

    #[test]
    fn recovers_tilted_pose_exactly() {
        let camera = CameraModel::default();
        let truth = Pose::new(
            Rotation3::from_euler_angles(0.5, -0.3, 0.2).into_inner(),
            Vector3::new(0.3, -0.2, 6.0),
        );
        let image = project_all(&truth, &camera);
        let pose = solve_planar_pnp(&unit_square(), &image, &camera).expect("pose");
        assert_relative_eq!(pose.translation, truth.translation, epsilon = 1e-6);
        assert!(pose.rotation_angle_to(&truth) < 1e-6);
    }

    #[test]
    fn linear_start_is_exact_without_distortion() {
        let camera = CameraModel::pinhole(900.0, 900.0, 640.0, 360.0);
        let truth = Pose::new(
            Rotation3::from_euler_angles(-0.4, 0.25, 1.0).into_inner(),
            Vector3::new(-0.5, 0.1, 4.0),
        );
        let image = project_all(&truth, &camera);
        let plane = unit_square().map(|p| Point2::new(p.x, p.y));
        let normalized = image.map(|p| camera.normalize(&p));
        let h = homography_from_4pt(&plane, &normalized).expect("homography");
        let pose = pose_from_homography(&h.h).expect("decomposition");
        assert_relative_eq!(pose.translation, truth.translation, epsilon = 1e-8);
        assert!(pose.rotation_angle_to(&truth) < 1e-6);
    }

    #[test]
    fn refinement_removes_perturbation() {
        let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0)
            .with_distortion(BrownConrady5::from_coeffs([-0.1, 0.02, 0.001, -0.001, 0.0]));
        let truth = Pose::new(
            Rotation3::from_euler_angles(0.2, 0.4, -0.1).into_inner(),
            Vector3::new(0.1, 0.05, 5.0),
        );
        let image = project_all(&truth, &camera);
        let start = Pose::new(
            Rotation3::from_euler_angles(0.25, 0.35, -0.05).into_inner(),
            Vector3::new(0.12, 0.02, 5.3),
        );
        let pose = refine_pose(&start, &unit_square(), &image, &camera).expect("refined");
        assert_relative_eq!(pose.translation, truth.translation, epsilon = 1e-6);
        assert!(pose.rotation_angle_to(&truth) < 1e-6);
    }

    #[test]
    fn noisy_corners_do_not_raise_reprojection_cost() {
        let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0);
        let truth = Pose::new(
            Rotation3::from_euler_angles(0.3, -0.2, 0.6).into_inner(),
            Vector3::new(-0.2, 0.1, 4.5),
        );
        let mut image = project_all(&truth, &camera);
        for (p, (dx, dy)) in image
            .iter_mut()
            .zip([(0.3, -0.2), (-0.25, 0.1), (0.15, 0.3), (-0.3, -0.1)])
        {
            p.x += dx;
            p.y += dy;
        }
        let problem = ReprojectionProblem {
            object: &unit_square(),
            image: &image,
            camera: &camera,
            params: pose_to_params(&truth),
        };
        let truth_cost = problem.residuals().expect("in front").norm_squared();

        let pose = refine_pose(&truth, &unit_square(), &image, &camera).expect("refined");
        let refined = ReprojectionProblem {
            params: pose_to_params(&pose),
            ..problem
        };
        let cost = refined.residuals().expect("in front").norm_squared();
        assert!(cost <= truth_cost, "cost {cost} > {truth_cost}");
        assert!(pose.rotation_angle_to(&truth).to_degrees() < 1.0);
    }

    #[test]
    fn collapsed_corners_have_no_pose() {
        let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0);
        let image = [Point2::new(100.0, 100.0); 4];
        assert!(solve_planar_pnp(&unit_square(), &image, &camera).is_none());
    }

    #[test]
    fn frontal_marker_normal_faces_away_from_camera() {
        let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0);
        let truth = Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 3.0));
        let pose = solve_planar_pnp(&unit_square(), &project_all(&truth, &camera), &camera)
            .expect("pose");
        assert_relative_eq!(normal_in_camera(&pose), Vector3::z(), epsilon = 1e-6);
    }
}
