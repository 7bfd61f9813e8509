use nalgebra::{Matrix4, Point2};
use quadmark_core::{gl, Pose};
use quadmark_decode::Match;
use serde::{Deserialize, Serialize};

use crate::quad::Quad;

/// A candidate quadrilateral that decoded to a valid identity.
///
/// Corners are still in candidate order; `decoded.rotation` says how far the
/// printed pattern is turned relative to them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedQuad {
    pub quad: Quad,
    pub decoded: Match,
}

/// One detected marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// 10-bit identity, `0..=1023`.
    pub id: i32,
    /// Quarter turns between candidate order and canonical order.
    pub rotation: u8,
    /// Subpixel image corners in canonical order: corner 0 is the marker's
    /// top-left, then clockwise on the printed pattern.
    pub corners: [Point2<f32>; 4],
    /// Marker frame to camera frame, translation in marker-length units.
    pub pose: Pose,
}

impl Marker {
    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f32> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }

    /// Homogeneous marker-to-camera transform.
    #[inline]
    pub fn transform(&self) -> Matrix4<f64> {
        self.pose.to_matrix()
    }

    /// Column-major model-view matrix for an OpenGL renderer.
    pub fn gl_model_view(&self) -> [f32; 16] {
        gl::to_column_major(&gl::model_view(&self.pose))
    }
}
