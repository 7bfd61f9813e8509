//! Iterative subpixel corner refinement.
//!
//! For a true corner `q`, every image gradient `g_i` sampled at `p_i` near `q`
//! is orthogonal to `p_i - q`. Each iteration solves the weighted normal
//! equations `sum(g g^T) q = sum(g g^T p)` over a Gaussian-weighted window
//! centred on the current estimate.

use nalgebra::Point2;
use quadmark_core::GrayImageView;
use serde::{Deserialize, Serialize};

/// Stopping rule and window for [`refine_corners`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubpixParams {
    /// Half side of the search window; the window is `2 * half_window + 1` px.
    pub half_window: usize,
    pub max_iters: usize,
    /// Stop once a step moves the point less than this many pixels.
    pub epsilon: f32,
}

impl Default for SubpixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iters: 30,
            epsilon: 0.01,
        }
    }
}

/// Bilinear sample with replicated borders.
#[inline]
fn sample_clamped(img: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let (fx, fy) = (x - x0, y - y0);
    let (xi, yi) = (x0 as i64, y0 as i64);
    let p00 = img.clamped(xi, yi) as f32;
    let p10 = img.clamped(xi + 1, yi) as f32;
    let p01 = img.clamped(xi, yi + 1) as f32;
    let p11 = img.clamped(xi + 1, yi + 1) as f32;
    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

fn refine_one(img: &GrayImageView<'_>, start: Point2<f32>, params: &SubpixParams, mask: &[f32]) -> Point2<f32> {
    let win = params.half_window as i64;
    let side = (2 * win + 1) as usize;
    let patch_side = side + 2;
    let eps_sq = params.epsilon * params.epsilon;

    let mut patch = vec![0f32; patch_side * patch_side];
    let mut c = start;
    for _ in 0..params.max_iters.max(1) {
        // window plus a one-pixel rim for central differences
        let ox = c.x - (win + 1) as f32;
        let oy = c.y - (win + 1) as f32;
        for (i, row) in patch.chunks_exact_mut(patch_side).enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = sample_clamped(img, ox + j as f32, oy + i as f32);
            }
        }

        let (mut a, mut b, mut cc, mut bb1, mut bb2) = (0f64, 0f64, 0f64, 0f64, 0f64);
        for i in 0..side {
            let py = i as f64 - win as f64;
            for j in 0..side {
                let px = j as f64 - win as f64;
                let m = mask[i * side + j] as f64;
                let at = |r: usize, col: usize| patch[r * patch_side + col] as f64;
                let gx = at(i + 1, j + 2) - at(i + 1, j);
                let gy = at(i + 2, j + 1) - at(i, j + 1);
                let gxx = gx * gx * m;
                let gxy = gx * gy * m;
                let gyy = gy * gy * m;
                a += gxx;
                b += gxy;
                cc += gyy;
                bb1 += gxx * px + gxy * py;
                bb2 += gxy * px + gyy * py;
            }
        }

        let det = a * cc - b * b;
        if det.abs() <= f64::EPSILON * f64::EPSILON {
            break;
        }
        let inv = 1.0 / det;
        let next = Point2::new(
            c.x + (inv * (cc * bb1 - b * bb2)) as f32,
            c.y + (inv * (a * bb2 - b * bb1)) as f32,
        );
        let step_sq = (next - c).norm_squared();
        c = next;
        if c.x < 0.0 || c.y < 0.0 || c.x >= img.width as f32 || c.y >= img.height as f32 {
            break;
        }
        if step_sq <= eps_sq {
            break;
        }
    }

    let drift = c - start;
    if !c.x.is_finite()
        || !c.y.is_finite()
        || drift.x.abs() > win as f32
        || drift.y.abs() > win as f32
    {
        return start;
    }
    c
}

/// Refine every point in `corners` in place.
///
/// A point whose estimate leaves its search window keeps its initial value.
pub fn refine_corners(img: &GrayImageView<'_>, corners: &mut [Point2<f32>], params: &SubpixParams) {
    if img.width == 0 || img.height == 0 || params.half_window == 0 {
        return;
    }
    let win = params.half_window as i64;
    let coeff = 1.0 / (win * win) as f32;
    let taps: Vec<f32> = (-win..=win).map(|i| (-(i * i) as f32 * coeff).exp()).collect();
    let mask: Vec<f32> = taps
        .iter()
        .flat_map(|&wy| taps.iter().map(move |&wx| wx * wy))
        .collect();

    for p in corners.iter_mut() {
        *p = refine_one(img, *p, params, &mask);
    }
}
