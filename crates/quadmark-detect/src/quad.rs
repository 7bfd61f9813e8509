//! Polygon approximation and quadrilateral candidate geometry.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Four ordered image points with non-negative winding (see [`Quad::winding`]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Cross product of the first two edges from corner 0.
    pub fn winding(&self) -> f32 {
        let [p0, p1, p2, _] = self.corners;
        let v1 = p1 - p0;
        let v2 = p2 - p0;
        v1.x * v2.y - v1.y * v2.x
    }

    /// Swap corners 1 and 3 if the winding is negative.
    pub fn normalize_winding(&mut self) {
        if self.winding() < 0.0 {
            self.corners.swap(1, 3);
        }
    }

    /// Sum of edge lengths.
    pub fn perimeter(&self) -> f32 {
        (0..4)
            .map(|i| (self.corners[(i + 1) % 4] - self.corners[i]).norm())
            .sum()
    }

    /// Smallest squared distance between adjacent corners.
    pub fn min_side_sq(&self) -> f32 {
        (0..4)
            .map(|i| (self.corners[(i + 1) % 4] - self.corners[i]).norm_squared())
            .fold(f32::INFINITY, f32::min)
    }

    /// Mean squared distance between same-index corners.
    pub fn mean_corner_dist_sq(&self, other: &Quad) -> f32 {
        self.corners
            .iter()
            .zip(&other.corners)
            .map(|(a, b)| (a - b).norm_squared())
            .sum::<f32>()
            / 4.0
    }

    /// Rotate the corner order left by `k`: corner `i` becomes corner `(i + k) % 4`.
    pub fn rotated_left(&self, k: u8) -> Self {
        let k = k as usize % 4;
        Self::new(std::array::from_fn(|i| self.corners[(i + k) % 4]))
    }
}

fn perpendicular_distance(p: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let (px, py) = ((p.x - a.x) as f64, (p.y - a.y) as f64);
    let mag = dx.hypot(dy);
    if mag < 1e-9 {
        return px.hypot(py);
    }
    (dx * py - dy * px).abs() / mag
}

fn farthest_from(points: &[Point2<i32>], from: usize) -> usize {
    let o = points[from];
    let mut best = from;
    let mut best_d = -1i64;
    for (i, p) in points.iter().enumerate() {
        let d = ((p.x - o.x) as i64).pow(2) + ((p.y - o.y) as i64).pow(2);
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Open Douglas–Peucker over `chain`; `keep[i]` marks retained points.
fn douglas_peucker(chain: &[Point2<i32>], epsilon: f64, keep: &mut [bool]) {
    let n = chain.len();
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end - start < 2 {
            continue;
        }
        let mut dmax = 0.0;
        let mut index = start;
        for i in start + 1..end {
            let d = perpendicular_distance(chain[i], chain[start], chain[end]);
            if d > dmax {
                index = i;
                dmax = d;
            }
        }
        if dmax > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }
}

/// Approximate a closed pixel chain by a polygon with tolerance `epsilon`.
///
/// The chain is split at an approximately farthest pair of points, each half
/// is simplified with Douglas–Peucker, and vertices lying within `epsilon` of
/// the line through their neighbours are dropped.
pub fn approx_poly_dp(contour: &[Point2<i32>], epsilon: f64) -> Vec<Point2<i32>> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let mut a = 0;
    let mut b = farthest_from(contour, a);
    for _ in 0..2 {
        let c = farthest_from(contour, b);
        a = b;
        b = c;
    }
    if contour[a] == contour[b] {
        return vec![contour[a]];
    }

    // chain starting at `a`, passing `b`, closing back on `a`
    let mut chain: Vec<Point2<i32>> = contour[a..].iter().chain(&contour[..a]).copied().collect();
    let split = (b + n - a) % n;
    chain.push(contour[a]);

    let mut keep = vec![false; chain.len()];
    douglas_peucker(&chain[..=split], epsilon, &mut keep[..=split]);
    douglas_peucker(&chain[split..], epsilon, &mut keep[split..]);

    let mut poly: Vec<Point2<i32>> = chain[..n]
        .iter()
        .zip(&keep[..n])
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect();

    while poly.len() > 3 {
        let m = poly.len();
        let redundant = (0..m).find(|&i| {
            perpendicular_distance(poly[i], poly[(i + m - 1) % m], poly[(i + 1) % m]) <= epsilon
        });
        match redundant {
            Some(i) => {
                poly.remove(i);
            }
            None => break,
        }
    }
    poly
}

/// True if consecutive edge turns never change sign.
pub fn is_convex(poly: &[Point2<i32>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let (mut pos, mut neg) = (false, false);
    for i in 0..n {
        let (a, b, c) = (poly[i], poly[(i + 1) % n], poly[(i + 2) % n]);
        let cross = (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        pos |= cross > 0;
        neg |= cross < 0;
    }
    pos != neg
}

/// Drop the smaller-perimeter member of every pair of near-coincident quads.
///
/// Two quads are near when [`Quad::mean_corner_dist_sq`] is below
/// `near_dist_sq`. On equal perimeters the earlier quad is dropped.
/// Survivors keep their relative order.
pub fn remove_near_duplicates(quads: Vec<Quad>, near_dist_sq: f32) -> Vec<Quad> {
    let mut drop = vec![false; quads.len()];
    for i in 0..quads.len() {
        for j in i + 1..quads.len() {
            if quads[i].mean_corner_dist_sq(&quads[j]) < near_dist_sq {
                if quads[i].perimeter() > quads[j].perimeter() {
                    drop[j] = true;
                } else {
                    drop[i] = true;
                }
            }
        }
    }
    quads
        .into_iter()
        .zip(drop)
        .filter_map(|(q, d)| (!d).then_some(q))
        .collect()
}
