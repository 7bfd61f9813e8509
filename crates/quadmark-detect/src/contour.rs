//! Border following on a binary image.
//!
//! Implements topological border following (Suzuki & Abe, 1985): a single
//! raster scan finds the outer border of every 8-connected foreground
//! component and the border around every hole. Borders are returned as a flat
//! list of full pixel chains, without hierarchy.

use nalgebra::Point2;
use quadmark_core::GrayImage;

/// Closed outline, pixel coordinates in tracing order.
pub type Contour = Vec<Point2<i32>>;

// Neighbour offsets, counterclockwise on screen starting east.
const DX: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i32; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// Label buffer padded with a one-pixel zero frame.
struct Labels {
    stride: usize,
    data: Vec<i32>,
}

impl Labels {
    fn from_binary(binary: &GrayImage) -> Self {
        let stride = binary.width + 2;
        let mut data = vec![0i32; stride * (binary.height + 2)];
        for y in 0..binary.height {
            for x in 0..binary.width {
                if binary.get(x, y) != 0 {
                    data[(y + 1) * stride + x + 1] = 1;
                }
            }
        }
        Self { stride, data }
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        y as usize * self.stride + x as usize
    }

    #[inline]
    fn get(&self, x: i32, y: i32) -> i32 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32, v: i32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }
}

fn direction(from: (i32, i32), to: (i32, i32)) -> usize {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    (0..8)
        .find(|&d| DX[d] == dx && DY[d] == dy)
        .unwrap_or(0)
}

/// Follow one border starting at `start`, entering from the zero pixel `from`.
fn follow_border(labels: &mut Labels, start: (i32, i32), from: (i32, i32), nbd: i32) -> Contour {
    let mut contour = Vec::new();

    // first nonzero neighbour, clockwise from `from`
    let s = direction(start, from);
    let first = (0..8).map(|k| (s + 8 - k) % 8).find_map(|d| {
        let p = (start.0 + DX[d], start.1 + DY[d]);
        (labels.get(p.0, p.1) != 0).then_some(p)
    });

    let Some(first) = first else {
        labels.set(start.0, start.1, -nbd);
        contour.push(Point2::new(start.0 - 1, start.1 - 1));
        return contour;
    };

    let mut prev = first;
    let mut cur = start;
    loop {
        contour.push(Point2::new(cur.0 - 1, cur.1 - 1));

        // next nonzero neighbour, counterclockwise after `prev`
        let s = direction(cur, prev);
        let mut east_is_zero = false;
        let mut next = cur;
        for k in 1..=8 {
            let d = (s + k) % 8;
            let p = (cur.0 + DX[d], cur.1 + DY[d]);
            if labels.get(p.0, p.1) != 0 {
                next = p;
                break;
            }
            if d == 0 {
                east_is_zero = true;
            }
        }

        if east_is_zero {
            labels.set(cur.0, cur.1, -nbd);
        } else if labels.get(cur.0, cur.1) == 1 {
            labels.set(cur.0, cur.1, nbd);
        }

        if next == start && cur == first {
            break;
        }
        prev = cur;
        cur = next;
    }
    contour
}

/// All outer and hole borders of the foreground (nonzero) pixels of `binary`.
pub fn find_contours(binary: &GrayImage) -> Vec<Contour> {
    let mut contours = Vec::new();
    if binary.width == 0 || binary.height == 0 {
        return contours;
    }

    let mut labels = Labels::from_binary(binary);
    let mut nbd = 1i32;

    for y in 1..=binary.height as i32 {
        for x in 1..=binary.width as i32 {
            let v = labels.get(x, y);
            if v == 0 {
                continue;
            }

            let from = if v == 1 && labels.get(x - 1, y) == 0 {
                Some((x - 1, y))
            } else if v >= 1 && labels.get(x + 1, y) == 0 {
                Some((x + 1, y))
            } else {
                None
            };

            if let Some(from) = from {
                nbd += 1;
                contours.push(follow_border(&mut labels, (x, y), from, nbd));
            }
        }
    }
    contours
}

/// Closed arc length of a pixel chain.
pub fn arc_length(contour: &[Point2<i32>]) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }
    contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(a, b)| ((b.x - a.x) as f64).hypot((b.y - a.y) as f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_from_rows(rows: &[&str]) -> GrayImage {
        let mut img = GrayImage::filled(rows[0].len(), rows.len(), 0);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    img.set(x, y, 255);
                }
            }
        }
        img
    }

    #[test]
    fn filled_square_has_one_border() {
        let img = binary_from_rows(&[
            ".....", //
            ".###.", //
            ".###.", //
            ".###.", //
            ".....",
        ]);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 8);
        assert_eq!(contours[0][0], Point2::new(1, 1));
        assert!((arc_length(&contours[0]) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn ring_has_outer_and_hole_border() {
        let img = binary_from_rows(&[
            ".......", //
            ".#####.", //
            ".#...#.", //
            ".#...#.", //
            ".#...#.", //
            ".#####.", //
            ".......",
        ]);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].len(), 16);
        // the hole border cuts the ring corners diagonally
        assert_eq!(contours[1].len(), 12);
        assert_eq!(contours[1][0], Point2::new(1, 2));
    }

    #[test]
    fn foreground_touching_the_image_edge_is_traced() {
        let img = binary_from_rows(&[
            "##", //
            "##",
        ]);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 4);
    }

    #[test]
    fn isolated_pixels_are_single_point_contours() {
        let img = binary_from_rows(&[
            "#..", //
            "..#",
        ]);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn empty_image_has_no_contours() {
        assert!(find_contours(&GrayImage::filled(4, 4, 0)).is_empty());
        assert!(find_contours(&GrayImage::filled(0, 0, 0)).is_empty());
    }
}
