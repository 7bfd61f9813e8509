//! Frame to grayscale, then locally adaptive inverted binarization.

use quadmark_core::GrayImage;

/// Foreground value of the binary image.
pub const FOREGROUND: u8 = 255;

/// Normalized 1-D Gaussian kernel of odd length `window`.
///
/// Windows up to 7 use the fixed binomial-like taps common in vision
/// libraries; larger windows use `sigma = 0.3 * ((window - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(window: usize) -> Vec<f32> {
    match window {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25],
        n => {
            let sigma = 0.3 * ((n as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            let half = (n / 2) as i32;
            let taps: Vec<f32> = (-half..=half)
                .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
                .collect();
            let sum: f32 = taps.iter().sum();
            taps.into_iter().map(|t| t / sum).collect()
        }
    }
}

/// Separable Gaussian blur with replicated borders, rounded back to `u8`.
pub fn gaussian_blur(src: &GrayImage, window: usize) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let kernel = gaussian_kernel(window);
    let half = (kernel.len() / 2) as i64;
    let view = src.view();

    let mut tmp = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, &wgt) in kernel.iter().enumerate() {
                acc += wgt * view.clamped(x as i64 + k as i64 - half, y as i64) as f32;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = GrayImage::filled(w, h, 0);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, &wgt) in kernel.iter().enumerate() {
                let yy = (y as i64 + k as i64 - half).clamp(0, h as i64 - 1) as usize;
                acc += wgt * tmp[yy * w + x];
            }
            out.data[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Inverted adaptive threshold: a pixel is [`FOREGROUND`] iff it is at least
/// `c` darker than its Gaussian-weighted neighbourhood mean.
///
/// `window` must be odd; the caller validates it.
pub fn adaptive_threshold_inv(gray: &GrayImage, window: usize, c: f64) -> GrayImage {
    let mean = gaussian_blur(gray, window);
    let delta = c.floor() as i32;
    let data = gray
        .data
        .iter()
        .zip(&mean.data)
        .map(|(&v, &m)| {
            if v as i32 - m as i32 <= -delta {
                FOREGROUND
            } else {
                0
            }
        })
        .collect();
    GrayImage {
        width: gray.width,
        height: gray.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernels_are_normalized() {
        for n in [1, 3, 5, 7, 9, 15] {
            let k = gaussian_kernel(n);
            assert_eq!(k.len(), n);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "window {n} sums to {sum}");
        }
    }

    #[test]
    fn flat_image_has_no_foreground() {
        let img = GrayImage::filled(20, 10, 128);
        let bin = adaptive_threshold_inv(&img, 7, 7.0);
        assert!(bin.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn dark_side_of_an_edge_is_foreground() {
        let mut img = GrayImage::filled(20, 10, 220);
        for y in 0..10 {
            for x in 0..10 {
                img.set(x, y, 20);
            }
        }
        let bin = adaptive_threshold_inv(&img, 7, 7.0);
        // dark pixels next to the edge
        assert_eq!(bin.get(9, 5), FOREGROUND);
        assert_eq!(bin.get(8, 5), FOREGROUND);
        // far from the edge, and the bright side, stay background
        assert_eq!(bin.get(6, 5), 0);
        assert_eq!(bin.get(2, 5), 0);
        assert_eq!(bin.get(10, 5), 0);
        assert_eq!(bin.get(15, 5), 0);
    }
}
