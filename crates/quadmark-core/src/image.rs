//! Pixel buffers: borrowed camera frames and owned/borrowed 8-bit gray images.

use serde::{Deserialize, Serialize};

/// Byte layout of one pixel in a [`Frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    #[default]
    Gray,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ChannelOrder {
    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            ChannelOrder::Gray => 1,
            ChannelOrder::Rgb | ChannelOrder::Bgr => 3,
            ChannelOrder::Rgba | ChannelOrder::Bgra => 4,
        }
    }

    /// Offsets of the red, green and blue bytes inside one pixel.
    #[inline]
    fn rgb_offsets(self) -> [usize; 3] {
        match self {
            ChannelOrder::Gray => [0, 0, 0],
            ChannelOrder::Rgb | ChannelOrder::Rgba => [0, 1, 2],
            ChannelOrder::Bgr | ChannelOrder::Bgra => [2, 1, 0],
        }
    }
}

/// One camera frame, borrowed for a single detection run.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub width: usize,
    pub height: usize,
    pub order: ChannelOrder,
    pub data: &'a [u8], // row-major, tightly packed
}

impl<'a> Frame<'a> {
    pub fn new(width: usize, height: usize, order: ChannelOrder, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            order,
            data,
        }
    }

    /// Single-channel frame.
    pub fn gray(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self::new(width, height, ChannelOrder::Gray, data)
    }

    /// A frame with no pixels to look at.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Buffer length implied by the dimensions and channel order.
    ///
    /// `None` when the product overflows `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.order.channels())
    }

    /// Convert to an owned grayscale image using `0.299 R + 0.587 G + 0.114 B`.
    ///
    /// Alpha is ignored. Returns `None` if the buffer length does not match
    /// [`Frame::expected_len`].
    pub fn to_gray(&self) -> Option<GrayImage> {
        if self.expected_len()? != self.data.len() {
            return None;
        }

        let data = match self.order {
            ChannelOrder::Gray => self.data.to_vec(),
            order => {
                let [r, g, b] = order.rgb_offsets();
                self.data
                    .chunks_exact(order.channels())
                    .map(|px| {
                        let y = 0.299 * px[r] as f32 + 0.587 * px[g] as f32 + 0.114 * px[b] as f32;
                        y.round().clamp(0.0, 255.0) as u8
                    })
                    .collect()
            }
        };

        Some(GrayImage {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    /// Pixel at `(x, y)` with edge replication.
    #[inline]
    pub fn clamped(&self, x: i64, y: i64) -> u8 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width + x]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Bilinear sample at `(x, y)` in pixel-index coordinates; outside pixels read as 0.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_and_rgb_agree_after_swapping_bytes() {
        let rgb = [200u8, 100, 50, 0, 0, 255];
        let bgr = [50u8, 100, 200, 255, 0, 0];
        let a = Frame::new(2, 1, ChannelOrder::Rgb, &rgb).to_gray().expect("rgb");
        let b = Frame::new(2, 1, ChannelOrder::Bgr, &bgr).to_gray().expect("bgr");
        assert_eq!(a, b);
        // 0.299*200 + 0.587*100 + 0.114*50 = 124.2
        assert_eq!(a.data[0], 124);
        // pure blue: 0.114*255 = 29.07
        assert_eq!(a.data[1], 29);
    }

    #[test]
    fn alpha_is_ignored() {
        let rgba = [10u8, 10, 10, 0, 10, 10, 10, 255];
        let g = Frame::new(2, 1, ChannelOrder::Rgba, &rgba)
            .to_gray()
            .expect("rgba");
        assert_eq!(g.data, vec![10, 10]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let data = [0u8; 5];
        let frame = Frame::new(2, 1, ChannelOrder::Rgb, &data);
        assert_eq!(frame.expected_len(), Some(6));
        assert!(frame.to_gray().is_none());
    }

    #[test]
    fn empty_frame_is_detected() {
        assert!(Frame::gray(0, 10, &[]).is_empty());
        assert!(!Frame::gray(1, 1, &[0]).is_empty());
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage {
            width: 2,
            height: 1,
            data: vec![0, 100],
        };
        let v = sample_bilinear(&img.view(), 0.25, 0.0);
        assert!((v - 25.0).abs() < 1e-4);
        assert_eq!(img.view().clamped(-3, 7), 0);
        assert_eq!(img.view().clamped(9, 0), 100);
    }
}
