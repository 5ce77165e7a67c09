// THEORY:
// The `Frame` is the single input unit of the advisor. Capture devices hand us
// interleaved BGR bytes; everything downstream works on an `image::RgbImage`, so
// the channel swap happens exactly once, here, at the boundary.
//
// A `Frame` is a "dumb" data container. It knows its dimensions and how to
// convert itself back to BGR for display, nothing more.

use crate::error::{Result, VisionError};
use image::{Rgb, RgbImage};

pub type Byte = u8;
pub type Channel = Byte;

const BGR_CHANNELS: usize = 3;

/// A single color video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Builds a frame from a tightly packed BGR buffer, the layout OpenCV
    /// produces for `CV_8UC3` matrices.
    pub fn from_bgr_bytes(width: u32, height: u32, bytes: &[Byte]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyFrame);
        }
        let expected = width as usize * height as usize * BGR_CHANNELS;
        if bytes.len() != expected {
            return Err(VisionError::BufferSize {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }

        let mut rgb = Vec::with_capacity(expected);
        for bgr in bytes.chunks_exact(BGR_CHANNELS) {
            rgb.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
        }
        // Length was checked above, so the buffer always fits.
        let image = RgbImage::from_raw(width, height, rgb).ok_or(VisionError::BufferSize {
            width,
            height,
            expected,
            actual: bytes.len(),
        })?;
        Ok(Self { image })
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::EmptyFrame);
        }
        Ok(Self { image })
    }

    /// A frame filled with one color, given in RGB order.
    pub fn filled(width: u32, height: u32, rgb: [Channel; 3]) -> Result<Self> {
        Self::from_rgb_image(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Paints an axis-aligned rectangle, clipped to the frame. Used mostly to
    /// build synthetic scenes.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgb: [Channel; 3]) {
        let x_end = (x + width).min(self.width());
        let y_end = (y + height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, Rgb(rgb));
            }
        }
    }

    /// Interleaved BGR bytes, ready to be copied into a `CV_8UC3` matrix.
    pub fn to_bgr_bytes(&self) -> Vec<Byte> {
        let mut bgr = Vec::with_capacity(self.image.as_raw().len());
        for rgb in self.image.as_raw().chunks_exact(BGR_CHANNELS) {
            bgr.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
        }
        bgr
    }
}
