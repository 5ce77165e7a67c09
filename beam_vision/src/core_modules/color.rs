// THEORY:
// Color-space conversions for a single frame. Two "lenses" are needed by the
// classifier:
// 1.  **Grayscale** for brightness. Headlights saturate the sensor, so a plain
//     Rec. 601 luma is enough to find them.
// 2.  **HSV** for redness. Tail lamps are identified by hue, not brightness. Red
//     sits on both ends of the hue circle, so the red mask is the union of two
//     ranges.
//
// All conversions follow OpenCV's 8-bit conventions (hue halved into 0..180,
// fixed-point luma weights) so thresholds tuned against a live OpenCV pipeline
// carry over unchanged.

use crate::core_modules::frame::Frame;
use crate::error::{Result, VisionError};
use image::{GrayImage, ImageBuffer, Luma, Rgb};

/// Three-channel image holding hue (0..=179), saturation and value per pixel.
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// An inclusive box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl HsvRange {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.low[c] <= hsv[c] && hsv[c] <= self.high[c])
    }
}

/// Lower red band, hue just above zero.
pub const RED_LOW_HUES: HsvRange = HsvRange::new([0, 120, 70], [10, 255, 255]);
/// Upper red band, hue wrapping back towards 180.
pub const RED_HIGH_HUES: HsvRange = HsvRange::new([170, 120, 70], [180, 255, 255]);

/// Luma of a single RGB pixel with OpenCV's fixed-point weights.
pub fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb;
    let weighted = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

pub fn to_grayscale(frame: &Frame) -> GrayImage {
    let image = frame.image();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y).0)])
    })
}

/// Converts one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as i32);
    let value = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = value - min;

    let saturation = if value == 0 {
        0
    } else {
        (255.0 * chroma as f64 / value as f64).round() as i32
    };

    let hue = if chroma == 0 {
        0.0
    } else {
        let degrees = if value == r {
            60.0 * (g - b) as f64 / chroma as f64
        } else if value == g {
            120.0 + 60.0 * (b - r) as f64 / chroma as f64
        } else {
            240.0 + 60.0 * (r - g) as f64 / chroma as f64
        };
        if degrees < 0.0 { degrees + 360.0 } else { degrees }
    };
    let mut half_hue = (hue / 2.0).round() as i32;
    if half_hue >= 180 {
        half_hue -= 180;
    }

    [half_hue as u8, saturation as u8, value as u8]
}

pub fn to_hsv(frame: &Frame) -> HsvImage {
    let image = frame.image();
    HsvImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb(rgb_to_hsv(image.get_pixel(x, y).0))
    })
}

/// Binary mask of the pixels that fall inside `range`.
pub fn in_range(hsv: &HsvImage, range: &HsvRange) -> GrayImage {
    GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        if range.contains(hsv.get_pixel(x, y).0) {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

/// Pixelwise OR of two masks of the same size.
fn mask_union(mut left: GrayImage, right: &GrayImage) -> GrayImage {
    for (l, r) in left.iter_mut().zip(right.iter()) {
        *l |= *r;
    }
    left
}

/// Tail-lamp mask: union of the low and high red hue bands.
pub fn red_mask(hsv: &HsvImage) -> GrayImage {
    let low = in_range(hsv, &RED_LOW_HUES);
    let high = in_range(hsv, &RED_HIGH_HUES);
    mask_union(low, &high)
}

/// Keeps the frame's pixels under the mask and blacks out the rest.
pub fn red_overlay(frame: &Frame, mask: &GrayImage) -> Result<Frame> {
    if mask.dimensions() != (frame.width(), frame.height()) {
        return Err(VisionError::MaskDimensions {
            mask_width: mask.width(),
            mask_height: mask.height(),
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }

    let mut overlay = frame.clone();
    for (x, y, pixel) in overlay.image_mut().enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[0] == MASK_OFF {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    Ok(overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_matches_opencv_weights() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn primary_colors_map_to_halved_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn magenta_leaning_red_wraps_near_180() {
        // Hue of 350 degrees lands in the upper red band.
        let hsv = rgb_to_hsv([255, 0, 42]);
        assert!(hsv[0] >= 170 && hsv[0] < 180, "hue was {}", hsv[0]);
        assert!(RED_HIGH_HUES.contains(hsv));
    }

    #[test]
    fn in_range_bounds_are_inclusive() {
        let pixels = [
            [0, 120, 70],
            [10, 255, 255],
            [11, 200, 200],
            [5, 119, 200],
            [5, 200, 69],
        ];
        let hsv = HsvImage::from_fn(pixels.len() as u32, 1, |x, _| Rgb(pixels[x as usize]));

        let mask = in_range(&hsv, &RED_LOW_HUES);
        assert_eq!(mask.as_raw(), &vec![MASK_ON, MASK_ON, MASK_OFF, MASK_OFF, MASK_OFF]);
    }

    #[test]
    fn red_mask_is_union_of_both_bands() {
        let pixels = [[3, 200, 200], [175, 200, 200], [90, 200, 200]];
        let hsv = HsvImage::from_fn(pixels.len() as u32, 1, |x, _| Rgb(pixels[x as usize]));

        assert_eq!(in_range(&hsv, &RED_LOW_HUES).as_raw(), &vec![MASK_ON, MASK_OFF, MASK_OFF]);
        assert_eq!(in_range(&hsv, &RED_HIGH_HUES).as_raw(), &vec![MASK_OFF, MASK_ON, MASK_OFF]);
        assert_eq!(red_mask(&hsv).as_raw(), &vec![MASK_ON, MASK_ON, MASK_OFF]);
    }

    #[test]
    fn red_mask_flags_tail_lamp_red_only() {
        let mut frame = Frame::filled(4, 1, [0, 0, 0]).unwrap();
        frame.fill_rect(0, 0, 1, 1, [220, 20, 20]);
        frame.fill_rect(1, 0, 1, 1, [255, 255, 255]);
        frame.fill_rect(2, 0, 1, 1, [60, 10, 10]);
        frame.fill_rect(3, 0, 1, 1, [240, 10, 40]);

        let mask = red_mask(&to_hsv(&frame));
        assert_eq!(mask.get_pixel(0, 0).0[0], MASK_ON);
        // White is unsaturated.
        assert_eq!(mask.get_pixel(1, 0).0[0], MASK_OFF);
        // Too dark for the value bound.
        assert_eq!(mask.get_pixel(2, 0).0[0], MASK_OFF);
        assert_eq!(mask.get_pixel(3, 0).0[0], MASK_ON);
    }

    #[test]
    fn overlay_keeps_only_masked_pixels() {
        let frame = Frame::filled(2, 1, [10, 20, 30]).unwrap();
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(1, 0, Luma([MASK_ON]));

        let overlay = red_overlay(&frame, &mask).unwrap();
        assert_eq!(overlay.image().get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(overlay.image().get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn overlay_rejects_mismatched_mask() {
        let frame = Frame::filled(2, 2, [0, 0, 0]).unwrap();
        let mask = GrayImage::new(3, 2);
        assert!(matches!(
            red_overlay(&frame, &mask),
            Err(VisionError::MaskDimensions { .. })
        ));
    }
}
