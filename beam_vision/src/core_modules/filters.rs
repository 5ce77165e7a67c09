// THEORY:
// Noise suppression and binarization of the grayscale frame.
//
// A headlight is a large saturated disc, sensor noise is a scattering of single
// hot pixels. A wide Gaussian blur erases the latter and only slightly erodes
// the former, so thresholding the blurred image keeps real light sources and
// drops speckle. The kernel is separable, which turns a 15x15 convolution
// into two 15-tap passes.

use crate::core_modules::color::{MASK_OFF, MASK_ON};
use crate::core_modules::geometry::Rect;
use crate::error::{Result, VisionError};
use image::{GrayImage, Luma};

/// Default blur kernel edge, in pixels.
pub const BLUR_KERNEL_SIZE: u32 = 15;

/// Sigma OpenCV derives when it is given only a kernel size.
pub fn sigma_for_kernel(ksize: u32) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1D Gaussian weights of length `ksize`.
pub fn gaussian_kernel(ksize: u32) -> Result<Vec<f32>> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(VisionError::KernelSize(ksize));
    }
    let sigma = sigma_for_kernel(ksize);
    let radius = (ksize / 2) as i32;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i * i) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| (w / total) as f32).collect())
}

/// Mirrors an out-of-range index back into `0..len` without repeating the
/// edge pixel (`dcb|abcd|cba`).
fn reflect_101(index: i32, len: i32) -> usize {
    if len == 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * len - 2 - i;
        }
    }
    i as usize
}

pub fn gaussian_blur(gray: &GrayImage, ksize: u32) -> Result<GrayImage> {
    let kernel = gaussian_kernel(ksize)?;
    let radius = (ksize / 2) as i32;
    let (width, height) = gray.dimensions();
    let (w, h) = (width as i32, height as i32);
    let src = gray.as_raw();

    // --- 1. Horizontal pass ---
    let mut horizontal = vec![0f32; src.len()];
    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x + k as i32 - radius, w);
                acc += weight * src[row + sx] as f32;
            }
            horizontal[row + x as usize] = acc;
        }
    }

    // --- 2. Vertical pass ---
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y + k as i32 - radius, h);
                acc += weight * horizontal[sy * width as usize + x as usize];
            }
            out.put_pixel(x as u32, y as u32, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    Ok(out)
}

/// 255 where the pixel is strictly brighter than `cutoff`, 0 elsewhere.
pub fn threshold_binary(gray: &GrayImage, cutoff: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > cutoff {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

/// Number of pixels strictly brighter than `cutoff`.
pub fn count_above(gray: &GrayImage, cutoff: u8) -> usize {
    gray.as_raw().iter().filter(|&&v| v > cutoff).count()
}

/// Number of non-zero mask pixels inside `rect`, clipped to the mask.
pub fn count_non_zero(mask: &GrayImage, rect: &Rect) -> usize {
    let x_end = (rect.x + rect.width).min(mask.width());
    let y_end = (rect.y + rect.height).min(mask.height());
    let mut count = 0;
    for y in rect.y..y_end {
        for x in rect.x..x_end {
            if mask.get_pixel(x, y).0[0] != MASK_OFF {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(BLUR_KERNEL_SIZE).unwrap();
        assert_eq!(kernel.len(), 15);
        let total: f32 = kernel.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[14]).abs() < 1e-7);
        assert!(kernel[7] > kernel[6]);
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert_eq!(gaussian_kernel(4).unwrap_err(), VisionError::KernelSize(4));
        assert_eq!(gaussian_kernel(0).unwrap_err(), VisionError::KernelSize(0));
    }

    #[test]
    fn reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn blur_preserves_flat_images() {
        let gray = GrayImage::from_pixel(20, 10, Luma([200]));
        let blurred = gaussian_blur(&gray, BLUR_KERNEL_SIZE).unwrap();
        assert!(blurred.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn blur_removes_single_hot_pixel() {
        let mut gray = GrayImage::new(40, 40);
        gray.put_pixel(20, 20, Luma([255]));
        let blurred = gaussian_blur(&gray, BLUR_KERNEL_SIZE).unwrap();
        assert_eq!(count_above(&blurred, 245), 0);
    }

    #[test]
    fn threshold_is_strict() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, Luma([245]));
        gray.put_pixel(1, 0, Luma([246]));
        gray.put_pixel(2, 0, Luma([255]));
        let mask = threshold_binary(&gray, 245);
        assert_eq!(mask.as_raw(), &vec![0u8, 255, 255]);
    }

    #[test]
    fn count_non_zero_clips_rect() {
        let mask = GrayImage::from_pixel(4, 4, Luma([MASK_ON]));
        let rect = Rect::new(2, 2, 10, 10);
        assert_eq!(count_non_zero(&mask, &rect), 4);
    }
}
