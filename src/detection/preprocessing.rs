use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

use crate::models::ScaleRatio;

/// Downscale `img` to `target_width`, keeping the aspect ratio.
///
/// Returns the working image and the ratio that maps its coordinates back
/// onto `img`. Images already at or below the target width come back
/// unchanged with a ratio of 1.
#[instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn resize(img: &DynamicImage, target_width: u32) -> (DynamicImage, ScaleRatio) {
    let (width, height) = (img.width(), img.height());
    if target_width == 0 || width <= target_width {
        debug!("Image already within working width, not resizing");
        return (img.clone(), ScaleRatio::IDENTITY);
    }

    let ratio = width as f64 / target_width as f64;
    let new_height = ((height as f64 / ratio) as u32).max(1);
    let resized = img.resize_exact(target_width, new_height, FilterType::Triangle);

    debug!(
        new_width = target_width,
        new_height,
        ratio,
        "Resized to working resolution"
    );
    (resized, ScaleRatio::new(ratio))
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Gaussian sigma for a square kernel of side `kernel_size`.
///
/// Follows the usual convention for deriving sigma from an aperture when none
/// is given, so a 5x5 kernel blurs with sigma 1.1.
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    let k = kernel_size.max(1) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, kernel_size: u32) -> GrayImage {
    let sigma = kernel_sigma(kernel_size);
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}
