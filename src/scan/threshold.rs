use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;
use tracing::{debug, instrument};

use crate::config::{ScanConfig, ThresholdMethod};
use crate::detection::preprocessing::kernel_sigma;
use crate::error::{Result, ScanError};

/// Largest accepted thresholding neighbourhood.
pub const MAX_BLOCK_SIZE: u32 = 255;

/// Turns a rectified document into a black-and-white scan.
///
/// Each pixel is compared with the weighted mean of its `block_size` square
/// neighbourhood minus `bias`: brighter pixels become white (255), the rest
/// black (0). Comparing against a local rather than a global level removes
/// shadows and uneven lighting.
#[derive(Debug, Clone)]
pub struct Scanizer {
    block_size: u32,
    bias: i32,
    method: ThresholdMethod,
}

impl Scanizer {
    pub fn new(block_size: u32, bias: i32, method: ThresholdMethod) -> Result<Self> {
        if block_size < 3 || block_size % 2 == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(ScanError::InvalidConfiguration(format!(
                "neighbourhood size must be odd and between 3 and {}, got {}",
                MAX_BLOCK_SIZE, block_size
            )));
        }
        Ok(Self {
            block_size,
            bias,
            method,
        })
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Self::new(config.block_size, config.bias, config.method)
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn bias(&self) -> i32 {
        self.bias
    }

    /// Grayscale `img` and binarize it.
    #[instrument(skip_all, fields(block_size = self.block_size, bias = self.bias))]
    pub fn scanize(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        let out = self.threshold(&gray);
        debug!("Adaptive thresholding complete");
        out
    }

    /// Binarize an already grayscale image.
    pub fn threshold(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }

        let means = match self.method {
            ThresholdMethod::Gaussian => gaussian_means(gray, self.block_size),
            ThresholdMethod::Mean => box_means(gray, self.block_size),
        };

        GrayImage::from_fn(width, height, |x, y| {
            let idx = y as usize * width as usize + x as usize;
            let level = means[idx].round() as i64 - self.bias as i64;
            let value = gray.get_pixel(x, y).0[0] as i64;
            Luma([if value > level { 255 } else { 0 }])
        })
    }
}

/// Normalised 1-D Gaussian weights for a kernel of odd length `size`.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = kernel_sigma(size);
    let centre = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - centre;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Gaussian-weighted neighbourhood means, replicating edge pixels outward.
fn gaussian_means(gray: &GrayImage, block_size: u32) -> Vec<f32> {
    let levels: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gray.get_pixel(x, y).0[0] as f32])
        });
    separable_filter_equal(&levels, &gaussian_kernel(block_size)).into_raw()
}

/// Plain neighbourhood means from a summed-area table. The window is clipped
/// at the image border.
fn box_means(gray: &GrayImage, block_size: u32) -> Vec<f32> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[y as usize * stride + (x + 1) as usize];
        }
    }

    let radius = block_size / 2;
    let mut means = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let x1 = x.saturating_sub(radius) as usize;
            let y1 = y.saturating_sub(radius) as usize;
            let x2 = (x + radius + 1).min(w) as usize;
            let y2 = (y + radius + 1).min(h) as usize;
            let area = ((x2 - x1) * (y2 - y1)) as f64;
            let sum = table[y2 * stride + x2] as f64 - table[y1 * stride + x2] as f64
                - table[y2 * stride + x1] as f64
                + table[y1 * stride + x1] as f64;
            means.push((sum / area) as f32);
        }
    }
    means
}
