pub mod contours;
pub mod preprocessing;
pub mod quadrilateral;

use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::config::ScanConfig;
use crate::models::ScaleRatio;

pub use quadrilateral::QuadrilateralDetector;

/// Downscales photos to the working resolution used for detection.
#[derive(Debug, Clone)]
pub struct Resizer {
    pub target_width: u32,
}

impl Resizer {
    pub fn new(target_width: u32) -> Self {
        Self { target_width }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.working_width)
    }

    pub fn resize(&self, img: &DynamicImage) -> (DynamicImage, ScaleRatio) {
        preprocessing::resize(img, self.target_width)
    }
}

/// Grayscale, smooth and edge-detect a working image.
#[derive(Debug, Clone)]
pub struct EdgeExtractor {
    pub blur_kernel: u32,
    pub low_threshold: f32,
    pub high_threshold: f32,
}

/// Output of [`EdgeExtractor::extract`]. The smoothed grayscale is kept
/// because it is persisted as an artifact of its own.
pub struct EdgeMaps {
    pub gray: GrayImage,
    pub edges: GrayImage,
}

impl EdgeExtractor {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            blur_kernel: config.blur_kernel,
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
        }
    }

    #[instrument(skip_all, fields(width = img.width(), height = img.height()))]
    pub fn extract(&self, img: &DynamicImage) -> EdgeMaps {
        let gray = preprocessing::apply_blur(&preprocessing::to_grayscale(img), self.blur_kernel);
        let edges = preprocessing::detect_edges(&gray, self.low_threshold, self.high_threshold);
        debug!(
            edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count(),
            "Edge map computed"
        );
        EdgeMaps { gray, edges }
    }
}

impl Default for EdgeExtractor {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}
