use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::scan::threshold::MAX_BLOCK_SIZE;

/// Largest accepted smoothing kernel for edge detection.
pub const MAX_BLUR_KERNEL: u32 = 31;

/// How the scanizer weighs the neighbourhood when computing the local threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Gaussian-weighted neighbourhood mean.
    #[default]
    Gaussian,
    /// Plain box mean over the neighbourhood.
    Mean,
}

/// Operator-tunable constants for one pipeline run.
///
/// Every field has a default, so a config file only needs to list the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Width the photo is downscaled to before edge and contour detection.
    pub working_width: u32,
    /// Side of the Gaussian smoothing kernel applied before edge detection.
    /// Odd, at most [`MAX_BLUR_KERNEL`].
    pub blur_kernel: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// How many of the largest contours are tried as document candidates.
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
    /// Neighbourhood side for adaptive thresholding. Odd, between 3 and
    /// [`MAX_BLOCK_SIZE`].
    pub block_size: u32,
    /// Constant subtracted from the local mean.
    pub bias: i32,
    pub method: ThresholdMethod,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_width: 500,
            blur_kernel: 5,
            canny_low: 75.0,
            canny_high: 200.0,
            max_candidates: 10,
            epsilon_ratio: 0.02,
            block_size: 11,
            bias: 10,
            method: ThresholdMethod::Gaussian,
        }
    }
}

impl ScanConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ScanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Reject configurations no stage can run with.
    pub fn validate(&self) -> Result<()> {
        if self.working_width == 0 {
            return Err(ScanError::InvalidConfiguration(
                "working width must be positive".into(),
            ));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 || self.blur_kernel > MAX_BLUR_KERNEL
        {
            return Err(ScanError::InvalidConfiguration(format!(
                "blur kernel must be odd and at most {}, got {}",
                MAX_BLUR_KERNEL, self.blur_kernel
            )));
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(ScanError::InvalidConfiguration(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                self.canny_low, self.canny_high
            )));
        }
        if self.max_candidates == 0 {
            return Err(ScanError::InvalidConfiguration(
                "at least one contour candidate must be examined".into(),
            ));
        }
        if !(self.epsilon_ratio > 0.0) {
            return Err(ScanError::InvalidConfiguration(format!(
                "epsilon ratio must be positive, got {}",
                self.epsilon_ratio
            )));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ScanError::InvalidConfiguration(format!(
                "neighbourhood size must be odd and between 3 and {}, got {}",
                MAX_BLOCK_SIZE, self.block_size
            )));
        }
        Ok(())
    }
}
