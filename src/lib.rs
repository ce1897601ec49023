pub mod artifacts;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rectify;
pub mod scan;
pub mod tables;

pub use artifacts::{ArtifactSink, DirectoryArtifacts, MemoryArtifacts, NoArtifacts};
pub use config::{ScanConfig, ThresholdMethod};
pub use detection::{EdgeExtractor, QuadrilateralDetector, Resizer};
pub use error::{DetectionFailure, RectificationError, Result, ScanError};
pub use models::{BoundingBox, Contour, Point2D, Quadrilateral, ScaleRatio};
pub use pipeline::{Degradation, Pipeline, RunContext, ScanOutcome, ScanState};
pub use rectify::{PerspectiveRectifier, TransformMatrix, order_points, solve_homography};
pub use scan::Scanizer;

use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::info;

/// Read and decode the photo at `path`.
///
/// A missing file is reported as [`ScanError::InputNotFound`]; anything the
/// decoder rejects as [`ScanError::Decode`].
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ScanError::InputNotFound(path.to_path_buf()));
    }
    let decode_err = |source| ScanError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_err)?;
    info!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "Image loaded"
    );
    Ok(img)
}
