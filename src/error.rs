use std::path::PathBuf;

use thiserror::Error;

/// Hard failures that abort a run.
///
/// Per-image detection and geometry problems never show up here; they are
/// absorbed by the pipeline's fallbacks (see [`DetectionFailure`] and
/// [`RectificationError`]).
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("input image not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("input image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to write {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why the quadrilateral detector could not find a document outline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionFailure {
    #[error("edge map contains no closed contours")]
    NoContours,

    #[error("none of the {examined} largest contours approximates to 4 vertices")]
    NoQuadrilateral { examined: usize },
}

/// Why a quadrilateral could not be rectified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RectificationError {
    #[error("degenerate quadrilateral: {0}")]
    DegenerateGeometry(String),

    #[error("rectified size collapsed to {width}x{height}")]
    Collapsed { width: u32, height: u32 },
}
