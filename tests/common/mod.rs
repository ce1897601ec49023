mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from docscan for tests
pub use docscan::{
    Degradation, DirectoryArtifacts, MemoryArtifacts, Pipeline, Point2D, ScanConfig, ScanError,
    ScanOutcome,
};
