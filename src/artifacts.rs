use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::debug;

use crate::error::{Result, ScanError};

/// Receives the intermediate image of every pipeline stage.
pub trait ArtifactSink {
    /// Store the output of stage number `index` (1-based) called `stage`.
    fn save(&mut self, index: usize, stage: &str, image: &DynamicImage) -> Result<()>;
}

/// File name for a stage artifact, e.g. `2_edges.png`.
pub fn artifact_file_name(index: usize, stage: &str) -> String {
    format!("{}_{}.png", index, stage.to_lowercase().replace(' ', "_"))
}

/// Writes artifacts as PNG files into one directory, replacing earlier runs.
#[derive(Debug, Clone)]
pub struct DirectoryArtifacts {
    output_dir: PathBuf,
}

impl DirectoryArtifacts {
    /// Create the directory if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ArtifactSink for DirectoryArtifacts {
    fn save(&mut self, index: usize, stage: &str, image: &DynamicImage) -> Result<()> {
        let path = self.output_dir.join(artifact_file_name(index, stage));
        image.save(&path).map_err(|source| ScanError::Artifact {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Artifact saved");
        Ok(())
    }
}

/// Keeps artifacts in memory. Handy for tests and for callers that want to
/// show the stages instead of writing them out.
#[derive(Default)]
pub struct MemoryArtifacts {
    pub artifacts: Vec<(String, DynamicImage)>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&DynamicImage> {
        self.artifacts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, img)| img)
    }
}

impl ArtifactSink for MemoryArtifacts {
    fn save(&mut self, index: usize, stage: &str, image: &DynamicImage) -> Result<()> {
        self.artifacts
            .push((artifact_file_name(index, stage), image.clone()));
        Ok(())
    }
}

/// Discards every artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArtifacts;

impl ArtifactSink for NoArtifacts {
    fn save(&mut self, _index: usize, _stage: &str, _image: &DynamicImage) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn file_names_follow_stage_order() {
        assert_eq!(artifact_file_name(1, "Grayscale"), "1_grayscale.png");
        assert_eq!(artifact_file_name(4, "rectified document"), "4_rectified_document.png");
    }

    #[test]
    fn directory_sink_overwrites_previous_run() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let mut sink = DirectoryArtifacts::new(dir.path().join("proceso"))?;
        let dark = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([0])));
        let light = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));

        sink.save(5, "scan", &dark)?;
        sink.save(5, "scan", &light)?;

        let reloaded = image::open(sink.output_dir().join("5_scan.png"))?.to_luma8();
        assert_eq!(reloaded.get_pixel(0, 0).0[0], 255);
        assert_eq!(std::fs::read_dir(sink.output_dir())?.count(), 1);
        Ok(())
    }
}
