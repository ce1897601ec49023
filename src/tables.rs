//! Cropping of table regions reported by a document-analysis service.
//!
//! Talking to the service is left to the caller; this module only turns the
//! polygons it reports into binarized crops.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, ScanError};
use crate::models::{BoundingBox, Point2D};
use crate::scan::Scanizer;

/// A detected table outline in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRegion {
    /// Flat `[x1, y1, x2, y2, ...]` vertex list.
    pub polygon: Vec<f64>,
}

impl TableRegion {
    pub fn vertices(&self) -> Vec<Point2D> {
        self.polygon
            .chunks_exact(2)
            .map(|xy| Point2D::new(xy[0], xy[1]))
            .collect()
    }

    /// Axis-aligned box around the polygon, clamped to a `width` x `height`
    /// image. `None` when nothing of it lies inside the image.
    pub fn bounding_box(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let vertices = self.vertices();
        if vertices.is_empty() {
            return None;
        }
        let xs = vertices.iter().map(|p| p.x);
        let ys = vertices.iter().map(|p| p.y);
        let x_min = xs.clone().fold(f64::INFINITY, f64::min) as i64;
        let x_max = xs.fold(f64::NEG_INFINITY, f64::max) as i64;
        let y_min = ys.clone().fold(f64::INFINITY, f64::min) as i64;
        let y_max = ys.fold(f64::NEG_INFINITY, f64::max) as i64;

        let x0 = x_min.clamp(0, width as i64);
        let y0 = y_min.clamp(0, height as i64);
        let x1 = x_max.clamp(0, width as i64);
        let y1 = y_max.clamp(0, height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(BoundingBox {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Anything that can report table regions for an image.
pub trait TableRegionSource {
    fn regions(&self) -> Result<Vec<TableRegion>>;
}

/// Table regions stored as JSON: `[{"polygon": [x1, y1, ...]}, ...]`.
#[derive(Debug, Clone)]
pub struct JsonRegionFile {
    path: PathBuf,
}

impl JsonRegionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableRegionSource for JsonRegionFile {
    fn regions(&self) -> Result<Vec<TableRegion>> {
        let text = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|source| ScanError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// One cropped and binarized table.
#[derive(Debug, Clone)]
pub struct TableCrop {
    /// 1-based position in the region list.
    pub index: usize,
    pub bounds: BoundingBox,
    pub image: GrayImage,
}

/// Crop every region out of `image` and binarize it.
///
/// Regions that fall entirely outside the image are skipped.
pub fn extract_tables(
    image: &DynamicImage,
    regions: &[TableRegion],
    scanizer: &Scanizer,
) -> Vec<TableCrop> {
    let (width, height) = (image.width(), image.height());
    let mut crops = Vec::new();
    for (i, region) in regions.iter().enumerate() {
        let Some(bounds) = region.bounding_box(width, height) else {
            warn!(table = i + 1, "Table region lies outside the image, skipping");
            continue;
        };
        let crop = image.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height);
        info!(
            table = i + 1,
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            "Table cropped"
        );
        crops.push(TableCrop {
            index: i + 1,
            bounds,
            image: scanizer.scanize(&crop),
        });
    }
    crops
}

/// Save crops as `<stem>_table_<n>.png` in `dir`, returning the written paths.
pub fn save_tables(crops: &[TableCrop], dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    crops
        .iter()
        .map(|crop| {
            let path = dir.join(format!("{}_table_{}.png", stem, crop.index));
            crop.image.save(&path).map_err(|source| ScanError::Artifact {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdMethod;
    use image::{Luma, Rgb, RgbImage};

    fn region(polygon: &[f64]) -> TableRegion {
        TableRegion {
            polygon: polygon.to_vec(),
        }
    }

    #[test]
    fn bounding_box_spans_polygon() {
        let r = region(&[10.4, 20.9, 110.2, 18.0, 112.7, 80.5, 9.8, 82.0]);
        assert_eq!(
            r.bounding_box(500, 500),
            Some(BoundingBox {
                x: 9,
                y: 18,
                width: 103,
                height: 64
            })
        );
    }

    #[test]
    fn bounding_box_is_clamped() {
        let r = region(&[-20.0, -5.0, 60.0, -5.0, 60.0, 40.0, -20.0, 40.0]);
        assert_eq!(
            r.bounding_box(50, 30),
            Some(BoundingBox {
                x: 0,
                y: 0,
                width: 50,
                height: 30
            })
        );
    }

    #[test]
    fn region_outside_image_is_skipped() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
        let scanizer = Scanizer::new(11, 10, ThresholdMethod::Gaussian).unwrap();
        let regions = vec![
            region(&[100.0, 100.0, 150.0, 100.0, 150.0, 150.0, 100.0, 150.0]),
            region(&[5.0, 5.0, 25.0, 5.0, 25.0, 15.0, 5.0, 15.0]),
        ];
        let crops = extract_tables(&img, &regions, &scanizer);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].index, 2);
        assert_eq!(crops[0].image.dimensions(), (20, 10));
    }

    #[test]
    fn regions_parse_from_json() {
        let regions: Vec<TableRegion> =
            serde_json::from_str(r#"[{"polygon": [1, 2, 3, 4, 5, 6, 7, 8]}]"#).unwrap();
        assert_eq!(regions[0].vertices().len(), 4);
        assert_eq!(regions[0].vertices()[3], Point2D::new(7.0, 8.0));
    }

    #[test]
    fn crops_are_saved_with_stem() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let crop = TableCrop {
            index: 1,
            bounds: BoundingBox {
                x: 0,
                y: 0,
                width: 3,
                height: 3,
            },
            image: GrayImage::from_pixel(3, 3, Luma([255])),
        };
        let paths = save_tables(&[crop], dir.path(), "acta")?;
        assert_eq!(paths, vec![dir.path().join("acta_table_1.png")]);
        assert!(paths[0].exists());
        Ok(())
    }
}
