use std::cmp::Ordering;

use image::GrayImage;
use tracing::{debug, info, instrument};

use crate::config::ScanConfig;
use crate::detection::contours::{approximate_polygon, find_external_contours};
use crate::error::DetectionFailure;
use crate::models::{Contour, Quadrilateral};

/// Picks the document outline out of an edge map.
#[derive(Debug, Clone)]
pub struct QuadrilateralDetector {
    pub max_candidates: usize,
    pub epsilon_ratio: f64,
}

impl QuadrilateralDetector {
    pub fn new(max_candidates: usize, epsilon_ratio: f64) -> Self {
        Self {
            max_candidates,
            epsilon_ratio,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.max_candidates, config.epsilon_ratio)
    }

    /// Return the largest contour that approximates to exactly four vertices.
    ///
    /// Corners come back in the order the approximation produced them; callers
    /// canonicalize before using them as a warp source.
    #[instrument(skip_all, fields(width = edges.width(), height = edges.height()))]
    pub fn detect(&self, edges: &GrayImage) -> Result<Quadrilateral, DetectionFailure> {
        let contours = rank_candidates(find_external_contours(edges));
        debug!(count = contours.len(), "Contours found");
        if contours.is_empty() {
            return Err(DetectionFailure::NoContours);
        }

        let examined = contours.len().min(self.max_candidates);
        for (i, contour) in contours.iter().take(examined).enumerate() {
            if let Some(quad) = self.as_quadrilateral(contour) {
                info!(
                    candidate = i + 1,
                    area = contour.area(),
                    "Document outline found"
                );
                return Ok(quad);
            }
        }

        Err(DetectionFailure::NoQuadrilateral { examined })
    }

    /// Approximate `contour` and keep it only if four vertices remain.
    pub fn as_quadrilateral(&self, contour: &Contour) -> Option<Quadrilateral> {
        let epsilon = self.epsilon_ratio * contour.perimeter();
        if epsilon <= 0.0 {
            return None;
        }
        let approx = approximate_polygon(&contour.points, epsilon);
        debug!(points = contour.len(), vertices = approx.len(), "Approximated contour");
        let corners: [_; 4] = approx.try_into().ok()?;
        Some(Quadrilateral::new(corners))
    }
}

/// Order contours by enclosed area, largest first.
///
/// Equal areas are ordered by their top-most, then left-most point so the
/// choice does not depend on tracing order.
pub fn rank_candidates(mut contours: Vec<Contour>) -> Vec<Contour> {
    contours.sort_by(|a, b| {
        b.area()
            .total_cmp(&a.area())
            .then_with(|| match (a.anchor(), b.anchor()) {
                (Some(pa), Some(pb)) => pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x)),
                _ => Ordering::Equal,
            })
    });
    contours
}
