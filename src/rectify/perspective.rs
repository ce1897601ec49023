use std::cmp::Ordering;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, warp_into_with};
use tracing::{debug, info, instrument};

use crate::error::RectificationError;
use crate::models::{Point2D, Quadrilateral, ScaleRatio};
use crate::rectify::homography::{TransformMatrix, solve_homography};

/// Corners closer than this (in pixels) count as the same point.
const COINCIDENT_EPSILON: f64 = 1e-6;

/// Source coordinates this far past the first or last pixel still count as
/// inside the photo. Absorbs rounding in the inverse transform.
const EDGE_TOLERANCE: f64 = 1e-3;

/// Pre-image handed to the sampler for pixels that fall outside the photo.
const OUTSIDE: (f32, f32) = (-1.0, -1.0);

/// Put corners in top-left, top-right, bottom-right, bottom-left order.
///
/// The smallest `x + y` is top-left and the largest bottom-right; the
/// smallest `y - x` is top-right and the largest bottom-left. Equal keys are
/// settled by `(x, y)`, so any rotation of the input gives the same result.
pub fn order_points(quad: &Quadrilateral) -> Quadrilateral {
    let pts = &quad.corners;
    let sum = |p: &Point2D| p.x + p.y;
    let diff = |p: &Point2D| p.y - p.x;

    // A four-element array always has a min and a max.
    let pick = |p: Option<&Point2D>| p.copied().unwrap_or_default();
    Quadrilateral::new([
        pick(pts.iter().min_by(compare_by(sum))),
        pick(pts.iter().min_by(compare_by(diff))),
        pick(pts.iter().max_by(compare_by(sum))),
        pick(pts.iter().max_by(compare_by(diff))),
    ])
}

fn compare_by(key: impl Fn(&Point2D) -> f64) -> impl Fn(&&Point2D, &&Point2D) -> Ordering {
    move |a: &&Point2D, b: &&Point2D| {
        key(a)
            .total_cmp(&key(b))
            .then(a.x.total_cmp(&b.x))
            .then(a.y.total_cmp(&b.y))
    }
}

/// Output size for an ordered quadrilateral: the longer of each pair of
/// opposite sides, truncated to whole pixels.
pub fn target_dimensions(ordered: &Quadrilateral) -> (u32, u32) {
    let [tl, tr, br, bl] = ordered.corners;
    let width = tl.distance(&tr).max(bl.distance(&br));
    let height = tl.distance(&bl).max(tr.distance(&br));
    (width as u32, height as u32)
}

/// Corners of the `width` x `height` output rectangle, in canonical order.
pub fn destination_corners(width: u32, height: u32) -> [Point2D; 4] {
    let right = width.saturating_sub(1) as f64;
    let bottom = height.saturating_sub(1) as f64;
    [
        Point2D::new(0.0, 0.0),
        Point2D::new(right, 0.0),
        Point2D::new(right, bottom),
        Point2D::new(0.0, bottom),
    ]
}

/// A planned warp: where the document sits in the source and what it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectificationPlan {
    pub source: Quadrilateral,
    pub width: u32,
    pub height: u32,
    pub transform: TransformMatrix,
}

/// Flattens the document region of the full-resolution photo.
#[derive(Debug, Clone)]
pub struct PerspectiveRectifier {
    /// Fill for output pixels that sample outside the source image.
    pub background: Rgb<u8>,
}

impl Default for PerspectiveRectifier {
    fn default() -> Self {
        Self {
            background: Rgb([0, 0, 0]),
        }
    }
}

impl PerspectiveRectifier {
    /// Scale `quad` up to full resolution, order it and solve the transform.
    pub fn plan(
        &self,
        quad: &Quadrilateral,
        ratio: ScaleRatio,
    ) -> Result<RectificationPlan, RectificationError> {
        let source = order_points(&quad.scaled(ratio));
        let c = &source.corners;
        for i in 0..4 {
            for j in i + 1..4 {
                if c[i].distance(&c[j]) < COINCIDENT_EPSILON {
                    return Err(RectificationError::DegenerateGeometry(format!(
                        "corners {} and {} coincide at ({:.1}, {:.1})",
                        i, j, c[i].x, c[i].y
                    )));
                }
            }
        }

        let (width, height) = target_dimensions(&source);
        if width < 1 || height < 1 {
            return Err(RectificationError::Collapsed { width, height });
        }

        let transform = solve_homography(&source.corners, &destination_corners(width, height))?;
        Ok(RectificationPlan {
            source,
            width,
            height,
            transform,
        })
    }

    /// Warp the document outlined by `quad` (in working coordinates) out of
    /// `original` into an axis-aligned rectangle.
    #[instrument(skip_all, fields(ratio = ratio.get()))]
    pub fn rectify(
        &self,
        original: &DynamicImage,
        quad: &Quadrilateral,
        ratio: ScaleRatio,
    ) -> Result<RgbImage, RectificationError> {
        let plan = self.plan(quad, ratio)?;
        debug!(
            top_left = ?plan.source.corners[0],
            top_right = ?plan.source.corners[1],
            bottom_right = ?plan.source.corners[2],
            bottom_left = ?plan.source.corners[3],
            "Corners ordered"
        );

        let inverse = plan.transform.inverse().ok_or_else(|| {
            RectificationError::DegenerateGeometry("transform is not invertible".into())
        })?;

        let source = original.to_rgb8();
        let (src_width, src_height) = source.dimensions();
        let padded = pad_trailing_edges(&source);
        let mut output = RgbImage::new(plan.width, plan.height);
        warp_into_with(
            &padded,
            |x, y| {
                inverse
                    .apply(Point2D::new(x as f64, y as f64))
                    .and_then(|p| {
                        Some((
                            clamp_to_extent(p.x, src_width)?,
                            clamp_to_extent(p.y, src_height)?,
                        ))
                    })
                    .unwrap_or(OUTSIDE)
            },
            Interpolation::Bilinear,
            self.background,
            &mut output,
        );

        info!(
            width = plan.width,
            height = plan.height,
            "Perspective correction applied"
        );
        Ok(output)
    }
}

/// Map a source coordinate onto `[0, extent - 1]`, or `None` if it lies
/// outside the photo.
fn clamp_to_extent(v: f64, extent: u32) -> Option<f32> {
    let last = extent.saturating_sub(1) as f64;
    if !(v >= -EDGE_TOLERANCE && v <= last + EDGE_TOLERANCE) {
        return None;
    }
    Some(v.clamp(0.0, last) as f32)
}

/// Copy of `image` with its last column and row repeated once, so bilinear
/// taps at the final pixel stay in bounds.
fn pad_trailing_edges(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    RgbImage::from_fn(width + 1, height + 1, |x, y| {
        *image.get_pixel(x.min(width - 1), y.min(height - 1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(raw: [(f64, f64); 4]) -> Quadrilateral {
        Quadrilateral::new(raw.map(Point2D::from))
    }

    #[test]
    fn ordering_is_rotation_invariant() {
        let corners = [(412.0, 96.0), (388.0, 610.0), (35.0, 580.0), (60.0, 70.0)];
        let expected = quad([(60.0, 70.0), (412.0, 96.0), (388.0, 610.0), (35.0, 580.0)]);
        for shift in 0..4 {
            let mut rotated = corners;
            rotated.rotate_left(shift);
            assert_eq!(order_points(&quad(rotated)), expected, "shift {}", shift);
        }
    }

    #[test]
    fn ordering_is_rotation_invariant_with_ties() {
        // A diamond: opposite corners share the same x + y.
        let corners = [(50.0, 0.0), (100.0, 50.0), (50.0, 100.0), (0.0, 50.0)];
        let first = order_points(&quad(corners));
        for shift in 1..4 {
            let mut rotated = corners;
            rotated.rotate_left(shift);
            assert_eq!(order_points(&quad(rotated)), first);
        }
    }

    #[test]
    fn dimensions_use_longest_sides() {
        let ordered = quad([(0.0, 0.0), (100.0, 0.0), (120.0, 60.0), (-10.0, 50.0)]);
        let (w, h) = target_dimensions(&ordered);
        assert_eq!(w, 130);
        assert_eq!(h, 63);
    }

    #[test]
    fn collinear_corners_fail() {
        let line = quad([(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
        let err = PerspectiveRectifier::default()
            .plan(&line, ScaleRatio::IDENTITY)
            .unwrap_err();
        assert!(matches!(err, RectificationError::DegenerateGeometry(_)));
    }

    #[test]
    fn plan_maps_source_to_destination() {
        let q = quad([(210.0, 40.0), (20.0, 30.0), (30.0, 160.0), (190.0, 150.0)]);
        let plan = PerspectiveRectifier::default()
            .plan(&q, ScaleRatio::new(2.5))
            .unwrap();
        let dst = destination_corners(plan.width, plan.height);
        for (s, d) in plan.source.corners.iter().zip(dst.iter()) {
            let mapped = plan.transform.apply(*s).unwrap();
            assert!(mapped.distance(d) < 0.5);
        }
        assert_eq!(plan.source.corners[0], Point2D::new(50.0, 75.0));
    }

    #[test]
    fn full_frame_rectification_keeps_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, Rgb([200, 100, 50])));
        let out = PerspectiveRectifier::default()
            .rectify(&img, &Quadrilateral::full_frame(80, 60), ScaleRatio::IDENTITY)
            .unwrap();
        assert_eq!(out.dimensions(), (79, 59));
        let px = out.get_pixel(40, 30);
        assert!(px.0[0].abs_diff(200) <= 2 && px.0[1].abs_diff(100) <= 2, "{:?}", px);
    }

    #[test]
    fn full_frame_warp_samples_last_row_and_column() {
        let colour = Rgb([180, 90, 40]);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(160, 120, colour));
        let out = PerspectiveRectifier::default()
            .rectify(&img, &Quadrilateral::full_frame(160, 120), ScaleRatio::IDENTITY)
            .unwrap();
        let (w, h) = out.dimensions();
        let border = (0..w)
            .flat_map(|x| [(x, 0), (x, h - 1)])
            .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
        for (x, y) in border {
            let px = out.get_pixel(x, y);
            assert_ne!(*px, Rgb([0, 0, 0]), "background at ({}, {})", x, y);
            assert!(
                px.0.iter().zip(colour.0).all(|(a, b)| a.abs_diff(b) <= 2),
                "{:?} at ({}, {})",
                px,
                x,
                y
            );
        }
    }

    #[test]
    fn last_source_pixel_is_copied_into_corner() {
        let mut src = RgbImage::from_pixel(50, 40, Rgb([100, 100, 100]));
        src.put_pixel(49, 39, Rgb([250, 10, 10]));
        let out = PerspectiveRectifier::default()
            .rectify(
                &DynamicImage::ImageRgb8(src),
                &Quadrilateral::full_frame(50, 40),
                ScaleRatio::IDENTITY,
            )
            .unwrap();
        let (w, h) = out.dimensions();
        let px = out.get_pixel(w - 1, h - 1);
        assert!(px.0[0] >= 248 && px.0[1] <= 12, "{:?}", px);
    }

    #[test]
    fn samples_beyond_the_photo_take_the_background() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([200, 200, 200])));
        // Right half of the outline lies past the photo's right edge.
        let wide = quad([(20.0, 0.0), (79.0, 0.0), (79.0, 39.0), (20.0, 39.0)]);
        let rectifier = PerspectiveRectifier {
            background: Rgb([0, 0, 255]),
        };
        let out = rectifier.rectify(&img, &wide, ScaleRatio::IDENTITY).unwrap();
        assert_eq!(out.dimensions(), (59, 39));
        assert_eq!(*out.get_pixel(50, 20), Rgb([0, 0, 255]));
        assert!(out.get_pixel(10, 20).0[0] >= 198);
    }
}
