use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::models::{Contour, Point2D};

/// Find the outer boundaries of every connected region in a binary edge map.
///
/// Holes and boundaries nested inside another region are dropped, so a
/// document outline is reported once even when its interior has edges too.
pub fn find_external_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .iter()
                    .map(|p| Point2D::new(p.x as f64, p.y as f64))
                    .collect(),
            )
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Simplify a closed curve with the Douglas-Peucker algorithm.
///
/// The curve is split at its two mutually farthest points, each half is
/// simplified as an open polyline, and the halves are joined again. No point
/// of the input lies further than `epsilon` from the returned polygon.
pub fn approximate_polygon(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let n = points.len();
    if n <= 3 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if points[a] == points[b] {
        return vec![points[a]];
    }
    let (start, end) = if a < b { (a, b) } else { (b, a) };

    // Two open chains from start to end, going either way around the curve.
    let forward: Vec<Point2D> = points[start..=end].to_vec();
    let backward: Vec<Point2D> = points[end..]
        .iter()
        .chain(points[..=start].iter())
        .copied()
        .collect();

    let mut polygon = simplify_open(&forward, epsilon);
    polygon.pop();
    let mut rest = simplify_open(&backward, epsilon);
    rest.pop();
    polygon.extend(rest);
    polygon
}

fn farthest_from(points: &[Point2D], origin: Point2D) -> usize {
    let mut best = 0;
    let mut best_distance = -1.0;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(&origin);
        if d > best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

/// Douglas-Peucker on an open polyline. Keeps both end points.
fn simplify_open(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    let last = points.len() - 1;
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let mut split = first;
        let mut max_distance = 0.0;
        for i in first + 1..last {
            let d = distance_to_line(points[i], points[first], points[last]);
            if d > max_distance {
                max_distance = d;
                split = i;
            }
        }
        if max_distance > epsilon {
            keep[split] = true;
            stack.push((first, split));
            stack.push((split, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Distance from `p` to the line through `a` and `b`.
fn distance_to_line(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    let length = a.distance(&b);
    if length == 0.0 {
        return p.distance(&a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / length
}
