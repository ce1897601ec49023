use crate::error::RectificationError;
use crate::models::Point2D;

/// Row-major 3x3 projective transform from a source plane to a destination plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix(pub [[f64; 3]; 3]);

impl TransformMatrix {
    pub const IDENTITY: TransformMatrix =
        TransformMatrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Map a point through the transform. `None` if it lands on the line at infinity.
    pub fn apply(&self, p: Point2D) -> Option<Point2D> {
        let m = &self.0;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2D::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        ))
    }

    /// The transform mapping destination points back onto the source. `None`
    /// if the matrix is singular.
    pub fn inverse(&self) -> Option<TransformMatrix> {
        let m = &self.0;
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        let det = m[0][0] * cofactor(1, 2, 1, 2) - m[0][1] * cofactor(1, 2, 0, 2)
            + m[0][2] * cofactor(1, 2, 0, 1);
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return None;
        }
        let adjugate = [
            [cofactor(1, 2, 1, 2), -cofactor(0, 2, 1, 2), cofactor(0, 1, 1, 2)],
            [-cofactor(1, 2, 0, 2), cofactor(0, 2, 0, 2), -cofactor(0, 1, 0, 2)],
            [cofactor(1, 2, 0, 1), -cofactor(0, 2, 0, 1), cofactor(0, 1, 0, 1)],
        ];
        Some(TransformMatrix(adjugate.map(|row| row.map(|v| v / det))))
    }
}

/// Solve for the homography taking each `src[i]` to `dst[i]`.
///
/// The bottom-right entry is fixed to 1, leaving the usual 8x8 linear system.
/// Fails when three points on either side are collinear or the system is
/// otherwise singular.
pub fn solve_homography(
    src: &[Point2D; 4],
    dst: &[Point2D; 4],
) -> Result<TransformMatrix, RectificationError> {
    if has_collinear_triple(src) {
        return Err(RectificationError::DegenerateGeometry(
            "three source corners are collinear".into(),
        ));
    }
    if has_collinear_triple(dst) {
        return Err(RectificationError::DegenerateGeometry(
            "three destination corners are collinear".into(),
        ));
    }

    let mut a = [[0.0f64; 9]; 8];
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        a[2 * i] = [s.x, s.y, 1.0, 0.0, 0.0, 0.0, -d.x * s.x, -d.x * s.y, d.x];
        a[2 * i + 1] = [0.0, 0.0, 0.0, s.x, s.y, 1.0, -d.y * s.x, -d.y * s.y, d.y];
    }

    let h = solve_augmented(a).ok_or_else(|| {
        RectificationError::DegenerateGeometry("homography system is singular".into())
    })?;

    Ok(TransformMatrix([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], 1.0],
    ]))
}

/// Gaussian elimination with partial pivoting on an 8x9 augmented matrix.
fn solve_augmented(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    const N: usize = 8;
    let scale = a
        .iter()
        .flat_map(|row| row[..N].iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    let tolerance = scale * 1e-12;

    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= tolerance {
            return None;
        }
        a.swap(col, pivot);

        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=N {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let mut x = [0.0f64; N];
    for row in (0..N).rev() {
        let tail: f64 = (row + 1..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (a[row][N] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

fn has_collinear_triple(points: &[Point2D; 4]) -> bool {
    let extent = points
        .iter()
        .flat_map(|p| points.iter().map(move |q| p.distance(q)))
        .fold(0.0f64, f64::max);
    if extent == 0.0 {
        return true;
    }
    let tolerance = extent * extent * 1e-9;

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (points[i], points[j], points[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() <= tolerance
    })
}
