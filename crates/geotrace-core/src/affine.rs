//! Exact affine transform through three point correspondences.
//!
//! Three non-collinear pairs determine a 2D affine map uniquely. The
//! six coefficients are found by solving two 3×3 linear systems with
//! Cramer's rule, then applied with [`geo::AffineTransform`].
//!
//! [`LocalTransformService`] wraps this as an in-process
//! [`TransformService`] for offline use (CLI) and tests.

use geo::{AffineTransform, Coord};

use crate::service::{ServiceError, TransformRequest, TransformService};
use crate::types::{Contour, ContourSet, CorrespondenceSet, GeoTraceError, Point};

/// Determinants smaller than this (in squared pixels) are treated as
/// collinear input.
const DEGENERATE_EPSILON: f64 = 1e-9;

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0].mul_add(
        m[1][1].mul_add(m[2][2], -(m[1][2] * m[2][1])),
        (-m[0][1]).mul_add(
            m[1][0].mul_add(m[2][2], -(m[1][2] * m[2][0])),
            m[0][2] * m[1][0].mul_add(m[2][1], -(m[1][1] * m[2][0])),
        ),
    )
}

/// Solve `m · x = rhs` given `det(m)`, which the caller has checked.
fn cramer(m: [[f64; 3]; 3], det: f64, rhs: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (col, slot) in out.iter_mut().enumerate() {
        let mut replaced = m;
        for (row, value) in rhs.iter().enumerate() {
            replaced[row][col] = *value;
        }
        *slot = det3(replaced) / det;
    }
    out
}

/// Solve the affine map taking every image point to its map point.
///
/// # Errors
///
/// Returns [`GeoTraceError::DegenerateCorrespondences`] if the image
/// points are (nearly) collinear.
pub fn solve_affine(set: &CorrespondenceSet) -> Result<AffineTransform<f64>, GeoTraceError> {
    let pairs = set.pairs();
    let m = pairs.map(|p| [p.image_point.x, p.image_point.y, 1.0]);
    let det = det3(m);
    if det.abs() < DEGENERATE_EPSILON {
        return Err(GeoTraceError::DegenerateCorrespondences);
    }
    let [a, b, xoff] = cramer(m, det, pairs.map(|p| p.map_point.x));
    let [d, e, yoff] = cramer(m, det, pairs.map(|p| p.map_point.y));
    Ok(AffineTransform::new(a, b, xoff, d, e, yoff))
}

/// Apply `transform` to every vertex of every contour.
#[must_use]
pub fn apply_affine(transform: &AffineTransform<f64>, contours: &[Contour]) -> ContourSet {
    contours
        .iter()
        .map(|c| {
            c.map_points(|p| {
                let out = transform.apply(Coord { x: p.x, y: p.y });
                Point::new(out.x, out.y)
            })
        })
        .collect()
}

/// In-process [`TransformService`] using [`solve_affine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransformService;

impl TransformService for LocalTransformService {
    async fn solve(&self, request: &TransformRequest) -> Result<ContourSet, ServiceError> {
        let transform = solve_affine(&request.correspondences)
            .map_err(|e| ServiceError::Rejected(e.to_string()))?;
        Ok(apply_affine(&transform, &request.contours))
    }
}
