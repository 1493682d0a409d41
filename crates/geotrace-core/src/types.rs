//! Shared types for the geotrace editing and geo-referencing core.

use serde::{Deserialize, Serialize};

use crate::service::ServiceError;

/// Re-export `RgbaImage` so downstream crates can hand raster data to
/// the core without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point. Which space it lives in (screen, canvas pixels, map
/// container pixels) is determined by the API that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A floating-point extent, e.g. a canvas's intrinsic pixel size or an
/// element's CSS size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<Dimensions> for Size {
    fn from(d: Dimensions) -> Self {
        Self::new(f64::from(d.width), f64::from(d.height))
    }
}

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in screen (CSS pixel) space, as reported by
/// `getBoundingClientRect`, or relative to a container when produced by
/// [`crate::mapper::compute_letterbox_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Top-left corner.
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether `p` lies inside the rectangle. Edges count as inside.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }
}

/// A contour polygon in canvas pixel space.
///
/// The ring is implicitly closed: the last point connects back to the
/// first without being repeated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Apply `f` to every vertex, preserving order.
    #[must_use]
    pub fn map_points(&self, f: impl FnMut(Point) -> Point) -> Self {
        Self(self.0.iter().copied().map(f).collect())
    }
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An ordered set of contours. Order only matters for layer bookkeeping.
pub type ContourSet = Vec<Contour>;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A contour expressed in geographic coordinates. One per [`Contour`],
/// produced only by a successful geo-reference transform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoContour(Vec<LatLng>);

impl GeoContour {
    #[must_use]
    pub const fn new(vertices: Vec<LatLng>) -> Self {
        Self(vertices)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn vertices(&self) -> &[LatLng] {
        &self.0
    }
}

impl FromIterator<LatLng> for GeoContour {
    fn from_iter<I: IntoIterator<Item = LatLng>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A rectangle painted out of the mask, in canvas pixel space.
///
/// Always lies within `[0, width] × [0, height]` of the canvas it was
/// recorded against; see [`EraseRect::from_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl EraseRect {
    /// Build the rectangle spanned by two stroke corners, clamped to the
    /// canvas and rounded to whole pixels.
    ///
    /// The corners may be given in any order and may lie outside the
    /// canvas (a drag that leaves the element).
    #[must_use]
    pub fn from_corners(a: Point, b: Point, canvas: Dimensions) -> Self {
        let (x, width) = clamp_span(a.x, b.x, canvas.width);
        let (y, height) = clamp_span(a.y, b.y, canvas.height);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Clamp both ends of a 1D span to `[0, limit]`, round, and return the
/// `(start, length)` pair.
fn clamp_span(a: f64, b: f64, limit: u32) -> (u32, u32) {
    let limit_f = f64::from(limit);
    let clamp = |v: f64| {
        let v = if v.is_nan() { 0.0 } else { v };
        v.clamp(0.0, limit_f).round()
    };
    let start = clamp(a.min(b));
    let end = clamp(a.max(b));
    // Both values are whole numbers in [0, limit], so the casts are exact.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (start, end) = (start as u32, end as u32);
    (start, end - start)
}

/// One image-point/map-point correspondence, both in overlay-canvas
/// pixel space at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrespondencePair {
    pub image_point: Point,
    pub map_point: Point,
}

impl CorrespondencePair {
    #[must_use]
    pub const fn new(image_point: Point, map_point: Point) -> Self {
        Self {
            image_point,
            map_point,
        }
    }
}

/// Exactly three correspondences: the minimum that fixes an affine
/// transform. Partial sets are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceSet([CorrespondencePair; 3]);

impl CorrespondenceSet {
    #[must_use]
    pub const fn new(pairs: [CorrespondencePair; 3]) -> Self {
        Self(pairs)
    }

    #[must_use]
    pub const fn pairs(&self) -> &[CorrespondencePair; 3] {
        &self.0
    }
}

/// A cluster centroid color as reported by the clustering service.
///
/// Channels are kept in the service's order (blue, green, red) so the
/// value can be echoed back verbatim when requesting a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Swatch(pub [u8; 3]);

impl Swatch {
    /// CSS color string for display, e.g. `rgb(255, 0, 0)`.
    #[must_use]
    pub fn css(&self) -> String {
        let [b, g, r] = self.0;
        format!("rgb({r}, {g}, {b})")
    }
}

/// Clustering and mask extraction parameters, as set by the user's
/// sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    /// Contrast gain applied before clustering.
    pub contrast_alpha: f64,
    /// Brightness offset applied before clustering.
    pub contrast_beta: f64,
    /// Number of color clusters to compute.
    pub n_clusters: u32,
    /// Dilation passes applied to the mask before contour detection.
    pub dilate_iterations: u32,
    /// Erosion passes applied after the contours are filled.
    pub erode_iterations: u32,
    /// Contours with a smaller area (px²) are dropped. 0 keeps all.
    pub min_contour_area: u32,
}

impl ExtractionParams {
    pub const DEFAULT_CONTRAST_ALPHA: f64 = 1.0;
    pub const DEFAULT_CONTRAST_BETA: f64 = 0.0;
    pub const DEFAULT_N_CLUSTERS: u32 = 8;
    pub const DEFAULT_DILATE_ITERATIONS: u32 = 0;
    pub const DEFAULT_ERODE_ITERATIONS: u32 = 0;
    pub const DEFAULT_MIN_CONTOUR_AREA: u32 = 0;

    /// Whether `other` differs in a parameter that affects clustering
    /// (and therefore invalidates the swatch list).
    #[must_use]
    pub fn clustering_differs(&self, other: &Self) -> bool {
        self.contrast_alpha.to_bits() != other.contrast_alpha.to_bits()
            || self.contrast_beta.to_bits() != other.contrast_beta.to_bits()
            || self.n_clusters != other.n_clusters
    }
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            contrast_alpha: Self::DEFAULT_CONTRAST_ALPHA,
            contrast_beta: Self::DEFAULT_CONTRAST_BETA,
            n_clusters: Self::DEFAULT_N_CLUSTERS,
            dilate_iterations: Self::DEFAULT_DILATE_ITERATIONS,
            erode_iterations: Self::DEFAULT_ERODE_ITERATIONS,
            min_contour_area: Self::DEFAULT_MIN_CONTOUR_AREA,
        }
    }
}

/// Broad classification of a [`GeoTraceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A user gesture arrived before its prerequisite state existed.
    /// Nothing changed; show the message and let the user continue.
    Precondition,
    /// A collaborator (network service, decoder) failed. Local state is
    /// the last known good one; the triggering action can be retried.
    External,
    /// The response belonged to a request that has since been replaced.
    /// Callers drop it silently.
    Stale,
}

/// Errors surfaced by the editing and geo-referencing core.
///
/// Precondition messages are written for display to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum GeoTraceError {
    /// No image has been loaded yet.
    #[error("Please upload an image first.")]
    NoImage,

    /// The tool needs an extracted mask and there is none.
    #[error("No contours extracted. Please select colors to extract contours.")]
    NoMask,

    /// Geo-referencing was requested with no vectorized contours.
    #[error("Please extract contours first.")]
    NoContours,

    /// The uploaded image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// An image (upload or service preview) could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A remote collaborator failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The three correspondence points do not span a triangle.
    #[error("correspondence points are collinear; no unique transform exists")]
    DegenerateCorrespondences,

    /// The map placed a projected vertex at a non-finite coordinate.
    #[error("map projection produced a non-finite coordinate")]
    NonFiniteProjection,

    /// A newer request was issued before this response arrived.
    #[error("response superseded by a newer request")]
    Superseded,
}

impl GeoTraceError {
    /// Classify the error for the caller's reporting policy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoImage | Self::NoMask | Self::NoContours | Self::EmptyInput => {
                ErrorKind::Precondition
            }
            Self::ImageDecode(_)
            | Self::Service(_)
            | Self::DegenerateCorrespondences
            | Self::NonFiniteProjection => ErrorKind::External,
            Self::Superseded => ErrorKind::Stale,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CANVAS: Dimensions = Dimensions::new(800, 600);

    #[test]
    fn screen_rect_contains_edges() {
        let r = ScreenRect::new(10.0, 20.0, 100.0, 50.0);
        assert!(r.contains(Point::new(10.0, 20.0)));
        assert!(r.contains(Point::new(110.0, 70.0)));
        assert!(!r.contains(Point::new(110.1, 70.0)));
        assert!(!r.contains(Point::new(9.9, 30.0)));
    }

    #[test]
    fn erase_rect_from_ordered_corners() {
        let r = EraseRect::from_corners(Point::new(100.0, 100.0), Point::new(300.0, 200.0), CANVAS);
        assert_eq!(
            r,
            EraseRect {
                x: 100,
                y: 100,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn erase_rect_normalizes_reversed_drag() {
        let r = EraseRect::from_corners(Point::new(300.0, 200.0), Point::new(100.0, 100.0), CANVAS);
        assert_eq!((r.x, r.y, r.width, r.height), (100, 100, 200, 100));
    }

    #[test]
    fn erase_rect_clamps_to_canvas() {
        let r = EraseRect::from_corners(Point::new(-50.0, 550.0), Point::new(900.0, 700.0), CANVAS);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 550, 800, 50));
    }

    #[test]
    fn erase_rect_entirely_outside_is_empty_not_negative() {
        let r = EraseRect::from_corners(Point::new(900.0, 10.0), Point::new(950.0, 20.0), CANVAS);
        assert_eq!(r.x, 800);
        assert_eq!(r.width, 0);
        assert!(r.is_empty());
    }

    #[test]
    fn erase_rect_rounds_fractional_pixels() {
        let r = EraseRect::from_corners(Point::new(10.4, 10.6), Point::new(20.5, 30.2), CANVAS);
        assert_eq!((r.x, r.y, r.width, r.height), (10, 11, 11, 19));
    }

    #[test]
    fn swatch_css_swaps_channel_order() {
        assert_eq!(Swatch([10, 20, 30]).css(), "rgb(30, 20, 10)");
    }

    #[test]
    fn extraction_params_defaults() {
        let p = ExtractionParams::default();
        assert!((p.contrast_alpha - 1.0).abs() < f64::EPSILON);
        assert!(p.contrast_beta.abs() < f64::EPSILON);
        assert_eq!(p.n_clusters, 8);
        assert_eq!(p.dilate_iterations, 0);
        assert_eq!(p.erode_iterations, 0);
        assert_eq!(p.min_contour_area, 0);
    }

    #[test]
    fn clustering_differs_ignores_morphology() {
        let a = ExtractionParams::default();
        let b = ExtractionParams {
            dilate_iterations: 3,
            min_contour_area: 50,
            ..a
        };
        assert!(!a.clustering_differs(&b));
        let c = ExtractionParams { n_clusters: 4, ..a };
        assert!(a.clustering_differs(&c));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(GeoTraceError::NoMask.kind(), ErrorKind::Precondition);
        assert_eq!(GeoTraceError::NoImage.kind(), ErrorKind::Precondition);
        assert_eq!(GeoTraceError::Superseded.kind(), ErrorKind::Stale);
        assert_eq!(
            GeoTraceError::Service(ServiceError::Status(500)).kind(),
            ErrorKind::External
        );
    }

    #[test]
    fn no_mask_message_is_user_facing() {
        assert_eq!(
            GeoTraceError::NoMask.to_string(),
            "No contours extracted. Please select colors to extract contours."
        );
    }

    #[test]
    fn erase_rect_serializes_with_named_fields() {
        let r = EraseRect {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"width":3,"height":4}"#);
    }
}
