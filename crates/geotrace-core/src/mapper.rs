//! Coordinate mapping between screen space, canvas pixel space, and the
//! letterboxed region an image occupies inside its container.
//!
//! Everything here is a pure function. Three spaces are involved:
//!
//! - **screen**: CSS pixels as reported by pointer events and
//!   `getBoundingClientRect`;
//! - **canvas pixels**: a canvas's intrinsic grid (`canvas.width` ×
//!   `canvas.height`), which CSS may stretch non-uniformly;
//! - **displayed image**: the sub-rectangle an `object-fit: contain`
//!   image actually covers inside its container.

use crate::types::{Contour, Point, ScreenRect, Size};

/// Ratio of `to` over `from` along one axis.
///
/// A zero-sized (collapsed) source axis maps with scale 1 instead of
/// producing infinities.
fn axis_scale(to: f64, from: f64) -> f64 {
    if from > 0.0 { to / from } else { 1.0 }
}

/// Map a pointer position (screen space) into a canvas's intrinsic pixel
/// grid.
///
/// `bounds` is the canvas element's on-screen rectangle and `intrinsic`
/// its backing-store size. Each axis is scaled independently, so
/// non-uniform CSS scaling is handled.
#[must_use]
pub fn pointer_to_canvas_pixel(pointer: Point, bounds: ScreenRect, intrinsic: Size) -> Point {
    Point::new(
        (pointer.x - bounds.left) * axis_scale(intrinsic.width, bounds.width),
        (pointer.y - bounds.top) * axis_scale(intrinsic.height, bounds.height),
    )
}

/// Inverse of [`pointer_to_canvas_pixel`]: canvas pixel → screen.
#[must_use]
pub fn canvas_pixel_to_screen(point: Point, bounds: ScreenRect, intrinsic: Size) -> Point {
    Point::new(
        point.x * axis_scale(bounds.width, intrinsic.width) + bounds.left,
        point.y * axis_scale(bounds.height, intrinsic.height) + bounds.top,
    )
}

/// A canvas element's on-screen rectangle together with its intrinsic
/// pixel size, read fresh whenever a mapping is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub bounds: ScreenRect,
    pub intrinsic: Size,
}

impl CanvasGeometry {
    #[must_use]
    pub const fn new(bounds: ScreenRect, intrinsic: Size) -> Self {
        Self { bounds, intrinsic }
    }

    /// [`pointer_to_canvas_pixel`] for this canvas.
    #[must_use]
    pub fn pixel_at(&self, pointer: Point) -> Point {
        pointer_to_canvas_pixel(pointer, self.bounds, self.intrinsic)
    }

    /// [`canvas_pixel_to_screen`] for this canvas.
    #[must_use]
    pub fn screen_at(&self, point: Point) -> Point {
        canvas_pixel_to_screen(point, self.bounds, self.intrinsic)
    }
}

/// Contain-fit an `intrinsic_width × intrinsic_height` image into a
/// `container_width × container_height` box.
///
/// Returns the displayed size and its offset **relative to the
/// container**. Exactly one axis is letterboxed: a relatively wider
/// image fills the width and is centred vertically, otherwise the image
/// fills the height and is centred horizontally. Matching aspect ratios
/// return the container itself with zero offsets.
///
/// Aspect ratios are compared by cross-multiplication and the scaled
/// axis is computed as `a * b / c` so equal ratios do not drift through
/// rounding of an intermediate quotient.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn compute_letterbox_rect(
    intrinsic_width: f64,
    intrinsic_height: f64,
    container_width: f64,
    container_height: f64,
) -> ScreenRect {
    if intrinsic_width <= 0.0 || intrinsic_height <= 0.0 {
        return ScreenRect::new(0.0, 0.0, container_width, container_height);
    }

    let image_span = intrinsic_width * container_height;
    let container_span = container_width * intrinsic_height;

    if image_span == container_span {
        ScreenRect::new(0.0, 0.0, container_width, container_height)
    } else if image_span > container_span {
        let height = container_width * intrinsic_height / intrinsic_width;
        ScreenRect::new(
            0.0,
            (container_height - height) / 2.0,
            container_width,
            height,
        )
    } else {
        let width = container_height * intrinsic_width / intrinsic_height;
        ScreenRect::new(
            (container_width - width) / 2.0,
            0.0,
            width,
            container_height,
        )
    }
}

/// The screen rectangle an image of size `intrinsic` covers when
/// contain-fitted into `container`.
#[must_use]
pub fn displayed_image_rect(intrinsic: Size, container: ScreenRect) -> ScreenRect {
    let fit = compute_letterbox_rect(
        intrinsic.width,
        intrinsic.height,
        container.width,
        container.height,
    );
    ScreenRect::new(
        container.left + fit.left,
        container.top + fit.top,
        fit.width,
        fit.height,
    )
}

/// Rescale a point computed against a raster of size `source` into the
/// on-screen rectangle of a different displayed image.
#[must_use]
pub fn canvas_pixel_to_displayed_image_region(
    point: Point,
    source: Size,
    displayed: ScreenRect,
) -> Point {
    Point::new(
        point.x * axis_scale(displayed.width, source.width) + displayed.left,
        point.y * axis_scale(displayed.height, source.height) + displayed.top,
    )
}

/// [`canvas_pixel_to_displayed_image_region`] applied to every vertex of
/// every contour.
#[must_use]
pub fn rescale_contours(contours: &[Contour], source: Size, displayed: ScreenRect) -> Vec<Contour> {
    contours
        .iter()
        .map(|c| c.map_points(|p| canvas_pixel_to_displayed_image_region(p, source, displayed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "expected ({}, {}), got ({}, {})",
            b.x,
            b.y,
            a.x,
            a.y,
        );
    }

    #[test]
    fn pointer_mapping_handles_non_uniform_css_scale() {
        // 800x600 canvas stretched to 400x150 on screen at (10, 20).
        let bounds = ScreenRect::new(10.0, 20.0, 400.0, 150.0);
        let intrinsic = Size::new(800.0, 600.0);
        let p = pointer_to_canvas_pixel(Point::new(110.0, 95.0), bounds, intrinsic);
        assert_close(p, Point::new(200.0, 300.0));
    }

    #[test]
    fn pointer_mapping_round_trips() {
        let bounds = ScreenRect::new(-5.0, 33.0, 321.0, 123.0);
        let intrinsic = Size::new(640.0, 480.0);
        let screen = Point::new(100.0, 77.0);
        let canvas = pointer_to_canvas_pixel(screen, bounds, intrinsic);
        assert_close(canvas_pixel_to_screen(canvas, bounds, intrinsic), screen);
    }

    #[test]
    fn pointer_mapping_collapsed_bounds_does_not_blow_up() {
        let bounds = ScreenRect::new(0.0, 0.0, 0.0, 0.0);
        let p = pointer_to_canvas_pixel(Point::new(3.0, 4.0), bounds, Size::new(100.0, 100.0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn canvas_geometry_wraps_both_directions() {
        let geometry = CanvasGeometry::new(
            ScreenRect::new(100.0, 50.0, 200.0, 100.0),
            Size::new(400.0, 400.0),
        );
        let canvas = geometry.pixel_at(Point::new(150.0, 75.0));
        assert_close(canvas, Point::new(100.0, 100.0));
        assert_close(geometry.screen_at(canvas), Point::new(150.0, 75.0));
    }

    #[test]
    fn letterbox_matching_aspect_fills_container() {
        let r = compute_letterbox_rect(800.0, 600.0, 400.0, 300.0);
        assert_eq!(r, ScreenRect::new(0.0, 0.0, 400.0, 300.0));

        // Ratios whose quotient is not exactly representable.
        let r = compute_letterbox_rect(300.0, 700.0, 30.0, 70.0);
        assert_eq!(r, ScreenRect::new(0.0, 0.0, 30.0, 70.0));
    }

    #[test]
    fn letterbox_wide_image_centres_vertically() {
        let r = compute_letterbox_rect(800.0, 400.0, 500.0, 500.0);
        assert_eq!(r, ScreenRect::new(0.0, 125.0, 500.0, 250.0));
    }

    #[test]
    fn letterbox_tall_image_centres_horizontally() {
        let r = compute_letterbox_rect(300.0, 600.0, 500.0, 500.0);
        assert_eq!(r, ScreenRect::new(125.0, 0.0, 250.0, 500.0));
    }

    #[test]
    fn letterbox_is_idempotent() {
        let a = compute_letterbox_rect(1234.0, 567.0, 890.0, 890.0);
        let b = compute_letterbox_rect(1234.0, 567.0, 890.0, 890.0);
        assert_eq!(a, b);
    }

    #[test]
    fn displayed_rect_is_offset_by_container_origin() {
        let container = ScreenRect::new(50.0, 60.0, 500.0, 500.0);
        let r = displayed_image_rect(Size::new(800.0, 400.0), container);
        assert_eq!(r, ScreenRect::new(50.0, 185.0, 500.0, 250.0));
    }

    #[test]
    fn canvas_point_lands_in_displayed_region() {
        let displayed = ScreenRect::new(50.0, 185.0, 500.0, 250.0);
        let source = Size::new(800.0, 400.0);
        assert_close(
            canvas_pixel_to_displayed_image_region(Point::new(0.0, 0.0), source, displayed),
            Point::new(50.0, 185.0),
        );
        assert_close(
            canvas_pixel_to_displayed_image_region(Point::new(800.0, 400.0), source, displayed),
            Point::new(550.0, 435.0),
        );
        assert_close(
            canvas_pixel_to_displayed_image_region(Point::new(400.0, 200.0), source, displayed),
            Point::new(300.0, 310.0),
        );
    }

    #[test]
    fn rescale_contours_preserves_shape_and_order() {
        let contours = vec![
            Contour::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]),
            Contour::new(vec![Point::new(5.0, 5.0)]),
        ];
        let out = rescale_contours(
            &contours,
            Size::new(10.0, 10.0),
            ScreenRect::new(100.0, 100.0, 20.0, 20.0),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].points(),
            &[Point::new(100.0, 100.0), Point::new(120.0, 100.0)]
        );
        assert_eq!(out[1].points(), &[Point::new(110.0, 110.0)]);
    }
}
