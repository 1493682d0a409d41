//! Interactive erase session over the extracted contour mask.
//!
//! The session owns the canvas contents as a chain of [`PixelBuffer`]
//! snapshots plus the log of every rectangle erased since the mask was
//! last regenerated from scratch.
//!
//! # Strokes
//!
//! An erase gesture is a press/drag/release sequence:
//!
//! 1. [`begin_stroke`](RasterEditSession::begin_stroke) captures the
//!    current baseline as the stroke's restore point. Presses only start
//!    a stroke while the eraser tool is engaged.
//! 2. [`preview_stroke`](RasterEditSession::preview_stroke) rebuilds a
//!    preview frame from the restore point with the rectangle outlined.
//!    The baseline is never touched.
//! 3. [`commit_stroke`](RasterEditSession::commit_stroke) clamps the
//!    rectangle to the canvas, logs it, paints it out on a copy of the
//!    restore point and installs that copy as the next baseline.
//!
//! # Undo
//!
//! Erasing paints pixels out, so it cannot be reversed locally. The only
//! undo target is "no erasures": [`undo_all`](RasterEditSession::undo_all)
//! empties the log and the caller regenerates the mask from the
//! contour service with that empty log (see
//! [`crate::editor::ContourEditor::undo_all`]).

use image::Rgba;
use image::imageops::FilterType;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::buffer::PixelBuffer;
use crate::types::{Dimensions, EraseRect, GeoTraceError, Point, RgbaImage};

/// Paint used for erased regions.
pub const ERASE_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Outline color of the live stroke preview.
pub const PREVIEW_OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Outline thickness of the live stroke preview, in canvas pixels.
pub const PREVIEW_OUTLINE_WIDTH: u32 = 2;

#[derive(Debug, Clone)]
struct Stroke {
    origin: Point,
    restore: PixelBuffer,
}

/// Canvas state for one loaded image.
#[derive(Debug, Default)]
pub struct RasterEditSession {
    dimensions: Option<Dimensions>,
    baseline: Option<PixelBuffer>,
    erasures: Vec<EraseRect>,
    stroke: Option<Stroke>,
    preview: Option<RgbaImage>,
    eraser: bool,
    next_version: u64,
}

impl RasterEditSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over for a newly loaded image with the given canvas size.
    ///
    /// Discards the baseline, the erasure log and any stroke: rectangles
    /// recorded against one image mean nothing for another.
    pub fn open(&mut self, dimensions: Dimensions) {
        log::debug!(
            "opening canvas {}x{}",
            dimensions.width,
            dimensions.height
        );
        self.dimensions = Some(dimensions);
        self.baseline = None;
        self.erasures.clear();
        self.stroke = None;
        self.preview = None;
        self.eraser = false;
    }

    /// Install a freshly extracted mask as the new baseline.
    ///
    /// The mask is resized to the canvas if the service returned a
    /// different size. The erasure log is kept: the service applied it
    /// when producing this mask.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoImage`] if no canvas has been opened.
    pub fn load_mask(&mut self, mask: RgbaImage) -> Result<&PixelBuffer, GeoTraceError> {
        let dims = self.dimensions.ok_or(GeoTraceError::NoImage)?;
        let mask = if mask.dimensions() == (dims.width, dims.height) {
            mask
        } else {
            image::imageops::resize(&mask, dims.width, dims.height, FilterType::Nearest)
        };
        self.stroke = None;
        self.preview = None;
        Ok(self.install(mask))
    }

    /// Forget the mask, e.g. because no colors are selected any more.
    pub fn clear(&mut self) {
        self.baseline = None;
        self.stroke = None;
        self.preview = None;
        self.eraser = false;
    }

    /// Engage or disengage the eraser tool. Returns the new state.
    ///
    /// Disengaging abandons a stroke in progress.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoMask`] if there is nothing to erase.
    pub fn toggle_eraser(&mut self) -> Result<bool, GeoTraceError> {
        if self.baseline.is_none() {
            log::warn!("eraser engaged without an extracted mask");
            return Err(GeoTraceError::NoMask);
        }
        self.eraser = !self.eraser;
        if !self.eraser {
            self.stroke = None;
            self.preview = None;
        }
        Ok(self.eraser)
    }

    /// Whether the eraser tool is engaged.
    #[must_use]
    pub const fn eraser_engaged(&self) -> bool {
        self.eraser
    }

    /// Start an erase stroke at `origin` (canvas pixels). Returns whether
    /// a stroke started: presses are ignored while the eraser is
    /// disengaged.
    ///
    /// Starting again mid-stroke moves the origin but keeps the original
    /// restore point, so the abandoned preview is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoMask`] if no baseline exists yet.
    pub fn begin_stroke(&mut self, origin: Point) -> Result<bool, GeoTraceError> {
        let Some(baseline) = &self.baseline else {
            log::warn!("erase stroke started without an extracted mask");
            return Err(GeoTraceError::NoMask);
        };
        if !self.eraser {
            log::debug!("press ignored: eraser not engaged");
            return Ok(false);
        }
        let restore = self
            .stroke
            .take()
            .map_or_else(|| baseline.clone(), |s| s.restore);
        self.stroke = Some(Stroke { origin, restore });
        self.preview = None;
        Ok(true)
    }

    /// Show the rectangle from the stroke origin to `current` without
    /// committing it. Does nothing outside a stroke.
    pub fn preview_stroke(&mut self, current: Point) {
        let Some(stroke) = &self.stroke else {
            return;
        };
        let mut frame = stroke.restore.to_image();
        draw_outline(&mut frame, stroke.origin, current);
        self.preview = Some(frame);
    }

    /// Finish the stroke at `end`, painting the clamped rectangle out.
    ///
    /// Pointer release and pointer leaving the canvas both commit.
    /// Returns the logged rectangle, or `None` outside a stroke.
    pub fn commit_stroke(&mut self, end: Point) -> Option<EraseRect> {
        let stroke = self.stroke.take()?;
        self.preview = None;

        let canvas = stroke.restore.dimensions();
        let rect = EraseRect::from_corners(stroke.origin, end, canvas);
        self.erasures.push(rect);

        let mut next = stroke.restore.to_image();
        fill_rect(&mut next, rect);
        let version = self.install(next).version();
        log::debug!(
            "erased {}x{} at ({}, {}); baseline v{version}, {} erasures",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            self.erasures.len(),
        );
        Some(rect)
    }

    /// Empty the erasure log. Returns `false` (and changes nothing) when
    /// there is no mask.
    ///
    /// The canvas still shows the erased pixels afterwards; the caller
    /// must regenerate the mask from the service with the empty log.
    pub fn undo_all(&mut self) -> bool {
        if self.baseline.is_none() {
            return false;
        }
        log::debug!("undoing {} erasures", self.erasures.len());
        self.erasures.clear();
        self.stroke = None;
        self.preview = None;
        true
    }

    /// The committed canvas contents, if a mask is loaded.
    #[must_use]
    pub const fn baseline(&self) -> Option<&PixelBuffer> {
        self.baseline.as_ref()
    }

    /// What the canvas currently shows: the stroke preview if one is
    /// active, otherwise the baseline.
    #[must_use]
    pub fn visible(&self) -> Option<&RgbaImage> {
        self.preview
            .as_ref()
            .or_else(|| self.baseline.as_ref().map(PixelBuffer::image))
    }

    /// Every rectangle erased since the mask was last regenerated from
    /// scratch, in commit order.
    #[must_use]
    pub fn erasures(&self) -> &[EraseRect] {
        &self.erasures
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Canvas size of the open image.
    #[must_use]
    pub const fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    fn install(&mut self, image: RgbaImage) -> &PixelBuffer {
        self.next_version += 1;
        self.baseline.insert(PixelBuffer::new(image, self.next_version))
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Paint `rect` out with [`ERASE_FILL`].
fn fill_rect(image: &mut RgbaImage, rect: EraseRect) {
    if rect.is_empty() {
        return;
    }
    let r = Rect::at(to_i32(rect.x), to_i32(rect.y)).of_size(rect.width, rect.height);
    draw_filled_rect_mut(image, r, ERASE_FILL);
}

/// Pixel coordinate clamped to one pixel beyond either edge of an axis
/// `limit` pixels long. Edges drawn out there are clipped away.
#[expect(clippy::cast_possible_truncation)]
fn outline_coord(v: f64, limit: u32) -> i32 {
    v.round().clamp(-1.0, f64::from(limit) + 1.0) as i32
}

/// Outline the rectangle spanned by `a` and `b`, [`PREVIEW_OUTLINE_WIDTH`]
/// pixels thick, growing inwards. Parts outside the image are clipped.
fn draw_outline(image: &mut RgbaImage, a: Point, b: Point) {
    let (w, h) = image.dimensions();
    let left = outline_coord(a.x.min(b.x), w);
    let top = outline_coord(a.y.min(b.y), h);
    let right = outline_coord(a.x.max(b.x), w);
    let bottom = outline_coord(a.y.max(b.y), h);

    for inset in 0..PREVIEW_OUTLINE_WIDTH {
        let inset = to_i32(inset);
        let width = right - left - 2 * inset;
        let height = bottom - top - 2 * inset;
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            break;
        };
        if width == 0 || height == 0 {
            break;
        }
        let r = Rect::at(left + inset, top + inset).of_size(width, height);
        draw_hollow_rect_mut(image, r, PREVIEW_OUTLINE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MASK_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

    /// A session with a uniform mask and the eraser engaged.
    fn session_with_mask(width: u32, height: u32) -> RasterEditSession {
        let mut session = RasterEditSession::new();
        session.open(Dimensions::new(width, height));
        session
            .load_mask(RgbaImage::from_pixel(width, height, MASK_COLOR))
            .unwrap();
        session.toggle_eraser().unwrap();
        session
    }

    fn stroke(session: &mut RasterEditSession, from: (f64, f64), to: (f64, f64)) -> EraseRect {
        session.begin_stroke(Point::new(from.0, from.1)).unwrap();
        session.preview_stroke(Point::new(to.0, to.1));
        session.commit_stroke(Point::new(to.0, to.1)).unwrap()
    }

    #[test]
    fn begin_stroke_without_mask_is_a_precondition_failure() {
        let mut session = RasterEditSession::new();
        session.open(Dimensions::new(10, 10));
        let err = session.begin_stroke(Point::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, GeoTraceError::NoMask));
        assert!(!session.is_drawing());
        assert!(session.erasures().is_empty());
    }

    #[test]
    fn preview_and_commit_outside_a_stroke_are_silent() {
        let mut session = session_with_mask(10, 10);
        let before = session.baseline().unwrap().version();
        session.preview_stroke(Point::new(5.0, 5.0));
        assert!(session.commit_stroke(Point::new(5.0, 5.0)).is_none());
        assert_eq!(session.baseline().unwrap().version(), before);
        assert!(session.erasures().is_empty());
    }

    #[test]
    fn preview_leaves_baseline_untouched() {
        let mut session = session_with_mask(50, 50);
        session.begin_stroke(Point::new(10.0, 10.0)).unwrap();
        session.preview_stroke(Point::new(30.0, 30.0));

        let baseline = session.baseline().unwrap().image();
        assert_eq!(*baseline.get_pixel(10, 10), MASK_COLOR);

        let visible = session.visible().unwrap();
        assert_eq!(*visible.get_pixel(10, 10), PREVIEW_OUTLINE);
        assert_eq!(*visible.get_pixel(11, 20), PREVIEW_OUTLINE);
        assert_eq!(*visible.get_pixel(20, 20), MASK_COLOR);
        assert!(session.erasures().is_empty());
    }

    #[test]
    fn repeated_preview_restores_from_snapshot() {
        let mut session = session_with_mask(50, 50);
        session.begin_stroke(Point::new(10.0, 10.0)).unwrap();
        session.preview_stroke(Point::new(40.0, 40.0));
        session.preview_stroke(Point::new(20.0, 20.0));
        let visible = session.visible().unwrap();
        // The first, larger outline must not linger.
        assert_eq!(*visible.get_pixel(39, 25), MASK_COLOR);
        assert_eq!(*visible.get_pixel(10, 15), PREVIEW_OUTLINE);
    }

    #[test]
    fn commit_paints_rectangle_and_advances_baseline() {
        let mut session = session_with_mask(800, 600);
        let before = session.baseline().unwrap().clone();

        let rect = stroke(&mut session, (100.0, 100.0), (300.0, 200.0));
        assert_eq!(
            rect,
            EraseRect {
                x: 100,
                y: 100,
                width: 200,
                height: 100
            }
        );
        assert_eq!(session.erasures(), &[rect]);

        let after = session.baseline().unwrap();
        assert!(after.version() > before.version());
        assert!(!after.same_snapshot(&before));
        assert_eq!(*after.image().get_pixel(100, 100), ERASE_FILL);
        assert_eq!(*after.image().get_pixel(299, 199), ERASE_FILL);
        assert_eq!(*after.image().get_pixel(300, 200), MASK_COLOR);
        assert_eq!(*after.image().get_pixel(99, 150), MASK_COLOR);

        // The old snapshot is unchanged.
        assert_eq!(*before.image().get_pixel(150, 150), MASK_COLOR);
        assert!(!session.is_drawing());
        assert_eq!(session.visible().unwrap(), after.image());
    }

    #[test]
    fn erasure_log_counts_commits_and_stays_in_bounds() {
        let mut session = session_with_mask(64, 48);
        let strokes = [
            ((10.0, 10.0), (20.0, 20.0)),
            ((60.0, 40.0), (-30.0, -5.0)),
            ((70.0, 50.0), (90.0, 80.0)),
            ((32.0, 24.0), (32.0, 24.0)),
            ((-100.0, 10.0), (100.0, 11.0)),
        ];
        for (from, to) in strokes {
            stroke(&mut session, from, to);
        }
        assert_eq!(session.erasures().len(), strokes.len());
        for r in session.erasures() {
            assert!(r.x + r.width <= 64, "{r:?} exceeds width");
            assert!(r.y + r.height <= 48, "{r:?} exceeds height");
        }
    }

    #[test]
    fn undo_all_without_mask_is_a_no_op() {
        let mut session = RasterEditSession::new();
        assert!(!session.undo_all());
    }

    #[test]
    fn undo_all_empties_the_log() {
        let mut session = session_with_mask(800, 600);
        stroke(&mut session, (100.0, 100.0), (300.0, 200.0));
        stroke(&mut session, (0.0, 0.0), (5.0, 5.0));
        assert!(session.undo_all());
        assert!(session.erasures().is_empty());
        // Pixels stay erased until the mask is regenerated.
        assert_eq!(
            *session.baseline().unwrap().image().get_pixel(150, 150),
            ERASE_FILL
        );
    }

    #[test]
    fn eraser_toggle_requires_mask() {
        let mut session = RasterEditSession::new();
        session.open(Dimensions::new(10, 10));
        assert!(matches!(
            session.toggle_eraser(),
            Err(GeoTraceError::NoMask)
        ));

        let mut session = session_with_mask(10, 10);
        assert!(session.eraser_engaged());
        assert!(session.begin_stroke(Point::new(1.0, 1.0)).unwrap());
        assert!(!session.toggle_eraser().unwrap());
        assert!(!session.is_drawing());
        assert!(session.toggle_eraser().unwrap());
    }

    #[test]
    fn presses_are_ignored_while_eraser_is_disengaged() {
        let mut session = session_with_mask(10, 10);
        session.toggle_eraser().unwrap();
        assert!(!session.begin_stroke(Point::new(1.0, 1.0)).unwrap());
        assert!(!session.is_drawing());
        assert_eq!(session.commit_stroke(Point::new(5.0, 5.0)), None);
        assert!(session.erasures().is_empty());
    }

    #[test]
    fn preview_from_far_outside_the_canvas_is_clipped() {
        let mut session = session_with_mask(10, 10);
        session.begin_stroke(Point::new(-1e10, -1e10)).unwrap();
        session.preview_stroke(Point::new(5.0, 5.0));
        let frame = session.visible().unwrap();
        // Outer edge runs from -1 to 4; the inner one from 0 to 3.
        assert_eq!(*frame.get_pixel(4, 2), PREVIEW_OUTLINE);
        assert_eq!(*frame.get_pixel(8, 8), MASK_COLOR);

        session.preview_stroke(Point::new(1e10, f64::NAN));
        assert!(session.is_drawing());
        assert_eq!(
            *session.baseline().unwrap().image().get_pixel(4, 2),
            MASK_COLOR
        );
    }

    #[test]
    fn load_mask_resizes_to_canvas() {
        let mut session = RasterEditSession::new();
        session.open(Dimensions::new(20, 10));
        let buf = session
            .load_mask(RgbaImage::from_pixel(40, 20, MASK_COLOR))
            .unwrap();
        assert_eq!(buf.dimensions(), Dimensions::new(20, 10));
    }

    #[test]
    fn load_mask_before_open_fails() {
        let mut session = RasterEditSession::new();
        let result = session.load_mask(RgbaImage::new(1, 1));
        assert!(matches!(result, Err(GeoTraceError::NoImage)));
    }

    #[test]
    fn open_discards_previous_image_state() {
        let mut session = session_with_mask(30, 30);
        stroke(&mut session, (1.0, 1.0), (9.0, 9.0));
        session.open(Dimensions::new(40, 40));
        assert!(session.baseline().is_none());
        assert!(session.erasures().is_empty());
        assert_eq!(session.dimensions(), Some(Dimensions::new(40, 40)));
    }

    #[test]
    fn clear_drops_mask_but_keeps_log() {
        let mut session = session_with_mask(30, 30);
        stroke(&mut session, (1.0, 1.0), (9.0, 9.0));
        session.clear();
        assert!(session.baseline().is_none());
        assert!(session.visible().is_none());
        assert_eq!(session.erasures().len(), 1);
    }
}
