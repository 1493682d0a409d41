//! Reading canvas geometry and presenting rasters and correspondence
//! lines on `<canvas>` elements.

use geotrace_core::{CanvasGeometry, CorrespondencePair, Point, RgbaImage, ScreenRect, Size};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, ImageData};

/// Stroke color of correspondence lines.
pub const LINE_COLOR: &str = "red";
/// Stroke width of correspondence lines, in canvas pixels.
pub const LINE_WIDTH: f64 = 1.0;
/// Dash pattern of the rubber-band line.
pub const RUBBER_BAND_DASH: [f64; 2] = [5.0, 5.0];

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas has no 2d context")]
    NoContext,

    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for CanvasError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// An element's current on-screen rectangle.
#[must_use]
pub fn element_rect(element: &Element) -> ScreenRect {
    let rect = element.get_bounding_client_rect();
    ScreenRect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// On-screen rectangle plus backing-store size of a canvas.
#[must_use]
pub fn canvas_geometry(canvas: &HtmlCanvasElement) -> CanvasGeometry {
    CanvasGeometry::new(
        element_rect(canvas),
        Size::new(f64::from(canvas.width()), f64::from(canvas.height())),
    )
}

/// The canvas's 2d drawing context.
///
/// # Errors
///
/// Returns [`CanvasError::NoContext`] if the canvas has no 2d context.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, CanvasError> {
    canvas
        .get_context("2d")?
        .ok_or(CanvasError::NoContext)?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| CanvasError::NoContext)
}

/// Resize the canvas to the image and draw it at the origin.
///
/// # Errors
///
/// Returns [`CanvasError`] if the context or `ImageData` cannot be
/// created.
pub fn put_image(canvas: &HtmlCanvasElement, image: &RgbaImage) -> Result<(), CanvasError> {
    if canvas.width() != image.width() || canvas.height() != image.height() {
        canvas.set_width(image.width());
        canvas.set_height(image.height());
    }
    let data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(image.as_raw().as_slice()),
        image.width(),
        image.height(),
    )?;
    context_2d(canvas)?.put_image_data(&data, 0.0, 0.0)?;
    Ok(())
}

fn stroke_line(ctx: &CanvasRenderingContext2d, from: Point, to: Point) {
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    ctx.stroke();
}

/// Redraw the correspondence overlay: a solid line per recorded pair
/// and, while a map point is awaited, a dashed line to the cursor.
///
/// All points are in the overlay canvas's pixel space.
///
/// # Errors
///
/// Returns [`CanvasError`] if the context is unavailable.
pub fn draw_correspondences(
    canvas: &HtmlCanvasElement,
    recorded: &[CorrespondencePair],
    rubber_band: Option<(Point, Point)>,
) -> Result<(), CanvasError> {
    let ctx = context_2d(canvas)?;
    ctx.clear_rect(
        0.0,
        0.0,
        f64::from(canvas.width()),
        f64::from(canvas.height()),
    );
    ctx.set_stroke_style_str(LINE_COLOR);
    ctx.set_line_width(LINE_WIDTH);

    let solid = js_sys::Array::new();
    ctx.set_line_dash(&solid)?;
    for pair in recorded {
        stroke_line(&ctx, pair.image_point, pair.map_point);
    }

    if let Some((from, to)) = rubber_band {
        let dash: js_sys::Array = RUBBER_BAND_DASH.iter().copied().map(JsValue::from).collect();
        ctx.set_line_dash(&dash)?;
        stroke_line(&ctx, from, to);
        ctx.set_line_dash(&solid)?;
    }
    Ok(())
}
