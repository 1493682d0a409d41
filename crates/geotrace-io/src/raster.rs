//! Raster encoding and decoding at the browser boundary.
//!
//! Canvas contents go to the contour service as PNG; raster answers
//! from the service arrive as base64 JPEG and are decoded by letting
//! the browser fetch them as data URLs.

use geotrace_core::RgbaImage;
use image::ImageEncoder;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::BlobPropertyBag;

/// Errors that can occur while moving rasters in and out of the browser.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    /// The bytes could not be decoded as an image.
    #[error("image decoding failed: {0}")]
    Decode(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Encode an RGBA raster as PNG bytes.
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RasterError> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| RasterError::PngEncode(e.to_string()))?;
    Ok(png_bytes)
}

/// Wrap bytes in a `Blob` of the given MIME type.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob creation fails.
pub fn bytes_to_blob(bytes: &[u8], mime_type: &str) -> Result<web_sys::Blob, RasterError> {
    let uint8_array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::new();
    parts.push(&uint8_array);

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type);
    Ok(web_sys::Blob::new_with_u8_array_sequence_and_options(
        &parts, &opts,
    )?)
}

/// Fetch the bytes behind a URL (typically a `data:` URL).
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if the fetch fails.
#[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, RasterError> {
    let window =
        web_sys::window().ok_or_else(|| RasterError::JsError("no global window".into()))?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()
        .map_err(|e| RasterError::JsError(format!("not a Response: {e:?}")))?;
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Decode a base64 image payload from the contour service into RGBA.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if the data URL cannot be read and
/// [`RasterError::Decode`] if the bytes are not an image.
#[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
pub async fn decode_base64_jpeg(base64: &str) -> Result<RgbaImage, RasterError> {
    let bytes = fetch_bytes(&geotrace_core::wire::jpeg_data_url(base64)).await?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| RasterError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn png_round_trips_pixels() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([255, 0, 0, 255]));
        let bytes = encode_png(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(2, 1), &Rgba([255, 0, 0, 255]));
    }
}
