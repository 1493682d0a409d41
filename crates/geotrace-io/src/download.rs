//! Saving the geo-referenced contours as a GeoJSON file.
//!
//! The export is serialized first, so "nothing to export" is reported
//! before the browser is touched. The file then goes through
//! [`raster::bytes_to_blob`](crate::raster::bytes_to_blob), gets an
//! object URL, and is saved through a detached `<a download>` link.

use geotrace_core::GeoContour;
use geotrace_export::{ExportError, ExportedFile};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlAnchorElement, Url};

use crate::raster::{self, RasterError};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Nothing to download; the message is meant for the user.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The file could not be turned into a `Blob`.
    #[error(transparent)]
    Blob(#[from] RasterError),

    /// No `window.document` (not running in a page).
    #[error("no document to download from")]
    NoDocument,

    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for DownloadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Export `geo_contours` as GeoJSON and offer the file for saving.
///
/// # Errors
///
/// [`DownloadError::Export`] when there is nothing to export; any other
/// variant when the browser refuses.
pub fn download_geojson(geo_contours: &[GeoContour]) -> Result<(), DownloadError> {
    let file = geotrace_export::prepare_download(geo_contours)
        .inspect_err(|e| log::warn!("download refused: {e}"))?;
    save_file(&file)
}

/// Offer an already serialized file for saving.
///
/// # Errors
///
/// Fails if there is no document or a browser call fails.
pub fn save_file(file: &ExportedFile) -> Result<(), DownloadError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or(DownloadError::NoDocument)?;
    let blob = raster::bytes_to_blob(file.contents.as_bytes(), &file.mime_type)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let saved = follow_link(&document, &url, &file.filename);
    if let Err(e) = Url::revoke_object_url(&url) {
        log::warn!("could not revoke {url}: {e:?}");
    }
    if saved.is_ok() {
        log::info!("saved {} ({} bytes)", file.filename, file.contents.len());
    }
    saved
}

/// Click a link to `href` that names the target `filename`.
fn follow_link(document: &Document, href: &str, filename: &str) -> Result<(), DownloadError> {
    let link = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|el| DownloadError::JsError(format!("<a> is not an anchor: {el:?}")))?;
    link.set_href(href);
    link.set_download(filename);
    link.click();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_export_is_refused_before_touching_the_browser() {
        let err = download_geojson(&[]);
        assert!(matches!(
            err,
            Err(DownloadError::Export(ExportError::NoGeoContours))
        ));
    }

    #[test]
    fn export_refusal_keeps_the_user_message() {
        let err = DownloadError::from(ExportError::NoGeoContours);
        assert_eq!(err.to_string(), ExportError::NoGeoContours.to_string());
    }
}
