//! GeoJSON export of geo-referenced contours.
//!
//! Each contour becomes one `Polygon` feature with a single exterior
//! ring. Rings are closed (first vertex repeated at the end) and
//! vertices are written `[longitude, latitude]` as RFC 7946 requires.
//! Features carry empty `properties`.
//!
//! Pure functions with no I/O; output is returned as a `String`.

use geo::{LineString, Polygon};
use geotrace_core::GeoContour;
use serde::Serialize;

/// Name of the downloaded file.
pub const FILENAME: &str = "geocoded_contours.geojson";

/// Media type of the downloaded file.
pub const MIME_TYPE: &str = "application/geo+json";

/// Errors from GeoJSON export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// There is nothing to export yet.
    #[error("Please select 3 point correspondences to extract geocoded contour.")]
    NoGeoContours,

    /// Serialization failed.
    #[error("failed to serialize GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file ready to hand to the browser (or write to disk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub mime_type: String,
    pub contents: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename = "Feature")]
struct Feature {
    geometry: Geometry,
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

/// Closed exterior ring of `contour` in `[lng, lat]` order.
fn exterior_ring(contour: &GeoContour) -> Vec<[f64; 2]> {
    let ring: LineString<f64> = contour
        .vertices()
        .iter()
        .map(|v| (v.lng, v.lat))
        .collect::<Vec<_>>()
        .into();
    // `Polygon::new` closes the exterior ring.
    Polygon::new(ring, Vec::new())
        .exterior()
        .coords()
        .map(|c| [c.x, c.y])
        .collect()
}

fn feature(contour: &GeoContour) -> Feature {
    Feature {
        geometry: Geometry::Polygon {
            coordinates: vec![exterior_ring(contour)],
        },
        properties: serde_json::Map::new(),
    }
}

/// Serialize geo-referenced contours into a GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns [`ExportError::NoGeoContours`] if `geo_contours` is empty;
/// the message is suitable for showing to the user.
pub fn to_geojson(geo_contours: &[GeoContour]) -> Result<String, ExportError> {
    if geo_contours.is_empty() {
        return Err(ExportError::NoGeoContours);
    }
    let collection = FeatureCollection {
        features: geo_contours.iter().map(feature).collect(),
    };
    Ok(serde_json::to_string(&collection)?)
}

/// [`to_geojson`] packaged as a downloadable file.
///
/// # Errors
///
/// As [`to_geojson`].
pub fn prepare_download(geo_contours: &[GeoContour]) -> Result<ExportedFile, ExportError> {
    let contents = to_geojson(geo_contours)?;
    log::debug!(
        "exporting {} polygon(s), {} bytes",
        geo_contours.len(),
        contents.len()
    );
    Ok(ExportedFile {
        filename: FILENAME.to_owned(),
        mime_type: MIME_TYPE.to_owned(),
        contents,
    })
}
