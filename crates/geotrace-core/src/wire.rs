//! Wire format of the HTTP contour/transform service.
//!
//! Requests are `multipart/form-data` posts: the image (if any) travels
//! as a file part named `image`, everything else as text fields built by
//! the `*_fields` functions here. Responses are JSON; raster previews
//! arrive as base64 JPEG strings.
//!
//! Kept in the core crate so the encoding can be tested natively; the
//! actual transport lives in `geotrace-io`.

use serde::Deserialize;

use crate::service::{MaskRequest, ServiceError, TransformRequest};
use crate::types::{Contour, ContourSet, ExtractionParams, Point, Swatch};

/// Path of the color clustering endpoint.
pub const COLOURS_PATH: &str = "/get_colours";
/// Path of the mask extraction endpoint.
pub const CONTOUR_IMAGE_PATH: &str = "/get_contour_image";
/// Path of the vectorization endpoint.
pub const CONTOURS_PATH: &str = "/get_contours";
/// Path of the correspondence transform endpoint.
pub const TRANSFORM_PATH: &str = "/transform_contours";

/// Name of the file part carrying image bytes.
pub const IMAGE_FIELD: &str = "image";

/// A text form field.
pub type FormField = (&'static str, String);

/// Response of [`COLOURS_PATH`].
#[derive(Debug, Clone, Deserialize)]
pub struct ColoursResponse {
    /// Base64 JPEG of the contrast-adjusted image.
    pub image: String,
    pub colours: Vec<Swatch>,
}

/// Response of [`CONTOUR_IMAGE_PATH`].
#[derive(Debug, Clone, Deserialize)]
pub struct ContourImageResponse {
    /// Base64 JPEG of the filled mask.
    pub image: String,
}

/// Response of [`CONTOURS_PATH`].
#[derive(Debug, Clone, Deserialize)]
pub struct ContoursResponse {
    pub contours: Vec<Vec<[f64; 2]>>,
}

/// Response of [`TRANSFORM_PATH`].
#[derive(Debug, Clone, Deserialize)]
pub struct TransformResponse {
    pub trans_contours: Vec<Vec<[f64; 2]>>,
}

/// Wrap a base64 JPEG payload as a data URL the browser can decode.
#[must_use]
pub fn jpeg_data_url(base64: &str) -> String {
    format!("data:image/jpeg;base64,{base64}")
}

/// Convert `[[x, y], …]` vertex lists into contours.
#[must_use]
pub fn contours_from_wire(raw: Vec<Vec<[f64; 2]>>) -> ContourSet {
    raw.into_iter()
        .map(|c| c.into_iter().map(|[x, y]| Point::new(x, y)).collect())
        .collect()
}

/// Convert contours into `[[x, y], …]` vertex lists.
#[must_use]
pub fn contours_to_wire(contours: &[Contour]) -> Vec<Vec<[f64; 2]>> {
    contours
        .iter()
        .map(|c| c.points().iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Text fields shared by clustering and mask extraction.
#[must_use]
pub fn cluster_fields(params: &ExtractionParams) -> Vec<FormField> {
    vec![
        ("contrast_alpha", params.contrast_alpha.to_string()),
        ("contrast_beta", params.contrast_beta.to_string()),
        ("n_clusters", params.n_clusters.to_string()),
    ]
}

/// Text fields of a mask extraction request.
///
/// # Errors
///
/// Returns [`ServiceError::Decode`] if a JSON field cannot be encoded.
pub fn mask_fields(request: &MaskRequest) -> Result<Vec<FormField>, ServiceError> {
    let params = &request.params;
    let mut fields = vec![
        ("selected_colours", serde_json::to_string(&request.selected)?),
        ("centroid_colours", serde_json::to_string(&request.centroids)?),
    ];
    fields.extend(cluster_fields(params));
    fields.extend([
        ("dilate_iterations", params.dilate_iterations.to_string()),
        ("erode_iterations", params.erode_iterations.to_string()),
        ("min_contour_area", params.min_contour_area.to_string()),
        ("erased_rectangles", serde_json::to_string(&request.erasures)?),
    ]);
    Ok(fields)
}

/// Text fields of a transform request.
///
/// Point pairs are encoded as `[[{x, y}, {x, y}], …]` (image point
/// first) and contours as `[[[x, y], …], …]`.
///
/// # Errors
///
/// Returns [`ServiceError::Decode`] if a JSON field cannot be encoded.
pub fn transform_fields(request: &TransformRequest) -> Result<Vec<FormField>, ServiceError> {
    let pairs: Vec<[Point; 2]> = request
        .correspondences
        .pairs()
        .iter()
        .map(|p| [p.image_point, p.map_point])
        .collect();
    Ok(vec![
        ("point_pairs", serde_json::to_string(&pairs)?),
        (
            "contours",
            serde_json::to_string(&contours_to_wire(&request.contours))?,
        ),
    ])
}
