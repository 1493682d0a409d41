//! fetch-based client for the contour and transform HTTP service.
//!
//! Every call is a `multipart/form-data` POST built from the text fields
//! in [`geotrace_core::wire`]; image bytes travel as the `image` file
//! part. Responses are JSON.

use geotrace_core::service::{
    ClusterRequest, ClusterResponse, ContourService, MaskRequest, MaskResponse, ServiceError,
    TransformRequest, TransformService,
};
use geotrace_core::wire::{self, FormField};
use geotrace_core::{ContourSet, PixelBuffer};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::raster::{self, RasterError};

/// Where the service lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Prefix for every path; empty means same origin.
    pub base_url: String,
    pub colours: String,
    pub contour_image: String,
    pub contours: String,
    pub transform: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            colours: wire::COLOURS_PATH.to_owned(),
            contour_image: wire::CONTOUR_IMAGE_PATH.to_owned(),
            contours: wire::CONTOURS_PATH.to_owned(),
            transform: wire::TRANSFORM_PATH.to_owned(),
        }
    }
}

impl Endpoints {
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

fn js_error(value: &JsValue) -> ServiceError {
    ServiceError::Transport(format!("{value:?}"))
}

impl From<RasterError> for ServiceError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::JsError(msg) => Self::Transport(msg),
            RasterError::PngEncode(msg) | RasterError::Decode(msg) => Self::Decode(msg),
        }
    }
}

/// An image attached to a form as the `image` file part.
struct ImagePart<'a> {
    bytes: &'a [u8],
    mime_type: &'a str,
    filename: &'a str,
}

fn build_form(
    image: Option<ImagePart<'_>>,
    fields: &[FormField],
) -> Result<web_sys::FormData, ServiceError> {
    let form = web_sys::FormData::new().map_err(|e| js_error(&e))?;
    if let Some(part) = image {
        let blob = raster::bytes_to_blob(part.bytes, part.mime_type)?;
        form.append_with_blob_and_filename(wire::IMAGE_FIELD, &blob, part.filename)
            .map_err(|e| js_error(&e))?;
    }
    for (name, value) in fields {
        form.append_with_str(name, value)
            .map_err(|e| js_error(&e))?;
    }
    Ok(form)
}

/// Sniff enough of the uploaded bytes to label the file part.
fn image_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map_or("application/octet-stream", |format| format.to_mime_type())
}

/// [`ContourService`] and [`TransformService`] over `window.fetch`.
#[derive(Debug, Clone, Default)]
pub struct HttpServices {
    endpoints: Endpoints,
}

impl HttpServices {
    #[must_use]
    pub const fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
    async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        form: &web_sys::FormData,
    ) -> Result<R, ServiceError> {
        let url = self.endpoints.url(path);
        log::debug!("http: POST {url}");

        let init = web_sys::RequestInit::new();
        init.set_method("POST");
        init.set_body(form);
        let request =
            web_sys::Request::new_with_str_and_init(&url, &init).map_err(|e| js_error(&e))?;

        let window =
            web_sys::window().ok_or_else(|| ServiceError::Transport("no global window".into()))?;
        let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| js_error(&e))?
            .dyn_into()
            .map_err(|e| ServiceError::Transport(format!("not a Response: {e:?}")))?;

        if !response.ok() {
            log::error!("http: {url} answered {}", response.status());
            return Err(ServiceError::Status(response.status()));
        }

        let text = JsFuture::from(response.text().map_err(|e| js_error(&e))?)
            .await
            .map_err(|e| js_error(&e))?
            .as_string()
            .ok_or_else(|| ServiceError::Decode("response body is not text".into()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl ContourService for HttpServices {
    #[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
    async fn cluster_colors(
        &self,
        request: &ClusterRequest,
    ) -> Result<ClusterResponse, ServiceError> {
        let form = build_form(
            Some(ImagePart {
                bytes: &request.image,
                mime_type: image_mime_type(&request.image),
                filename: "image",
            }),
            &wire::cluster_fields(&request.params),
        )?;
        let body: wire::ColoursResponse = self.post(&self.endpoints.colours, &form).await?;
        let preview = raster::decode_base64_jpeg(&body.image).await?;
        Ok(ClusterResponse {
            swatches: body.colours,
            preview,
        })
    }

    #[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
    async fn extract_mask(&self, request: &MaskRequest) -> Result<MaskResponse, ServiceError> {
        let form = build_form(
            Some(ImagePart {
                bytes: &request.image,
                mime_type: image_mime_type(&request.image),
                filename: "image",
            }),
            &wire::mask_fields(request)?,
        )?;
        let body: wire::ContourImageResponse =
            self.post(&self.endpoints.contour_image, &form).await?;
        let mask = raster::decode_base64_jpeg(&body.image).await?;
        Ok(MaskResponse { mask })
    }

    #[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
    async fn vectorize(&self, canvas: &PixelBuffer) -> Result<ContourSet, ServiceError> {
        let png = raster::encode_png(canvas.image())?;
        let form = build_form(
            Some(ImagePart {
                bytes: &png,
                mime_type: "image/png",
                filename: "image.png",
            }),
            &[],
        )?;
        let body: wire::ContoursResponse = self.post(&self.endpoints.contours, &form).await?;
        Ok(wire::contours_from_wire(body.contours))
    }
}

impl TransformService for HttpServices {
    #[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
    async fn solve(&self, request: &TransformRequest) -> Result<ContourSet, ServiceError> {
        let form = build_form(None, &wire::transform_fields(request)?)?;
        let body: wire::TransformResponse = self.post(&self.endpoints.transform, &form).await?;
        Ok(wire::contours_from_wire(body.trans_contours))
    }
}
