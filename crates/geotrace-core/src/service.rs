//! Contracts of the remote collaborators the core depends on.
//!
//! The core never performs clustering, morphology, vectorization or the
//! correspondence solve itself. It talks to those capabilities through
//! the [`ContourService`] and [`TransformService`] traits so that the
//! browser client (`geotrace-io`), the CLI and tests can each plug in
//! their own implementation.
//!
//! The traits use `async fn` without `Send` bounds: everything runs on a
//! single cooperative thread (the browser main thread, or a
//! `block_on` executor).

use std::rc::Rc;

use crate::buffer::PixelBuffer;
use crate::types::{
    ContourSet, CorrespondenceSet, EraseRect, ExtractionParams, RgbaImage, Swatch,
};

/// Failure talking to a remote collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("service responded with HTTP {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("malformed service response: {0}")]
    Decode(String),

    /// The service understood the request but cannot fulfil it.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<image::ImageError> for ServiceError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(format!("preview image: {err}"))
    }
}

/// Color clustering request: the uploaded image plus contrast,
/// brightness and cluster-count parameters.
#[derive(Debug, Clone)]
pub struct ClusterRequest {
    /// Encoded bytes of the uploaded image, shared with later requests.
    pub image: Rc<[u8]>,
    pub params: ExtractionParams,
}

/// Dominant colors and a preview of the contrast-adjusted image.
#[derive(Debug, Clone)]
pub struct ClusterResponse {
    pub swatches: Vec<Swatch>,
    pub preview: RgbaImage,
}

/// Mask extraction request.
#[derive(Debug, Clone)]
pub struct MaskRequest {
    pub image: Rc<[u8]>,
    pub params: ExtractionParams,
    /// Swatches whose pixels form the mask.
    pub selected: Vec<Swatch>,
    /// Every cluster centroid; pixels are snapped to the nearest one.
    pub centroids: Vec<Swatch>,
    /// Rectangles to paint out before contour detection.
    pub erasures: Vec<EraseRect>,
}

/// The processed mask, ready to become the edit session's baseline.
#[derive(Debug, Clone)]
pub struct MaskResponse {
    pub mask: RgbaImage,
}

/// Correspondence solve request: three point pairs plus the contours to
/// carry through the solved transform.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub correspondences: CorrespondenceSet,
    pub contours: ContourSet,
}

/// Clustering, mask extraction and vectorization.
#[allow(async_fn_in_trait)]
pub trait ContourService {
    /// Compute the dominant colors of an image.
    async fn cluster_colors(
        &self,
        request: &ClusterRequest,
    ) -> Result<ClusterResponse, ServiceError>;

    /// Build a filled contour mask from the selected colors.
    async fn extract_mask(&self, request: &MaskRequest) -> Result<MaskResponse, ServiceError>;

    /// Trace the outer contours of a canvas raster.
    async fn vectorize(&self, canvas: &PixelBuffer) -> Result<ContourSet, ServiceError>;
}

/// Solve the transform fixed by three correspondences and apply it.
#[allow(async_fn_in_trait)]
pub trait TransformService {
    /// Map every contour vertex from image space into map pixel space.
    async fn solve(&self, request: &TransformRequest) -> Result<ContourSet, ServiceError>;
}

impl<T: ContourService> ContourService for Rc<T> {
    async fn cluster_colors(
        &self,
        request: &ClusterRequest,
    ) -> Result<ClusterResponse, ServiceError> {
        (**self).cluster_colors(request).await
    }

    async fn extract_mask(&self, request: &MaskRequest) -> Result<MaskResponse, ServiceError> {
        (**self).extract_mask(request).await
    }

    async fn vectorize(&self, canvas: &PixelBuffer) -> Result<ContourSet, ServiceError> {
        (**self).vectorize(canvas).await
    }
}

impl<T: TransformService> TransformService for Rc<T> {
    async fn solve(&self, request: &TransformRequest) -> Result<ContourSet, ServiceError> {
        (**self).solve(request).await
    }
}
