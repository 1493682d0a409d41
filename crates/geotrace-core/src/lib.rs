//! geotrace-core: interactive contour editing and geo-referencing
//! (sans-IO).
//!
//! Takes a raster through color clustering, mask extraction, manual
//! erasing and vectorization, then places the resulting contours on a
//! world map from three point correspondences.
//!
//! This crate performs **no I/O**. Image processing and the
//! correspondence solve are reached through the [`ContourService`] and
//! [`TransformService`] traits, and the interactive map through
//! [`MapSurface`] and [`MapProjection`]. Browser implementations live in
//! `geotrace-io`; [`LocalTransformService`] and [`WebMercatorView`]
//! cover native use.

pub mod affine;
pub mod buffer;
pub mod correspondence;
pub mod editor;
pub mod generation;
pub mod geocoding;
pub mod georef;
pub mod mapper;
pub mod overlay;
pub mod projection;
pub mod service;
pub mod session;
pub mod types;
pub mod wire;

pub use affine::LocalTransformService;
pub use buffer::PixelBuffer;
pub use correspondence::{CorrespondenceCollector, Designation, Surface};
pub use editor::{ContourEditor, ParamsChange};
pub use generation::Generation;
pub use geocoding::GeocodingSession;
pub use georef::GeoReferencer;
pub use mapper::CanvasGeometry;
pub use overlay::{ContourOverlayManager, MapSurface, OverlayStyle};
pub use projection::{MapProjection, WebMercatorView};
pub use service::{ContourService, ServiceError, TransformService};
pub use session::RasterEditSession;
pub use types::{
    Contour, ContourSet, CorrespondencePair, CorrespondenceSet, Dimensions, EraseRect, ErrorKind,
    ExtractionParams, GeoContour, GeoTraceError, LatLng, Point, RgbaImage, ScreenRect, Size,
    Swatch,
};
