//! Turn image-space contours into geographic contours.
//!
//! The [`TransformService`] maps contour vertices from image pixels into
//! overlay-canvas pixels over the map. Each solved vertex is then taken
//! to screen space, made relative to the map container, and handed to
//! the map's projection.
//!
//! The request is split into [`GeoReferencer::begin`] and
//! [`GeoReferencer::finish`] so a UI can release its borrows while the
//! solve is in flight; [`GeoReferencer::transform`] does both in one
//! call.

use crate::generation::{Generation, GenerationCounter};
use crate::mapper::CanvasGeometry;
use crate::projection::MapProjection;
use crate::service::{ServiceError, TransformRequest, TransformService};
use crate::types::{
    Contour, ContourSet, CorrespondenceSet, GeoContour, GeoTraceError, LatLng, Point,
};

/// Project overlay-canvas contours onto the map.
///
/// The container origin is read from `map` on every call so scrolling
/// or resizing between requests is honoured.
#[must_use]
pub fn project_contours(
    solved: &[Contour],
    overlay: CanvasGeometry,
    map: &impl MapProjection,
) -> Vec<GeoContour> {
    let origin = map.container_rect().origin();
    solved
        .iter()
        .map(|contour| {
            contour
                .points()
                .iter()
                .map(|&p| {
                    let screen = overlay.screen_at(p);
                    map.container_point_to_lat_lng(Point::new(
                        screen.x - origin.x,
                        screen.y - origin.y,
                    ))
                })
                .collect()
        })
        .collect()
}

/// Drives correspondence solves and keeps only the newest answer.
#[derive(Debug)]
pub struct GeoReferencer<T> {
    service: T,
    generations: GenerationCounter,
}

impl<T: TransformService> GeoReferencer<T> {
    #[must_use]
    pub const fn new(service: T) -> Self {
        Self {
            service,
            generations: GenerationCounter::new(),
        }
    }

    #[must_use]
    pub const fn service(&self) -> &T {
        &self.service
    }

    /// Stamp a new solve request. Any request still in flight becomes
    /// stale.
    pub fn begin(
        &mut self,
        correspondences: CorrespondenceSet,
        contours: &[Contour],
    ) -> (Generation, TransformRequest) {
        let generation = self.generations.issue();
        log::debug!(
            "georef: request {} with {} contour(s)",
            generation.get(),
            contours.len()
        );
        (
            generation,
            TransformRequest {
                correspondences,
                contours: contours.to_vec(),
            },
        )
    }

    /// Drop any request in flight.
    pub const fn cancel(&mut self) {
        self.generations.invalidate();
    }

    /// Accept the service's answer for `generation`.
    ///
    /// # Errors
    ///
    /// - [`GeoTraceError::Superseded`] if a newer request was begun (or
    ///   the request was cancelled) in the meantime.
    /// - [`GeoTraceError::Service`] if the solve failed.
    /// - [`GeoTraceError::NonFiniteProjection`] if the map could not place
    ///   some vertex. Nothing is returned for the other contours either.
    pub fn finish(
        &self,
        generation: Generation,
        solved: Result<ContourSet, ServiceError>,
        overlay: CanvasGeometry,
        map: &impl MapProjection,
    ) -> Result<Vec<GeoContour>, GeoTraceError> {
        if !self.generations.is_current(generation) {
            log::info!("georef: dropping stale response {}", generation.get());
            return Err(GeoTraceError::Superseded);
        }
        let solved = solved.inspect_err(|e| log::error!("georef: transform failed: {e}"))?;
        let geo = project_contours(&solved, overlay, map);
        if !geo.iter().all(|c| c.vertices().iter().all(LatLng::is_finite)) {
            log::error!("georef: map returned a non-finite coordinate");
            return Err(GeoTraceError::NonFiniteProjection);
        }
        Ok(geo)
    }

    /// [`begin`](Self::begin), await the service, then
    /// [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// As [`finish`](Self::finish).
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn transform(
        &mut self,
        correspondences: CorrespondenceSet,
        contours: &[Contour],
        overlay: CanvasGeometry,
        map: &impl MapProjection,
    ) -> Result<Vec<GeoContour>, GeoTraceError> {
        let (generation, request) = self.begin(correspondences, contours);
        let solved = self.service.solve(&request).await;
        self.finish(generation, solved, overlay, map)
    }
}
