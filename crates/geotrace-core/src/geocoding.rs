//! The geo-referencing step: correspondences in, map polygons out.
//!
//! [`GeocodingSession`] ties together the [`CorrespondenceCollector`],
//! the [`GeoReferencer`] and the [`ContourOverlayManager`]. Clicks are
//! classified and collected; when the third pair completes, the
//! contours are solved onto the map and every polygon layer is
//! replaced.

use std::fmt;

use crate::correspondence::{CorrespondenceCollector, Designation, surface_at};
use crate::generation::Generation;
use crate::georef::GeoReferencer;
use crate::mapper::{CanvasGeometry, rescale_contours};
use crate::overlay::{ContourOverlayManager, MapSurface};
use crate::projection::MapProjection;
use crate::service::{ServiceError, TransformRequest, TransformService};
use crate::types::{
    Contour, ContourSet, CorrespondencePair, CorrespondenceSet, GeoContour, GeoTraceError, Point,
    ScreenRect, Size,
};

/// Geo-referencing state for one set of vectorized contours.
pub struct GeocodingSession<T, S: MapSurface> {
    collector: CorrespondenceCollector,
    georef: GeoReferencer<T>,
    overlay: ContourOverlayManager<S>,
    contours: ContourSet,
}

impl<T: fmt::Debug, S: MapSurface + fmt::Debug> fmt::Debug for GeocodingSession<T, S>
where
    S::Layer: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodingSession")
            .field("collector", &self.collector)
            .field("georef", &self.georef)
            .field("overlay", &self.overlay)
            .field("contours", &self.contours)
            .finish()
    }
}

impl<T: TransformService, S: MapSurface> GeocodingSession<T, S> {
    #[must_use]
    pub fn new(service: T, surface: S) -> Self {
        Self::with_overlay(service, ContourOverlayManager::new(surface))
    }

    #[must_use]
    pub const fn with_overlay(service: T, overlay: ContourOverlayManager<S>) -> Self {
        Self {
            collector: CorrespondenceCollector::new(),
            georef: GeoReferencer::new(service),
            overlay,
            contours: Vec::new(),
        }
    }

    /// Install freshly vectorized contours.
    ///
    /// `source` is the size of the canvas they were traced from and
    /// `displayed` the rectangle, in overlay-canvas pixels, where the
    /// image is shown next to the map.
    pub fn set_contours(&mut self, contours: &[Contour], source: Size, displayed: ScreenRect) {
        self.contours = rescale_contours(contours, source, displayed);
        log::debug!("geocoding: {} contour(s) ready", self.contours.len());
    }

    /// Contours in overlay-canvas pixels, as sent for solving.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Classify and collect a click without starting a solve.
    ///
    /// `pointer` and `image_rect` are in screen space; the map
    /// container's rectangle is read from `map`.
    pub fn click(
        &mut self,
        pointer: Point,
        image_rect: ScreenRect,
        map: &impl MapProjection,
        overlay: CanvasGeometry,
    ) -> Designation {
        let surface = surface_at(pointer, image_rect, map.container_rect());
        self.collector.designate(surface, overlay.pixel_at(pointer))
    }

    /// Stamp a solve for a completed correspondence set.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoContours`] if no contours are loaded.
    pub fn begin_transform(
        &mut self,
        correspondences: CorrespondenceSet,
    ) -> Result<(Generation, TransformRequest), GeoTraceError> {
        if self.contours.is_empty() {
            log::warn!("geocoding: correspondences complete but no contours loaded");
            return Err(GeoTraceError::NoContours);
        }
        Ok(self.georef.begin(correspondences, &self.contours))
    }

    /// Project a solve result and show it on the map.
    ///
    /// # Errors
    ///
    /// As [`GeoReferencer::finish`]. The previous polygons stay on the
    /// map on failure: layers are only replaced once every contour has
    /// been projected.
    pub fn finish_transform(
        &mut self,
        generation: Generation,
        solved: Result<ContourSet, ServiceError>,
        overlay: CanvasGeometry,
        map: &impl MapProjection,
    ) -> Result<&[GeoContour], GeoTraceError> {
        let geo_contours = self.georef.finish(generation, solved, overlay, map)?;
        self.overlay.replace_all(geo_contours);
        Ok(self.overlay.geo_contours())
    }

    /// Handle one click; on the third completed pair, solve and redraw
    /// the map polygons before returning.
    ///
    /// # Errors
    ///
    /// As [`begin_transform`](Self::begin_transform) and
    /// [`finish_transform`](Self::finish_transform). The collector has
    /// already reset when these are returned.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn designate(
        &mut self,
        pointer: Point,
        image_rect: ScreenRect,
        map: &impl MapProjection,
        overlay: CanvasGeometry,
    ) -> Result<Designation, GeoTraceError> {
        let outcome = self.click(pointer, image_rect, map, overlay);
        if let Designation::Complete(set) = &outcome {
            let (generation, request) = self.begin_transform(*set)?;
            let solved = self.georef.service().solve(&request).await;
            self.finish_transform(generation, solved, overlay, map)?;
        }
        Ok(outcome)
    }

    /// Segment from the pending image point to the pointer, in
    /// overlay-canvas pixels.
    #[must_use]
    pub fn rubber_band(&self, pointer: Point, overlay: CanvasGeometry) -> Option<(Point, Point)> {
        self.collector.rubber_band(overlay.pixel_at(pointer))
    }

    /// Pairs recorded toward the next solve, for redrawing their lines.
    #[must_use]
    pub fn recorded(&self) -> &[CorrespondencePair] {
        self.collector.recorded()
    }

    /// Forget correspondences and geo-referenced contours, remove every
    /// polygon, and drop any solve in flight. The loaded contours stay.
    pub fn clear_all(&mut self) {
        log::debug!("geocoding: clear all");
        self.collector.clear();
        self.georef.cancel();
        self.overlay.clear();
    }

    /// The latest successfully geo-referenced contours.
    #[must_use]
    pub fn geo_contours(&self) -> &[GeoContour] {
        self.overlay.geo_contours()
    }

    #[must_use]
    pub const fn collector(&self) -> &CorrespondenceCollector {
        &self.collector
    }

    #[must_use]
    pub const fn overlay(&self) -> &ContourOverlayManager<S> {
        &self.overlay
    }
}
