//! Map container geometry and pixel → geographic conversion.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::types::{LatLng, Point, ScreenRect};

/// What the geo-referencer needs from the interactive map.
pub trait MapProjection {
    /// The map container's current on-screen rectangle. Read on every
    /// call because the page may have scrolled or resized.
    fn container_rect(&self) -> ScreenRect;

    /// Geographic coordinate under a point given relative to the map
    /// container's top-left corner, at the map's current view.
    fn container_point_to_lat_lng(&self, point: Point) -> LatLng;
}

/// Side length of a map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which the square Web-Mercator world ends.
const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Project to world pixel coordinates at `zoom` (origin top-left).
fn project(lat_lng: LatLng, zoom: f64) -> Point {
    let size = world_size(zoom);
    let lat = lat_lng
        .lat
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    let merc_y = (0.5 * (FRAC_PI_2 + lat)).tan().ln();
    Point::new(
        size * (lat_lng.lng + 180.0) / 360.0,
        size * 0.5 * (1.0 - merc_y / PI),
    )
}

fn unproject(point: Point, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = point.x / size * 360.0 - 180.0;
    let merc_y = PI * (1.0 - 2.0 * point.y / size);
    let lat = 2.0f64.mul_add(merc_y.exp().atan(), -FRAC_PI_2);
    LatLng::new(lat.to_degrees(), lng)
}

/// A static EPSG:3857 (Web-Mercator) view with 256 px tiles: the map
/// state needed to turn container pixels into coordinates without a
/// browser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WebMercatorView {
    pub center: LatLng,
    pub zoom: f64,
    /// On-screen rectangle of the map container.
    pub container: ScreenRect,
}

impl WebMercatorView {
    #[must_use]
    pub const fn new(center: LatLng, zoom: f64, container: ScreenRect) -> Self {
        Self {
            center,
            zoom,
            container,
        }
    }

    pub const fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// World pixel of the container's top-left corner. Rounded to whole
    /// pixels the way tile-based map widgets place their panes.
    fn pixel_origin(&self) -> Point {
        let c = project(self.center, self.zoom);
        Point::new(
            (c.x - self.container.width / 2.0).round(),
            (c.y - self.container.height / 2.0).round(),
        )
    }

    /// Inverse of [`MapProjection::container_point_to_lat_lng`].
    #[must_use]
    pub fn lat_lng_to_container_point(&self, lat_lng: LatLng) -> Point {
        let world = project(lat_lng, self.zoom);
        let origin = self.pixel_origin();
        Point::new(world.x - origin.x, world.y - origin.y)
    }
}

impl MapProjection for WebMercatorView {
    fn container_rect(&self) -> ScreenRect {
        self.container
    }

    fn container_point_to_lat_lng(&self, point: Point) -> LatLng {
        let origin = self.pixel_origin();
        unproject(Point::new(point.x + origin.x, point.y + origin.y), self.zoom)
    }
}
