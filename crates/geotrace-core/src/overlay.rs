//! Geo-referenced contours drawn as polygons on the interactive map.

use serde::{Deserialize, Serialize};

use crate::types::GeoContour;

/// Polygon appearance on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// CSS color of the outline.
    pub color: String,
    /// Outline width in pixels.
    pub weight: f64,
    /// CSS color of the fill.
    pub fill_color: String,
    /// Fill opacity, 0–1.
    pub fill_opacity: f64,
}

impl OverlayStyle {
    pub const DEFAULT_COLOR: &'static str = "blue";
    pub const DEFAULT_WEIGHT: f64 = 2.0;
    pub const DEFAULT_FILL_OPACITY: f64 = 0.1;
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.to_owned(),
            weight: Self::DEFAULT_WEIGHT,
            fill_color: Self::DEFAULT_COLOR.to_owned(),
            fill_opacity: Self::DEFAULT_FILL_OPACITY,
        }
    }
}

/// A map that can show and hide polygon layers.
pub trait MapSurface {
    /// Handle to one added polygon.
    type Layer;

    fn add_polygon(&mut self, contour: &GeoContour, style: &OverlayStyle) -> Self::Layer;

    fn remove_layer(&mut self, layer: Self::Layer);
}

/// Owns the current geo-referenced contours and their map layers.
///
/// Layers and contours always correspond one to one, in order.
#[derive(Debug)]
pub struct ContourOverlayManager<S: MapSurface> {
    surface: S,
    style: OverlayStyle,
    layers: Vec<S::Layer>,
    geo_contours: Vec<GeoContour>,
}

impl<S: MapSurface> ContourOverlayManager<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self::with_style(surface, OverlayStyle::default())
    }

    #[must_use]
    pub const fn with_style(surface: S, style: OverlayStyle) -> Self {
        Self {
            surface,
            style,
            layers: Vec::new(),
            geo_contours: Vec::new(),
        }
    }

    /// Remove every layer, then add one polygon per contour in order.
    pub fn replace_all(&mut self, geo_contours: Vec<GeoContour>) {
        self.remove_layers();
        self.layers = geo_contours
            .iter()
            .map(|c| self.surface.add_polygon(c, &self.style))
            .collect();
        log::debug!("overlay: showing {} polygon(s)", self.layers.len());
        self.geo_contours = geo_contours;
    }

    /// Remove every layer and forget the contours.
    pub fn clear(&mut self) {
        self.remove_layers();
        self.geo_contours.clear();
    }

    fn remove_layers(&mut self) {
        for layer in self.layers.drain(..) {
            self.surface.remove_layer(layer);
        }
    }

    pub fn geo_contours(&self) -> &[GeoContour] {
        &self.geo_contours
    }

    pub const fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub const fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }
}
