//! The interactive map, backed by a Leaflet `L.Map` instance.
//!
//! Leaflet has no Rust bindings, so calls go through `js_sys::Reflect`.
//! [`MapProjection`] and [`MapSurface`] are infallible; a failed call is
//! logged and a fallback returned.

use geotrace_core::{
    GeoContour, LatLng, MapProjection, MapSurface, OverlayStyle, Point, ScreenRect,
};
use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use crate::canvas::element_rect;

#[derive(Debug, thiserror::Error)]
pub enum LeafletError {
    #[error("Leaflet (global `L`) is not loaded")]
    NotLoaded,

    #[error("Leaflet call failed: {0}")]
    JsError(String),
}

impl From<JsValue> for LeafletError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

fn call(target: &JsValue, method: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let args: Array = args.iter().copied().collect();
    function.apply(target, &args)
}

fn get_f64(target: &JsValue, key: &str) -> Result<f64, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))?
        .as_f64()
        .ok_or_else(|| JsValue::from_str(&format!("`{key}` is not a number")))
}

fn style_options(style: &OverlayStyle) -> Result<Object, JsValue> {
    let options = Object::new();
    Reflect::set(&options, &"color".into(), &style.color.as_str().into())?;
    Reflect::set(&options, &"weight".into(), &style.weight.into())?;
    Reflect::set(&options, &"fillColor".into(), &style.fill_color.as_str().into())?;
    Reflect::set(&options, &"fillOpacity".into(), &style.fill_opacity.into())?;
    Ok(options)
}

fn lat_lngs(contour: &GeoContour) -> Array {
    contour
        .vertices()
        .iter()
        .map(|v| -> JsValue {
            [JsValue::from(v.lat), JsValue::from(v.lng)]
                .into_iter()
                .collect::<Array>()
                .into()
        })
        .collect()
}

/// A Leaflet map plus the `L` namespace it came from.
#[derive(Debug, Clone)]
pub struct LeafletMap {
    map: JsValue,
    leaflet: JsValue,
}

impl LeafletMap {
    /// Wrap an existing `L.Map`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafletError::NotLoaded`] if the global `L` is missing.
    pub fn new(map: JsValue) -> Result<Self, LeafletError> {
        let leaflet = Reflect::get(&js_sys::global(), &JsValue::from_str("L"))?;
        if leaflet.is_undefined() {
            return Err(LeafletError::NotLoaded);
        }
        Ok(Self { map, leaflet })
    }

    #[must_use]
    pub const fn map(&self) -> &JsValue {
        &self.map
    }

    fn container(&self) -> Result<web_sys::Element, JsValue> {
        call(&self.map, "getContainer", &[])?.dyn_into()
    }

    fn try_lat_lng(&self, point: Point) -> Result<LatLng, JsValue> {
        let xy: JsValue = [JsValue::from(point.x), JsValue::from(point.y)]
            .into_iter()
            .collect::<Array>()
            .into();
        let lat_lng = call(&self.map, "containerPointToLatLng", &[&xy])?;
        Ok(LatLng::new(get_f64(&lat_lng, "lat")?, get_f64(&lat_lng, "lng")?))
    }

    fn try_add_polygon(
        &self,
        contour: &GeoContour,
        style: &OverlayStyle,
    ) -> Result<JsValue, JsValue> {
        let ring: JsValue = lat_lngs(contour).into();
        let options: JsValue = style_options(style)?.into();
        let polygon = call(&self.leaflet, "polygon", &[&ring, &options])?;
        call(&polygon, "addTo", &[&self.map])
    }
}

impl MapProjection for LeafletMap {
    fn container_rect(&self) -> ScreenRect {
        match self.container() {
            Ok(element) => element_rect(&element),
            Err(e) => {
                log::error!("leaflet: getContainer failed: {e:?}");
                ScreenRect::default()
            }
        }
    }

    fn container_point_to_lat_lng(&self, point: Point) -> LatLng {
        self.try_lat_lng(point).unwrap_or_else(|e| {
            log::error!("leaflet: containerPointToLatLng failed: {e:?}");
            LatLng::new(f64::NAN, f64::NAN)
        })
    }
}

impl MapSurface for LeafletMap {
    /// `None` when Leaflet refused the polygon.
    type Layer = Option<JsValue>;

    fn add_polygon(&mut self, contour: &GeoContour, style: &OverlayStyle) -> Self::Layer {
        self.try_add_polygon(contour, style)
            .inspect_err(|e| log::error!("leaflet: adding polygon failed: {e:?}"))
            .ok()
    }

    fn remove_layer(&mut self, layer: Self::Layer) {
        if let Some(layer) = layer
            && let Err(e) = call(&self.map, "removeLayer", &[&layer])
        {
            log::error!("leaflet: removeLayer failed: {e:?}");
        }
    }
}
