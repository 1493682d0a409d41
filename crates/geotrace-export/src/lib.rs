//! geotrace-export: Pure format serializers (sans-IO)
//!
//! Converts geo-referenced contours into output formats. Currently
//! supports GeoJSON.

pub mod geojson;

pub use geojson::{ExportError, ExportedFile, prepare_download, to_geojson};
