//! geotrace-io: browser I/O for geotrace.
//!
//! Talks to the contour/transform HTTP service with `fetch`, presents
//! rasters and correspondence lines on canvases, drives a Leaflet map,
//! triggers Blob downloads and forwards `log` records to the console.

pub mod canvas;
pub mod console;
pub mod download;
pub mod http;
pub mod leaflet;
pub mod raster;

pub use download::{DownloadError, download_geojson, save_file};
pub use http::{Endpoints, HttpServices};
pub use leaflet::{LeafletError, LeafletMap};
