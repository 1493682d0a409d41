//! geotrace: command-line front-end for the contour editing and
//! geo-referencing core.
//!
//! - `erase` paints rectangles out of a mask PNG the way the browser
//!   eraser does and can dump the resulting erasure log.
//! - `georef` places traced contours on a Web-Mercator map view from
//!   three point correspondences and writes GeoJSON.
//!
//! # Usage
//!
//! ```text
//! geotrace erase mask.png --rect 10,10,50,40 --rect 0,0,5,5 -o out.png
//! geotrace georef --contours c.json --pairs p.json \
//!     --center 51.5,-0.12 --zoom 13 --size 800,600 -o out.geojson
//! ```
//!
//! Set `RUST_LOG=debug` for state-transition logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures::executor::block_on;
use geotrace_core::wire::contours_from_wire;
use geotrace_core::{
    CanvasGeometry, CorrespondencePair, CorrespondenceSet, Dimensions, EraseRect, GeoReferencer,
    GeoTraceError, LatLng, LocalTransformService, Point, RasterEditSession, ScreenRect, Size,
    WebMercatorView,
};

/// Contour editing and geo-referencing tools.
#[derive(Parser)]
#[command(name = "geotrace", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Erase rectangles from a mask image.
    Erase {
        /// Path to the mask image (PNG, JPEG, BMP, WebP).
        mask: PathBuf,

        /// Rectangle corners `X0,Y0,X1,Y1` in mask pixels; repeatable.
        #[arg(long = "rect", value_parser = parse_rect)]
        rects: Vec<[f64; 4]>,

        /// Where to write the erased mask (PNG).
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the clamped erasure log as JSON.
        #[arg(long)]
        log_json: Option<PathBuf>,
    },

    /// Geo-reference contours from three point correspondences.
    Georef {
        /// Contours as `[[[x, y], …], …]` in image pixels.
        #[arg(long)]
        contours: PathBuf,

        /// Three pairs as `[[{"x":…,"y":…}, {"x":…,"y":…}], …]`: image
        /// pixel first, then map container pixel.
        #[arg(long)]
        pairs: PathBuf,

        /// Map centre `LAT,LNG`.
        #[arg(long, value_parser = parse_lat_lng, allow_hyphen_values = true)]
        center: LatLng,

        /// Map zoom level.
        #[arg(long)]
        zoom: f64,

        /// Map container size `W,H` in pixels.
        #[arg(long, value_parser = parse_size)]
        size: Size,

        /// Where to write the GeoJSON.
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] GeoTraceError),

    #[error(transparent)]
    Export(#[from] geotrace_export::ExportError),

    #[error("expected exactly 3 point pairs, found {0}")]
    PairCount(usize),
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("`{part}`: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; N]>::try_from(values)
        .map_err(|v| format!("expected {N} comma-separated numbers, got {}", v.len()))
}

fn parse_rect(s: &str) -> Result<[f64; 4], String> {
    parse_numbers(s)
}

fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let [lat, lng] = parse_numbers(s)?;
    Ok(LatLng::new(lat, lng))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let [width, height] = parse_numbers(s)?;
    if width <= 0.0 || height <= 0.0 {
        return Err("size must be positive".into());
    }
    Ok(Size::new(width, height))
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })
}

fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    serde_json::from_slice(&read(path)?).map_err(|source| CliError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Replay `rects` as erase strokes over `mask`.
fn erase(
    mask: image::RgbaImage,
    rects: &[[f64; 4]],
) -> Result<(image::RgbaImage, Vec<EraseRect>), CliError> {
    let mut session = RasterEditSession::new();
    session.open(Dimensions::new(mask.width(), mask.height()));
    session.load_mask(mask)?;
    if !session.eraser_engaged() {
        session.toggle_eraser()?;
    }
    for &[x0, y0, x1, y1] in rects {
        session.begin_stroke(Point::new(x0, y0))?;
        session.commit_stroke(Point::new(x1, y1));
    }
    let image = session
        .visible()
        .cloned()
        .ok_or(GeoTraceError::NoMask)?;
    Ok((image, session.erasures().to_vec()))
}

fn run_erase(
    mask: &Path,
    rects: &[[f64; 4]],
    output: &Path,
    log_json: Option<&Path>,
) -> Result<(), CliError> {
    let image = image::load_from_memory(&read(mask)?)?.to_rgba8();
    let (erased, log) = erase(image, rects)?;
    erased.save_with_format(output, image::ImageFormat::Png)?;
    eprintln!("{} erasure(s) written to {}", log.len(), output.display());

    if let Some(path) = log_json {
        let json = serde_json::to_string_pretty(&log).map_err(|source| CliError::Json {
            path: path.to_owned(),
            source,
        })?;
        write(path, json)?;
    }
    Ok(())
}

fn correspondences(pairs: Vec<[Point; 2]>) -> Result<CorrespondenceSet, CliError> {
    let pairs: Vec<CorrespondencePair> = pairs
        .into_iter()
        .map(|[image, map]| CorrespondencePair::new(image, map))
        .collect();
    <[CorrespondencePair; 3]>::try_from(pairs)
        .map(CorrespondenceSet::new)
        .map_err(|p| CliError::PairCount(p.len()))
}

/// Solve, project and serialize. Map pixels are container-relative, so
/// the container sits at the screen origin.
fn georef(
    contours: Vec<Vec<[f64; 2]>>,
    pairs: Vec<[Point; 2]>,
    center: LatLng,
    zoom: f64,
    size: Size,
) -> Result<geotrace_export::ExportedFile, CliError> {
    let set = correspondences(pairs)?;
    let contours = contours_from_wire(contours);
    if contours.is_empty() {
        return Err(GeoTraceError::NoContours.into());
    }
    let container = ScreenRect::new(0.0, 0.0, size.width, size.height);
    let view = WebMercatorView::new(center, zoom, container);
    let overlay = CanvasGeometry::new(container, size);

    let mut georef = GeoReferencer::new(LocalTransformService);
    let geo = block_on(georef.transform(set, &contours, overlay, &view))?;
    log::info!("geo-referenced {} contour(s)", geo.len());
    Ok(geotrace_export::prepare_download(&geo)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Erase {
            mask,
            rects,
            output,
            log_json,
        } => run_erase(&mask, &rects, &output, log_json.as_deref()),
        Command::Georef {
            contours,
            pairs,
            center,
            zoom,
            size,
            output,
        } => {
            let file = georef(
                read_json(&contours)?,
                read_json(&pairs)?,
                center,
                zoom,
                size,
            )?;
            write(&output, &file.contents)?;
            eprintln!("GeoJSON written to {}", output.display());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
