//! Orchestration of the image → swatches → mask → contours workflow.
//!
//! [`ContourEditor`] owns the uploaded image, the extraction parameters,
//! the swatch selection and the [`RasterEditSession`], and talks to a
//! [`ContourService`] to:
//!
//! 1. cluster the uploaded image into swatches
//!    ([`recluster`](ContourEditor::recluster)),
//! 2. build a mask from the selected swatches and the erasure log
//!    ([`extract`](ContourEditor::extract)),
//! 3. trace the erased mask into contours
//!    ([`vectorize`](ContourEditor::vectorize)).
//!
//! Clustering and extraction each come as `begin_*`/`finish_*` halves
//! stamped with a [`Generation`], so a UI can let several requests
//! overlap and only the most recent answer is applied.

use std::rc::Rc;

use image::GenericImageView;

use crate::buffer::PixelBuffer;
use crate::generation::{Generation, GenerationCounter};
use crate::service::{
    ClusterRequest, ClusterResponse, ContourService, MaskRequest, MaskResponse, ServiceError,
};
use crate::session::RasterEditSession;
use crate::types::{ContourSet, Dimensions, ExtractionParams, GeoTraceError, RgbaImage, Swatch};

/// What the caller must do after [`ContourEditor::set_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsChange {
    /// Nothing changed.
    Unchanged,
    /// Contrast, brightness or cluster count changed: the swatches are
    /// stale and clustering must run again.
    Recluster,
    /// Only mask parameters changed: extract again with the current
    /// selection.
    Reextract,
}

/// Image-to-contours workflow state.
#[derive(Debug)]
pub struct ContourEditor<C> {
    service: C,
    image: Option<Rc<[u8]>>,
    params: ExtractionParams,
    swatches: Vec<Swatch>,
    selected: Vec<Swatch>,
    preview: Option<RgbaImage>,
    session: RasterEditSession,
    clusterings: GenerationCounter,
    extractions: GenerationCounter,
}

impl<C: ContourService> ContourEditor<C> {
    #[must_use]
    pub fn new(service: C) -> Self {
        Self::with_params(service, ExtractionParams::default())
    }

    #[must_use]
    pub fn with_params(service: C, params: ExtractionParams) -> Self {
        Self {
            service,
            image: None,
            params,
            swatches: Vec::new(),
            selected: Vec::new(),
            preview: None,
            session: RasterEditSession::new(),
            clusterings: GenerationCounter::new(),
            extractions: GenerationCounter::new(),
        }
    }

    /// Accept an uploaded image and open a canvas of its size.
    ///
    /// Everything derived from a previous image is discarded: swatches,
    /// selection, mask and erasure log. Requests still in flight for the
    /// previous image become stale.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::EmptyInput`] if `bytes` is empty, or
    /// [`GeoTraceError::ImageDecode`] if it is not a readable image. The
    /// previous image is kept in either case.
    pub fn load_image(&mut self, bytes: Vec<u8>) -> Result<Dimensions, GeoTraceError> {
        if bytes.is_empty() {
            log::warn!("ignoring empty upload");
            return Err(GeoTraceError::EmptyInput);
        }
        let (width, height) = image::load_from_memory(&bytes)
            .inspect_err(|e| log::error!("upload is not a readable image: {e}"))?
            .dimensions();
        let dimensions = Dimensions::new(width, height);
        log::debug!("loaded {width}x{height} image ({} bytes)", bytes.len());

        self.image = Some(Rc::from(bytes));
        self.swatches.clear();
        self.selected.clear();
        self.preview = None;
        self.session.open(dimensions);
        self.clusterings.invalidate();
        self.extractions.invalidate();
        Ok(dimensions)
    }

    /// Replace the extraction parameters and report what has to run
    /// again.
    pub fn set_params(&mut self, params: ExtractionParams) -> ParamsChange {
        let change = if self.params.clustering_differs(&params) {
            ParamsChange::Recluster
        } else if self.params == params {
            ParamsChange::Unchanged
        } else {
            ParamsChange::Reextract
        };
        self.params = params;
        change
    }

    /// Select `swatch` if it is not selected, deselect it otherwise.
    /// Returns whether it is selected afterwards.
    ///
    /// Swatches that clustering did not produce are ignored.
    pub fn toggle_swatch(&mut self, swatch: Swatch) -> bool {
        if !self.swatches.contains(&swatch) {
            return false;
        }
        if let Some(pos) = self.selected.iter().position(|s| *s == swatch) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(swatch);
            true
        }
    }

    // ───────────────────────── clustering ──────────────────────────

    /// Stamp a clustering request for the current image and parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoImage`] if nothing has been uploaded.
    pub fn begin_cluster(&mut self) -> Result<(Generation, ClusterRequest), GeoTraceError> {
        let image = self.image.clone().ok_or_else(|| {
            log::warn!("clustering requested without an image");
            GeoTraceError::NoImage
        })?;
        let generation = self.clusterings.issue();
        Ok((
            generation,
            ClusterRequest {
                image,
                params: self.params,
            },
        ))
    }

    /// Apply a clustering answer: new swatches, new preview, empty
    /// selection, no mask.
    ///
    /// # Errors
    ///
    /// [`GeoTraceError::Superseded`] for a stale answer,
    /// [`GeoTraceError::Service`] if the request failed. State is left
    /// untouched in both cases.
    pub fn finish_cluster(
        &mut self,
        generation: Generation,
        response: Result<ClusterResponse, ServiceError>,
    ) -> Result<&[Swatch], GeoTraceError> {
        if !self.clusterings.is_current(generation) {
            log::info!("dropping stale clustering response {}", generation.get());
            return Err(GeoTraceError::Superseded);
        }
        let response = response.inspect_err(|e| log::error!("clustering failed: {e}"))?;
        log::debug!("clustered into {} swatches", response.swatches.len());
        self.swatches = response.swatches;
        self.selected.clear();
        self.preview = Some(response.preview);
        self.session.clear();
        self.extractions.invalidate();
        Ok(&self.swatches)
    }

    /// Cluster the current image with the current parameters.
    ///
    /// # Errors
    ///
    /// As [`begin_cluster`](Self::begin_cluster) and
    /// [`finish_cluster`](Self::finish_cluster).
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn recluster(&mut self) -> Result<&[Swatch], GeoTraceError> {
        let (generation, request) = self.begin_cluster()?;
        let response = self.service.cluster_colors(&request).await;
        self.finish_cluster(generation, response)
    }

    /// Upload and cluster in one step: [`load_image`](Self::load_image)
    /// followed by [`recluster`](Self::recluster).
    ///
    /// # Errors
    ///
    /// The first failing stage's error.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn open_image(&mut self, bytes: Vec<u8>) -> Result<&[Swatch], GeoTraceError> {
        self.load_image(bytes)?;
        self.recluster().await
    }

    // ───────────────────────── extraction ──────────────────────────

    /// Stamp a mask request for the current selection and erasure log.
    ///
    /// With no swatch selected there is nothing to extract: the mask is
    /// cleared locally, outstanding requests become stale and `None` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoImage`] if nothing has been uploaded.
    pub fn begin_extract(&mut self) -> Result<Option<(Generation, MaskRequest)>, GeoTraceError> {
        let image = self.image.clone().ok_or_else(|| {
            log::warn!("extraction requested without an image");
            GeoTraceError::NoImage
        })?;
        if self.selected.is_empty() {
            log::debug!("no swatches selected; clearing mask");
            self.session.clear();
            self.extractions.invalidate();
            return Ok(None);
        }
        let generation = self.extractions.issue();
        Ok(Some((
            generation,
            MaskRequest {
                image,
                params: self.params,
                selected: self.selected.clone(),
                centroids: self.swatches.clone(),
                erasures: self.session.erasures().to_vec(),
            },
        )))
    }

    /// Install an extracted mask as the session's new baseline.
    ///
    /// # Errors
    ///
    /// [`GeoTraceError::Superseded`] for a stale answer,
    /// [`GeoTraceError::Service`] if the request failed. The previous
    /// mask stays on the canvas in both cases.
    pub fn finish_extract(
        &mut self,
        generation: Generation,
        response: Result<MaskResponse, ServiceError>,
    ) -> Result<&PixelBuffer, GeoTraceError> {
        if !self.extractions.is_current(generation) {
            log::info!("dropping stale mask response {}", generation.get());
            return Err(GeoTraceError::Superseded);
        }
        let response = response.inspect_err(|e| log::error!("mask extraction failed: {e}"))?;
        self.session.load_mask(response.mask)
    }

    /// Extract a mask for the current selection. `Ok(None)` means the
    /// selection was empty and the mask was cleared.
    ///
    /// # Errors
    ///
    /// As [`begin_extract`](Self::begin_extract) and
    /// [`finish_extract`](Self::finish_extract).
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn extract(&mut self) -> Result<Option<PixelBuffer>, GeoTraceError> {
        let Some((generation, request)) = self.begin_extract()? else {
            return Ok(None);
        };
        let response = self.service.extract_mask(&request).await;
        self.finish_extract(generation, response).cloned().map(Some)
    }

    // ───────────────────────── undo / vectorize ──────────────────────────

    /// Discard every erasure and stamp the re-extraction that restores
    /// the unerased mask. `None` when there is no mask to restore.
    ///
    /// # Errors
    ///
    /// As [`begin_extract`](Self::begin_extract).
    pub fn begin_undo_all(&mut self) -> Result<Option<(Generation, MaskRequest)>, GeoTraceError> {
        if !self.session.undo_all() {
            return Ok(None);
        }
        self.begin_extract()
    }

    /// Discard every erasure and regenerate the mask without them.
    /// `Ok(None)` when there was no mask.
    ///
    /// # Errors
    ///
    /// As [`extract`](Self::extract). On failure the canvas keeps
    /// showing the erased mask while the log is already empty.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn undo_all(&mut self) -> Result<Option<PixelBuffer>, GeoTraceError> {
        let Some((generation, request)) = self.begin_undo_all()? else {
            return Ok(None);
        };
        let response = self.service.extract_mask(&request).await;
        self.finish_extract(generation, response).cloned().map(Some)
    }

    /// Trace contours from the current (erased) canvas.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTraceError::NoMask`] if no mask has been extracted,
    /// or [`GeoTraceError::Service`] if tracing failed.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn vectorize(&self) -> Result<ContourSet, GeoTraceError> {
        let baseline = self.session.baseline().ok_or_else(|| {
            log::warn!("vectorize requested without an extracted mask");
            GeoTraceError::NoMask
        })?;
        let contours = self
            .service
            .vectorize(baseline)
            .await
            .inspect_err(|e| log::error!("vectorization failed: {e}"))?;
        log::debug!("vectorized {} contour(s)", contours.len());
        Ok(contours)
    }

    // ───────────────────────── accessors ──────────────────────────

    #[must_use]
    pub const fn service(&self) -> &C {
        &self.service
    }

    #[must_use]
    pub const fn params(&self) -> &ExtractionParams {
        &self.params
    }

    /// Swatches from the latest clustering, in service order.
    #[must_use]
    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    /// Selected swatches, in selection order.
    #[must_use]
    pub fn selected(&self) -> &[Swatch] {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, swatch: Swatch) -> bool {
        self.selected.contains(&swatch)
    }

    /// Contrast-adjusted preview from the latest clustering.
    #[must_use]
    pub const fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.image.is_some()
    }

    #[must_use]
    pub const fn session(&self) -> &RasterEditSession {
        &self.session
    }

    /// The edit session, for stroke gestures and the eraser toggle.
    pub const fn session_mut(&mut self) -> &mut RasterEditSession {
        &mut self.session
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;

    use futures::executor::block_on;
    use image::{ImageFormat, Rgba};

    use super::*;
    use crate::types::{Contour, EraseRect, Point};

    const SWATCHES: [Swatch; 3] =
        [Swatch([0, 0, 0]), Swatch([255, 0, 0]), Swatch([0, 0, 255])];

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Answers with a white mask of the canvas size and remembers every
    /// mask request.
    #[derive(Debug, Default)]
    struct FakeContourService {
        mask_requests: RefCell<Vec<MaskRequest>>,
        fail: bool,
    }

    impl ContourService for FakeContourService {
        async fn cluster_colors(
            &self,
            request: &ClusterRequest,
        ) -> Result<ClusterResponse, ServiceError> {
            let (w, h) = image::load_from_memory(&request.image)?.dimensions();
            Ok(ClusterResponse {
                swatches: SWATCHES.to_vec(),
                preview: RgbaImage::new(w, h),
            })
        }

        async fn extract_mask(&self, request: &MaskRequest) -> Result<MaskResponse, ServiceError> {
            self.mask_requests.borrow_mut().push(request.clone());
            if self.fail {
                return Err(ServiceError::Status(500));
            }
            let (w, h) = image::load_from_memory(&request.image)?.dimensions();
            Ok(MaskResponse {
                mask: RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
            })
        }

        async fn vectorize(&self, canvas: &PixelBuffer) -> Result<ContourSet, ServiceError> {
            let Dimensions { width, height } = canvas.dimensions();
            Ok(vec![Contour::new(vec![
                Point::new(0.0, 0.0),
                Point::new(f64::from(width), 0.0),
                Point::new(f64::from(width), f64::from(height)),
            ])])
        }
    }

    fn editor_with_mask() -> ContourEditor<FakeContourService> {
        let mut editor = ContourEditor::new(FakeContourService::default());
        block_on(editor.open_image(png(80, 60))).unwrap();
        editor.toggle_swatch(SWATCHES[1]);
        block_on(editor.extract()).unwrap();
        editor
    }

    #[test]
    fn empty_upload_is_rejected() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        assert!(matches!(
            editor.load_image(Vec::new()),
            Err(GeoTraceError::EmptyInput)
        ));
        assert!(!editor.has_image());
    }

    #[test]
    fn corrupt_upload_is_a_decode_error() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        let err = editor.load_image(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, GeoTraceError::ImageDecode(_)));
    }

    #[test]
    fn open_image_clusters_and_opens_canvas() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        let swatches = block_on(editor.open_image(png(80, 60))).unwrap().to_vec();
        assert_eq!(swatches, SWATCHES);
        assert_eq!(editor.session().dimensions(), Some(Dimensions::new(80, 60)));
        assert!(editor.preview().is_some());
    }

    #[test]
    fn extraction_without_image_is_a_precondition_failure() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        let err = block_on(editor.extract()).unwrap_err();
        assert!(matches!(err, GeoTraceError::NoImage));
    }

    #[test]
    fn toggle_swatch_flips_selection() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        block_on(editor.open_image(png(8, 8))).unwrap();
        assert!(editor.toggle_swatch(SWATCHES[0]));
        assert!(editor.is_selected(SWATCHES[0]));
        assert!(!editor.toggle_swatch(SWATCHES[0]));
        assert!(editor.selected().is_empty());
        assert!(!editor.toggle_swatch(Swatch([1, 2, 3])));
    }

    #[test]
    fn extract_installs_mask_with_selection_and_centroids() {
        let editor = editor_with_mask();
        let baseline = editor.session().baseline().unwrap();
        assert_eq!(baseline.dimensions(), Dimensions::new(80, 60));

        let requests = editor.service().mask_requests.borrow();
        assert_eq!(requests[0].selected, vec![SWATCHES[1]]);
        assert_eq!(requests[0].centroids, SWATCHES.to_vec());
        assert!(requests[0].erasures.is_empty());
    }

    #[test]
    fn empty_selection_clears_mask_without_a_request() {
        let mut editor = editor_with_mask();
        editor.toggle_swatch(SWATCHES[1]);
        assert!(block_on(editor.extract()).unwrap().is_none());
        assert!(editor.session().baseline().is_none());
        assert_eq!(editor.service().mask_requests.borrow().len(), 1);
    }

    #[test]
    fn erasures_travel_with_the_next_extraction() {
        let mut editor = editor_with_mask();
        let session = editor.session_mut();
        session.toggle_eraser().unwrap();
        session.begin_stroke(Point::new(10.0, 10.0)).unwrap();
        session.commit_stroke(Point::new(20.0, 30.0));

        editor.set_params(ExtractionParams {
            dilate_iterations: 1,
            ..ExtractionParams::default()
        });
        block_on(editor.extract()).unwrap();
        let requests = editor.service().mask_requests.borrow();
        assert_eq!(
            requests[1].erasures,
            vec![EraseRect {
                x: 10,
                y: 10,
                width: 10,
                height: 20,
            }]
        );
        assert_eq!(requests[1].params.dilate_iterations, 1);
    }

    #[test]
    fn undo_all_reextracts_with_empty_log() {
        let mut editor = editor_with_mask();
        let session = editor.session_mut();
        session.toggle_eraser().unwrap();
        session.begin_stroke(Point::new(0.0, 0.0)).unwrap();
        session.commit_stroke(Point::new(40.0, 40.0));
        assert_eq!(
            editor.session().baseline().unwrap().image().get_pixel(5, 5),
            &Rgba([0, 0, 0, 255])
        );

        let restored = block_on(editor.undo_all()).unwrap().unwrap();
        assert_eq!(restored.image().get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
        assert!(editor.session().erasures().is_empty());
        let requests = editor.service().mask_requests.borrow();
        assert!(requests.last().unwrap().erasures.is_empty());
    }

    #[test]
    fn undo_all_without_mask_does_nothing() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        block_on(editor.open_image(png(8, 8))).unwrap();
        assert!(block_on(editor.undo_all()).unwrap().is_none());
        assert!(editor.service().mask_requests.borrow().is_empty());
    }

    #[test]
    fn stale_mask_response_is_dropped() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        block_on(editor.open_image(png(4, 4))).unwrap();
        editor.toggle_swatch(SWATCHES[0]);

        let (first, _) = editor.begin_extract().unwrap().unwrap();
        let (second, _) = editor.begin_extract().unwrap().unwrap();
        let white = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let gray = RgbaImage::from_pixel(4, 4, Rgba([128, 128, 128, 255]));

        editor
            .finish_extract(second, Ok(MaskResponse { mask: white }))
            .unwrap();
        let late = editor.finish_extract(first, Ok(MaskResponse { mask: gray }));
        assert!(matches!(late, Err(GeoTraceError::Superseded)));
        assert_eq!(
            editor.session().baseline().unwrap().image().get_pixel(0, 0),
            &Rgba([255, 255, 255, 255])
        );
    }

    #[test]
    fn failed_extraction_keeps_previous_mask() {
        let mut editor = editor_with_mask();
        let before = editor.session().baseline().unwrap().version();
        editor.service.fail = true;
        let err = block_on(editor.extract()).unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::External);
        assert_eq!(editor.session().baseline().unwrap().version(), before);
    }

    #[test]
    fn set_params_classifies_the_change() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        let base = ExtractionParams::default();
        assert_eq!(editor.set_params(base), ParamsChange::Unchanged);
        assert_eq!(
            editor.set_params(ExtractionParams {
                min_contour_area: 50,
                ..base
            }),
            ParamsChange::Reextract
        );
        assert_eq!(
            editor.set_params(ExtractionParams {
                n_clusters: 4,
                ..base
            }),
            ParamsChange::Recluster
        );
    }

    #[test]
    fn reclustering_resets_selection_and_mask() {
        let mut editor = editor_with_mask();
        block_on(editor.recluster()).unwrap();
        assert!(editor.selected().is_empty());
        assert!(editor.session().baseline().is_none());
    }

    #[test]
    fn vectorize_needs_a_mask() {
        let mut editor = ContourEditor::new(FakeContourService::default());
        block_on(editor.open_image(png(8, 8))).unwrap();
        assert!(matches!(
            block_on(editor.vectorize()),
            Err(GeoTraceError::NoMask)
        ));
    }

    #[test]
    fn vectorize_traces_the_canvas() {
        let editor = editor_with_mask();
        let contours = block_on(editor.vectorize()).unwrap();
        assert_eq!(contours[0].points()[2], Point::new(80.0, 60.0));
    }
}
