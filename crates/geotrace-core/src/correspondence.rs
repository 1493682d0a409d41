//! Collect three image-point/map-point correspondences from clicks.
//!
//! Each pair is an image click followed by a map click. Any other
//! sequence discards the half-made pair but keeps the pairs already
//! recorded. Completing the third pair hands out a
//! [`CorrespondenceSet`] and starts over.

use crate::types::{CorrespondencePair, CorrespondenceSet, Point, ScreenRect};

/// Where a click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// The displayed (letterboxed) image.
    Image,
    /// The map container.
    Map,
    /// Neither.
    Outside,
}

/// Classify a screen point. Bounds are inclusive and the image wins
/// where the two rectangles overlap.
#[must_use]
pub fn surface_at(point: Point, image_rect: ScreenRect, map_rect: ScreenRect) -> Surface {
    if image_rect.contains(point) {
        Surface::Image
    } else if map_rect.contains(point) {
        Surface::Map
    } else {
        Surface::Outside
    }
}

/// Collector state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectorState {
    Idle,
    /// An image point was chosen; the next map click completes the pair.
    AwaitingMapPoint(Point),
}

/// Outcome of one [`CorrespondenceCollector::designate`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Designation {
    /// An image point was stored; waiting for its map point.
    Pending,
    /// The click did not start a pair and changed nothing.
    Ignored,
    /// A pair was recorded; the payload is how many are held now.
    Recorded(usize),
    /// The pending image point was discarded.
    Aborted,
    /// The third pair completed the set. The collector is idle and empty
    /// again.
    Complete(CorrespondenceSet),
}

/// Two-click correspondence state machine.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceCollector {
    pending: Option<Point>,
    recorded: Vec<CorrespondencePair>,
}

impl CorrespondenceCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: None,
            recorded: Vec::new(),
        }
    }

    /// Feed one click. `point` is in overlay-canvas pixel space.
    pub fn designate(&mut self, surface: Surface, point: Point) -> Designation {
        let Some(image_point) = self.pending.take() else {
            if surface == Surface::Image {
                log::debug!("correspondence: image point ({}, {})", point.x, point.y);
                self.pending = Some(point);
                return Designation::Pending;
            }
            return Designation::Ignored;
        };

        if surface != Surface::Map {
            log::debug!("correspondence: pending image point discarded");
            return Designation::Aborted;
        }

        self.recorded.push(CorrespondencePair::new(image_point, point));
        match <[CorrespondencePair; 3]>::try_from(self.recorded.as_slice()) {
            Ok(pairs) => {
                self.recorded.clear();
                log::debug!("correspondence: set complete");
                Designation::Complete(CorrespondenceSet::new(pairs))
            }
            Err(_) => {
                log::debug!("correspondence: {} pair(s) recorded", self.recorded.len());
                Designation::Recorded(self.recorded.len())
            }
        }
    }

    /// Segment from the pending image point to `current`, for the
    /// rubber-band preview. `None` when no pair is in progress.
    #[must_use]
    pub fn rubber_band(&self, current: Point) -> Option<(Point, Point)> {
        self.pending.map(|origin| (origin, current))
    }

    /// Pairs recorded toward the next set (at most two).
    #[must_use]
    pub fn recorded(&self) -> &[CorrespondencePair] {
        &self.recorded
    }

    #[must_use]
    pub const fn state(&self) -> CollectorState {
        match self.pending {
            Some(p) => CollectorState::AwaitingMapPoint(p),
            None => CollectorState::Idle,
        }
    }

    /// Forget the pending point and every recorded pair.
    pub fn clear(&mut self) {
        self.pending = None;
        self.recorded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: f64) -> Point {
        Point::new(v, v)
    }

    #[test]
    fn surface_prefers_image_and_includes_edges() {
        let image = ScreenRect::new(0.0, 0.0, 100.0, 100.0);
        let map = ScreenRect::new(50.0, 0.0, 200.0, 100.0);
        assert_eq!(surface_at(Point::new(75.0, 10.0), image, map), Surface::Image);
        assert_eq!(surface_at(Point::new(100.0, 100.0), image, map), Surface::Image);
        assert_eq!(surface_at(Point::new(250.0, 100.0), image, map), Surface::Map);
        assert_eq!(surface_at(Point::new(251.0, 10.0), image, map), Surface::Outside);
    }

    #[test]
    fn map_click_while_idle_is_ignored() {
        let mut c = CorrespondenceCollector::new();
        assert_eq!(c.designate(Surface::Map, p(1.0)), Designation::Ignored);
        assert_eq!(c.designate(Surface::Outside, p(1.0)), Designation::Ignored);
        assert_eq!(c.state(), CollectorState::Idle);
        assert!(c.recorded().is_empty());
    }

    #[test]
    fn three_pairs_complete_a_set_and_reset() {
        let mut c = CorrespondenceCollector::new();
        assert_eq!(c.designate(Surface::Image, p(1.0)), Designation::Pending);
        assert_eq!(c.designate(Surface::Map, p(10.0)), Designation::Recorded(1));
        assert_eq!(c.designate(Surface::Image, p(2.0)), Designation::Pending);
        assert_eq!(c.designate(Surface::Map, p(20.0)), Designation::Recorded(2));
        assert_eq!(c.designate(Surface::Image, p(3.0)), Designation::Pending);

        let outcome = c.designate(Surface::Map, p(30.0));
        let expected = CorrespondenceSet::new([
            CorrespondencePair::new(p(1.0), p(10.0)),
            CorrespondencePair::new(p(2.0), p(20.0)),
            CorrespondencePair::new(p(3.0), p(30.0)),
        ]);
        assert_eq!(outcome, Designation::Complete(expected));
        assert_eq!(c.state(), CollectorState::Idle);
        assert!(c.recorded().is_empty());
    }

    #[test]
    fn second_image_click_aborts_pending_pair_only() {
        let mut c = CorrespondenceCollector::new();
        c.designate(Surface::Image, p(1.0));
        c.designate(Surface::Map, p(10.0));
        c.designate(Surface::Image, p(2.0));
        assert_eq!(c.designate(Surface::Image, p(3.0)), Designation::Aborted);
        assert_eq!(c.state(), CollectorState::Idle);
        assert_eq!(c.recorded().len(), 1);
    }

    #[test]
    fn outside_click_aborts_pending_pair() {
        let mut c = CorrespondenceCollector::new();
        c.designate(Surface::Image, p(1.0));
        assert_eq!(c.designate(Surface::Outside, p(5.0)), Designation::Aborted);
        assert!(c.rubber_band(p(7.0)).is_none());
    }

    #[test]
    fn rubber_band_follows_cursor() {
        let mut c = CorrespondenceCollector::new();
        assert!(c.rubber_band(p(4.0)).is_none());
        c.designate(Surface::Image, p(1.0));
        assert_eq!(c.rubber_band(p(4.0)), Some((p(1.0), p(4.0))));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut c = CorrespondenceCollector::new();
        c.designate(Surface::Image, p(1.0));
        c.designate(Surface::Map, p(2.0));
        c.designate(Surface::Image, p(3.0));
        c.clear();
        assert_eq!(c.state(), CollectorState::Idle);
        assert!(c.recorded().is_empty());
    }
}
