//! Versioned, immutable snapshots of canvas pixel contents.
//!
//! A [`PixelBuffer`] is never edited in place. Every committed edit
//! produces a new buffer with a higher version, so anything still
//! holding an older snapshot (a stroke restore point, an in-flight
//! vectorization request) keeps seeing exactly the pixels it captured.

use std::rc::Rc;

use crate::types::{Dimensions, RgbaImage};

/// A snapshot of the canvas at one point in time.
///
/// Cloning is cheap: the pixel data is shared behind an `Rc`.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    image: Rc<RgbaImage>,
    version: u64,
}

impl PixelBuffer {
    /// Wrap an image as snapshot `version`.
    #[must_use]
    pub fn new(image: RgbaImage, version: u64) -> Self {
        Self {
            image: Rc::new(image),
            version,
        }
    }

    /// The snapshot's pixels.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Monotonically increasing per session; higher is newer.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    /// Copy the pixels out for editing into a successor snapshot.
    #[must_use]
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::clone(&self.image)
    }

    /// Whether both handles refer to the same snapshot allocation.
    #[must_use]
    pub fn same_snapshot(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.image, &other.image)
    }
}
