mod sheet;
mod stabilize;

pub use sheet::{load_sheet, slice_sheet, SheetError, DEFAULT_CELL_MARGIN};
pub use stabilize::stabilize_frames;

use image::RgbaImage;

/// The available visual frames, partitioned into anchors (cells close to the
/// source still image) and animated frames (the generated variation).
///
/// Combined indexing is anchors-first: index `i < anchor_count()` resolves
/// into the anchor sequence, everything above into the animated sequence.
/// The partition is fixed once built and frames stay addressable for the
/// lifetime of any timeline generated against them.
#[derive(Clone, Debug)]
pub struct FrameSet {
    anchors: Vec<RgbaImage>,
    animated: Vec<RgbaImage>,
}

impl FrameSet {
    /// Split an ordered frame sequence into the first `anchor_count` anchors
    /// and the remaining animated frames.
    ///
    /// `anchor_count` is clamped so that at least one anchor exists whenever
    /// the input is non-empty; the animated sequence may legitimately end up
    /// empty (a one-frame sheet, or an all-anchor split).
    pub fn split(frames: Vec<RgbaImage>, anchor_count: usize) -> Self {
        let n = anchor_count.clamp(1, frames.len().max(1)).min(frames.len());
        let mut frames = frames;
        let animated = frames.split_off(n);
        Self {
            anchors: frames,
            animated,
        }
    }

    pub fn new(anchors: Vec<RgbaImage>, animated: Vec<RgbaImage>) -> Self {
        Self { anchors, animated }
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn animated_count(&self) -> usize {
        self.animated.len()
    }

    /// Total addressable frames (anchors + animated).
    pub fn total(&self) -> usize {
        self.anchors.len() + self.animated.len()
    }

    /// Resolve a combined index to its frame image.
    ///
    /// Indices produced by timeline generation are always in range; passing
    /// an out-of-range index is a caller bug and panics like slice indexing.
    pub fn frame(&self, index: usize) -> &RgbaImage {
        if index < self.anchors.len() {
            &self.anchors[index]
        } else {
            &self.animated[index - self.anchors.len()]
        }
    }

    pub fn anchors(&self) -> &[RgbaImage] {
        &self.anchors
    }

    pub fn animated(&self) -> &[RgbaImage] {
        &self.animated
    }

    /// Iterate all frames in combined order.
    pub fn iter(&self) -> impl Iterator<Item = &RgbaImage> {
        self.anchors.iter().chain(self.animated.iter())
    }
}
