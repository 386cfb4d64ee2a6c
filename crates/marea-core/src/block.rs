//! Planar stereo audio block.
//!
//! The host owns the buffers; engines mutate them in place. Mono material is
//! presented as two identical channels by the host, so engines always see
//! stereo.

use crate::math::sanitize;

/// A mutable view over one block of planar stereo audio.
///
/// Both channels have the same length, at most the `max_block` the engine
/// was prepared with. An empty block is legal and every engine treats it as
/// a no-op.
pub struct StereoBlock<'a> {
    /// Left channel samples.
    pub left: &'a mut [f32],
    /// Right channel samples.
    pub right: &'a mut [f32],
}

impl<'a> StereoBlock<'a> {
    /// Wrap two equal-length channel slices.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn new(left: &'a mut [f32], right: &'a mut [f32]) -> Self {
        assert_eq!(left.len(), right.len(), "channel length mismatch");
        Self { left, right }
    }

    /// Number of frames in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if the block holds no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Iterate both channels as mutable frame pairs.
    #[inline]
    pub fn frames_mut(&mut self) -> impl Iterator<Item = (&mut f32, &mut f32)> {
        self.left.iter_mut().zip(self.right.iter_mut())
    }

    /// Scrub the block: replace NaN/Inf with zero and clamp every sample to
    /// the safe clip limit.
    ///
    /// Every engine calls this on its way out of `process()`; it is what
    /// makes the output-finiteness guarantee unconditional.
    pub fn scrub(&mut self) {
        for s in self.left.iter_mut() {
            *s = sanitize(*s);
        }
        for s in self.right.iter_mut() {
            *s = sanitize(*s);
        }
    }
}
