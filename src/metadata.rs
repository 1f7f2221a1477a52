//! Decoded surface metadata.
//!
//! [`SurfaceMetadata`] is what a [`VideoSurface`](crate::VideoSurface) reports
//! once its metadata-loaded milestone has passed: intrinsic dimensions, total
//! duration, and a few descriptive fields used by `lastframe probe`.

use std::time::Duration;

/// Intrinsic properties of an opened video.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SurfaceMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Total duration. Zero when the container does not report one.
    pub duration: Duration,
    /// Average frame rate (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

impl SurfaceMetadata {
    /// Whether width, height and duration are all non-zero.
    pub fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.duration.is_zero()
    }
}
