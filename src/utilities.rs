//! Internal utility functions.
//!
//! Pixel-plane copying and timestamp conversion shared by the surface and the
//! extractor.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Bytes per pixel of the RGBA rasterization format.
pub(crate) const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Copy plane 0 of an RGBA frame into a tightly-packed buffer.
///
/// FFmpeg rows are often padded (stride > width × 4); the padding is dropped
/// so the result can go straight into [`image::RgbaImage::from_raw`].
pub(crate) fn rgba_plane_to_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    strip_stride(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * RGBA_BYTES_PER_PIXEL,
        height as usize,
    )
}

/// Drop per-row padding from a plane.
pub(crate) fn strip_stride(data: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Vec<u8> {
    if stride == row_bytes {
        return data[..row_bytes * rows].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_bytes * rows);
    for row in 0..rows {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_bytes]);
    }
    buffer
}

/// Compute `max(0, duration - epsilon)`.
pub fn last_frame_target(duration: Duration, epsilon: Duration) -> Duration {
    duration.saturating_sub(epsilon)
}

/// FFmpeg's `AV_NOPTS_VALUE`.
const NO_TIMESTAMP: i64 = i64::MIN;

/// Container start time in microseconds, zero when FFmpeg does not know it.
pub(crate) fn container_start_micros(raw_start_time: i64) -> i64 {
    if raw_start_time == NO_TIMESTAMP {
        0
    } else {
        raw_start_time
    }
}

/// Convert a media-relative [`Duration`] to an absolute AV_TIME_BASE
/// (microsecond) seek timestamp.
///
/// `Input::seek` with no stream selected expects AV_TIME_BASE units on the
/// container's own timeline, which begins at `start_micros`.
pub(crate) fn duration_to_seek_timestamp(duration: Duration, start_micros: i64) -> i64 {
    i64::try_from(duration.as_micros())
        .unwrap_or(i64::MAX)
        .saturating_add(start_micros)
}

/// A media-relative [`Duration`] as absolute stream seconds.
pub(crate) fn absolute_seconds(duration: Duration, start_micros: i64) -> f64 {
    duration.as_secs_f64() + start_micros as f64 / 1_000_000.0
}

/// An absolute presentation time in seconds, relative to the media start.
pub(crate) fn media_position(absolute_seconds: f64, start_micros: i64) -> Duration {
    seconds_to_duration(absolute_seconds - start_micros as f64 / 1_000_000.0)
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert a non-negative number of seconds to a [`Duration`], clamping
/// negatives and non-finite values to zero.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}
