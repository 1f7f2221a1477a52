//! Error types for the `lastframe` crate.
//!
//! This module defines [`LastFrameError`], the unified error type returned by
//! every fallible extraction, session, and binding operation. Each variant
//! renders as a single human-readable message, which is what a
//! [`ExtractionSession`](crate::ExtractionSession) stores and displays.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `lastframe` operations.
///
/// Every extraction failure is terminal for that invocation; nothing in the
/// crate retries. The user re-triggers extraction by supplying a file again.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LastFrameError {
    /// A dropped file's declared type is not an accepted video format.
    #[error("Unsupported file type: {media_type} (expected video/mp4 or video/webm)")]
    UnsupportedInput {
        /// The declared MIME type, or `"unknown"` when none was declared.
        media_type: String,
    },

    /// The video reported a zero width, height, or duration once its metadata
    /// was loaded.
    #[error("Video has no usable dimensions ({width}x{height}, duration {duration:?})")]
    Dimension {
        /// Intrinsic width in pixels.
        width: u32,
        /// Intrinsic height in pixels.
        height: u32,
        /// Total duration reported by the container.
        duration: Duration,
    },

    /// Seeking to the final frame did not complete successfully.
    #[error("Failed to seek to {position:?}: {reason}")]
    Seek {
        /// The position the seek was aimed at.
        position: Duration,
        /// Underlying reason the seek failed.
        reason: String,
    },

    /// PNG encoding produced no data.
    #[error("Failed to encode frame as PNG: {0}")]
    Encode(String),

    /// The media source could not be opened.
    #[error("Failed to open video at {path}: {reason}")]
    FileOpen {
        /// Path that FFmpeg was asked to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The extraction did not settle within the configured deadline.
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while binding or saving files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while rasterizing or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// Any other failure (for example a panicked extraction task).
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl From<FfmpegError> for LastFrameError {
    fn from(error: FfmpegError) -> Self {
        LastFrameError::FfmpegError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_input_names_both_accepted_types() {
        let error = LastFrameError::UnsupportedInput {
            media_type: "image/png".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("image/png"));
        assert!(message.contains("video/mp4"));
        assert!(message.contains("video/webm"));
    }

    #[test]
    fn ffmpeg_errors_convert() {
        let error: LastFrameError = FfmpegError::Eof.into();
        assert!(matches!(error, LastFrameError::FfmpegError(_)));
    }
}
