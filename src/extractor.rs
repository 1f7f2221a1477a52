//! Last-frame extraction.
//!
//! [`FrameExtractor`] turns a [`SourceVideo`] into a [`CapturedFrame`]: bind
//! the source, wait for metadata, check dimensions, seek just before the end,
//! draw the frame onto an RGBA canvas of the video's intrinsic size, and
//! encode the canvas as PNG. The media binding is released on every exit
//! path.
//!
//! # Example
//!
//! ```no_run
//! use lastframe::{FrameExtractor, LastFrameExtractor, SourceVideo};
//!
//! let source = SourceVideo::from_path("clip.mp4")?;
//! let frame = FrameExtractor::default().extract_last_frame(&source)?;
//! std::fs::write("clip.mp4.png", &frame.png[..])?;
//! # Ok::<(), lastframe::LastFrameError>(())
//! ```

use std::{sync::Arc, time::Duration};

use image::{ExtendedColorType, ImageEncoder, RgbaImage, codecs::png::PngEncoder};

use crate::{
    binding::MediaBinding, configuration::ExtractOptions, error::LastFrameError,
    metadata::SurfaceMetadata, source::SourceVideo, surface::VideoSurface, utilities,
};

/// A PNG still captured from a video.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Encoded PNG bytes. Never empty.
    pub png: Arc<[u8]>,
    /// Pixel width, equal to the video's intrinsic width.
    pub width: u32,
    /// Pixel height, equal to the video's intrinsic height.
    pub height: u32,
    /// Presentation time of the captured frame.
    pub position: Duration,
    /// Display name of the video the frame came from.
    pub source_name: String,
}

/// Anything that can capture the final frame of a video.
///
/// Implemented by [`FrameExtractor`]; the
/// [`ExtractionSession`](crate::ExtractionSession) is generic over it.
pub trait LastFrameExtractor: Send + Sync + 'static {
    /// Capture the final visible frame of `source`.
    ///
    /// # Errors
    ///
    /// Any [`LastFrameError`]; every failure is terminal for the call.
    fn extract_last_frame(&self, source: &SourceVideo) -> Result<CapturedFrame, LastFrameError>;
}

/// The FFmpeg-backed extractor.
#[derive(Debug, Clone, Default)]
pub struct FrameExtractor {
    options: ExtractOptions,
}

impl FrameExtractor {
    /// Create an extractor that seeks and times out according to `options`.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// The options this extractor was built with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }
}

impl LastFrameExtractor for FrameExtractor {
    fn extract_last_frame(&self, source: &SourceVideo) -> Result<CapturedFrame, LastFrameError> {
        log::debug!("Extracting last frame of {}", source.name());

        let binding = MediaBinding::bind(source)?;
        let mut surface = VideoSurface::open(&binding)?;

        let metadata = surface.metadata().clone();
        ensure_drawable(&metadata)?;

        let mut canvas = RgbaImage::new(metadata.width, metadata.height);
        let target = utilities::last_frame_target(metadata.duration, self.options.seek_epsilon);
        surface.seek(target)?;
        surface.rasterize(&mut canvas)?;
        let png = encode_png(&canvas)?;

        log::info!(
            "Captured {}x{} frame at {:.3}s from {} ({} bytes)",
            canvas.width(),
            canvas.height(),
            surface.position().as_secs_f64(),
            source.name(),
            png.len(),
        );

        Ok(CapturedFrame {
            png: png.into(),
            width: canvas.width(),
            height: canvas.height(),
            position: surface.position(),
            source_name: source.name().to_string(),
        })
    }
}

/// Reject surfaces with a zero width, height, or duration.
///
/// # Errors
///
/// Returns [`LastFrameError::Dimension`] carrying the offending metadata.
pub fn ensure_drawable(metadata: &SurfaceMetadata) -> Result<(), LastFrameError> {
    if metadata.is_drawable() {
        return Ok(());
    }
    Err(LastFrameError::Dimension {
        width: metadata.width,
        height: metadata.height,
        duration: metadata.duration,
    })
}

/// Encode an RGBA canvas as PNG.
///
/// # Errors
///
/// Returns [`LastFrameError::Encode`] if the encoder fails or produces no
/// bytes.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, LastFrameError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|error| LastFrameError::Encode(error.to_string()))?;

    if bytes.is_empty() {
        return Err(LastFrameError::Encode("encoder produced no data".to_string()));
    }
    Ok(bytes)
}

/// Run `extractor` on a blocking thread, optionally bounded by `timeout`.
///
/// Without a timeout the future only resolves when the extractor returns.
/// When the deadline passes the blocking work is abandoned and its result is
/// discarded.
///
/// # Errors
///
/// Returns the extractor's error, [`LastFrameError::Timeout`] when the
/// deadline passes, or [`LastFrameError::Unknown`] if the task panicked.
pub async fn extract_with<E>(
    extractor: Arc<E>,
    source: SourceVideo,
    timeout: Option<Duration>,
) -> Result<CapturedFrame, LastFrameError>
where
    E: LastFrameExtractor + ?Sized,
{
    let task = tokio::task::spawn_blocking(move || extractor.extract_last_frame(&source));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| LastFrameError::Timeout(limit))?,
        None => task.await,
    };

    joined.map_err(|join_error| LastFrameError::Unknown(join_error.to_string()))?
}

/// Extract the last frame of `source` without blocking the async runtime.
///
/// # Errors
///
/// See [`extract_with`].
pub async fn extract_last_frame_async(
    source: SourceVideo,
    options: ExtractOptions,
) -> Result<CapturedFrame, LastFrameError> {
    let timeout = options.timeout;
    extract_with(Arc::new(FrameExtractor::new(options)), source, timeout).await
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use image::Rgba;

    use super::*;

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let mut canvas = RgbaImage::new(7, 3);
        canvas.put_pixel(6, 2, Rgba([255, 0, 0, 255]));

        let bytes = encode_png(&canvas).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (7, 3));
        assert_eq!(decoded.get_pixel(6, 2), &Rgba([255, 0, 0, 255]));
    }

    fn surface(width: u32, height: u32, duration: Duration) -> SurfaceMetadata {
        SurfaceMetadata {
            width,
            height,
            duration,
            frames_per_second: 30.0,
            codec: "vp9".to_string(),
            format: "matroska,webm".to_string(),
        }
    }

    #[test]
    fn undrawable_metadata_is_a_dimension_error() {
        assert!(ensure_drawable(&surface(640, 480, Duration::from_secs(5))).is_ok());

        let zero_width = ensure_drawable(&surface(0, 480, Duration::from_secs(5)));
        assert!(matches!(
            zero_width,
            Err(LastFrameError::Dimension { width: 0, height: 480, .. })
        ));

        let zero_duration = ensure_drawable(&surface(640, 480, Duration::ZERO));
        assert!(matches!(
            zero_duration,
            Err(LastFrameError::Dimension { duration: Duration::ZERO, .. })
        ));
    }

    #[test]
    fn garbage_input_fails_to_open() {
        let source = SourceVideo::from_bytes(
            "broken.mp4",
            b"definitely not an mp4".to_vec(),
            Some("video/mp4"),
            SystemTime::now(),
        );
        let result = FrameExtractor::default().extract_last_frame(&source);
        assert!(matches!(
            result,
            Err(LastFrameError::FileOpen { .. } | LastFrameError::NoVideoStream)
        ));
    }

    struct Stalled;

    impl LastFrameExtractor for Stalled {
        fn extract_last_frame(
            &self,
            _source: &SourceVideo,
        ) -> Result<CapturedFrame, LastFrameError> {
            std::thread::sleep(Duration::from_millis(500));
            Err(LastFrameError::Unknown("should have timed out".to_string()))
        }
    }

    #[tokio::test]
    async fn deadline_turns_a_stall_into_timeout() {
        let source =
            SourceVideo::from_bytes("stall.mp4", vec![0_u8], Some("video/mp4"), SystemTime::now());
        let result = extract_with(
            Arc::new(Stalled),
            source,
            Some(Duration::from_millis(20)),
        )
        .await;
        assert!(matches!(result, Err(LastFrameError::Timeout(_))));
    }
}
