//! Decoded video surfaces.
//!
//! A [`VideoSurface`] owns the demuxer and decoder for one bound video. Opening
//! it is the metadata-loaded milestone: intrinsic dimensions and duration are
//! known afterwards. [`seek`](VideoSurface::seek) positions the surface on the
//! last frame at or before a target time, and
//! [`rasterize`](VideoSurface::rasterize) draws that frame onto an RGBA
//! canvas at native resolution.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{RgbaImage, imageops};

use crate::{
    binding::MediaBinding, error::LastFrameError, metadata::SurfaceMetadata, utilities,
};

/// An opened video, ready to seek and draw.
pub struct VideoSurface {
    input_context: Input,
    stream_index: usize,
    time_base: Rational,
    /// Container `start_time` in AV_TIME_BASE units; timestamps are offset by it.
    start_micros: i64,
    metadata: SurfaceMetadata,
    position: Duration,
    current_frame: Option<VideoFrame>,
}

impl Debug for VideoSurface {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSurface")
            .field("metadata", &self.metadata)
            .field("stream_index", &self.stream_index)
            .field("start_micros", &self.start_micros)
            .field("position", &self.position)
            .field("has_frame", &self.current_frame.is_some())
            .finish_non_exhaustive()
    }
}

impl VideoSurface {
    /// Open the bound media and read its metadata.
    ///
    /// # Errors
    ///
    /// - [`LastFrameError::FileOpen`] if FFmpeg cannot open or probe the file.
    /// - [`LastFrameError::NoVideoStream`] if it has no video stream.
    pub fn open(binding: &MediaBinding) -> Result<Self, LastFrameError> {
        let path = binding.path();
        let open_error = |reason: String| LastFrameError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input_context =
            ffmpeg_next::format::input(path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(LastFrameError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        // Container duration is in AV_TIME_BASE and measured from start_time;
        // fall back to the stream's own.
        let raw_start_time = unsafe { (*input_context.as_ptr()).start_time };
        let start_micros = utilities::container_start_micros(raw_start_time);
        let container_duration = input_context.duration();
        let duration = if container_duration > 0 {
            Duration::from_micros(container_duration as u64)
        } else if stream.duration() > 0 {
            utilities::seconds_to_duration(utilities::pts_to_seconds(stream.duration(), time_base))
        } else {
            Duration::ZERO
        };

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = SurfaceMetadata {
            width: decoder.width(),
            height: decoder.height(),
            duration,
            frames_per_second,
            codec: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            format: input_context.format().name().to_string(),
        };

        log::debug!(
            "Loaded metadata for {}: {}x{}, {:.3}s from {}us, codec={}",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.duration.as_secs_f64(),
            start_micros,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            stream_index,
            time_base,
            start_micros,
            metadata,
            position: Duration::ZERO,
            current_frame: None,
        })
    }

    /// Everything known about the video once it has been opened.
    pub fn metadata(&self) -> &SurfaceMetadata {
        &self.metadata
    }

    /// Intrinsic frame width in pixels.
    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    /// Intrinsic frame height in pixels.
    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    /// Total duration, measured from the first timestamp.
    pub fn duration(&self) -> Duration {
        self.metadata.duration
    }

    /// Presentation time of the frame currently on the surface, measured from
    /// the start of the media.
    pub fn position(&self) -> Duration {
        self.position
    }

    /// Seek to `target` and decode the last frame presented at or before it.
    ///
    /// `target` is measured from the start of the media, like
    /// [`duration`](Self::duration); the container's start offset is applied
    /// internally. The demuxer jumps to the nearest keyframe before `target`, then frames
    /// are decoded forward until one is presented after `target` or the
    /// stream ends.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::Seek`] if the demuxer cannot seek or no frame
    /// could be decoded from the seek point.
    pub fn seek(&mut self, target: Duration) -> Result<(), LastFrameError> {
        let seek_error = |reason: String| LastFrameError::Seek {
            position: target,
            reason,
        };

        let timestamp = utilities::duration_to_seek_timestamp(target, self.start_micros);
        self.input_context
            .seek(timestamp, ..timestamp)
            .map_err(|error| seek_error(error.to_string()))?;

        let stream = self
            .input_context
            .stream(self.stream_index)
            .ok_or(LastFrameError::NoVideoStream)?;
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let target_seconds = utilities::absolute_seconds(target, self.start_micros);
        let time_base = self.time_base;
        let mut landed: Option<(VideoFrame, f64)> = None;
        let mut passed_target = false;

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|error| seek_error(error.to_string()))?;
            passed_target = drain_decoder(&mut decoder, time_base, target_seconds, &mut landed);
            if passed_target {
                break;
            }
        }

        if !passed_target {
            decoder.send_eof()?;
            drain_decoder(&mut decoder, time_base, target_seconds, &mut landed);
        }

        let (frame, seconds) =
            landed.ok_or_else(|| seek_error("no decodable frame at or before target".to_string()))?;

        log::debug!(
            "Seek to {:.6}s landed on frame at {:.6}s",
            target_seconds,
            seconds
        );
        self.position = utilities::media_position(seconds, self.start_micros);
        self.current_frame = Some(frame);
        Ok(())
    }

    /// Draw the current frame onto `canvas`, origin-aligned.
    ///
    /// The frame is scaled to the canvas size, which for a canvas allocated
    /// from [`width`](Self::width) and [`height`](Self::height) is the native
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::Seek`] if no frame has been decoded yet, or an
    /// FFmpeg error if pixel conversion fails.
    pub fn rasterize(&self, canvas: &mut RgbaImage) -> Result<(), LastFrameError> {
        let frame = self.current_frame.as_ref().ok_or_else(|| LastFrameError::Seek {
            position: self.position,
            reason: "surface has no decoded frame".to_string(),
        })?;

        let (width, height) = canvas.dimensions();
        let mut scaler = ScalingContext::get(
            frame.format(),
            frame.width(),
            frame.height(),
            Pixel::RGBA,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;
        let mut rgba_frame = VideoFrame::empty();
        scaler.run(frame, &mut rgba_frame)?;

        let buffer = utilities::rgba_plane_to_buffer(&rgba_frame, width, height);
        let drawn = RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
            LastFrameError::Unknown("decoded frame does not fill the canvas".to_string())
        })?;
        imageops::replace(canvas, &drawn, 0, 0);
        Ok(())
    }
}

/// Pull every ready frame out of `decoder`, keeping the latest one presented
/// at or before `target_seconds`. Returns `true` once a frame past the target
/// has been seen.
fn drain_decoder(
    decoder: &mut ffmpeg_next::decoder::Video,
    time_base: Rational,
    target_seconds: f64,
    landed: &mut Option<(VideoFrame, f64)>,
) -> bool {
    let mut decoded = VideoFrame::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
        let seconds = utilities::pts_to_seconds(pts, time_base);

        if seconds > target_seconds && landed.is_some() {
            return true;
        }
        let frame = std::mem::replace(&mut decoded, VideoFrame::empty());
        *landed = Some((frame, seconds));
    }
    false
}
