//! # lastframe
//!
//! Grab the final visible frame of an mp4/webm video as a PNG, and serve a
//! single-page application with an `index.html` fallback.
//!
//! The two halves are independent:
//!
//! - **Frame extraction**: [`FrameExtractor`] binds a [`SourceVideo`],
//!   opens a [`VideoSurface`] with FFmpeg via
//!   [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), seeks just before
//!   the end of the stream, draws the frame at native resolution, and encodes
//!   it as PNG. [`ExtractionSession`] wraps it with picker/drop intake, a
//!   dedup guard, a processing flag, and an object-URL-backed download.
//! - **Asset routing**: [`router::route`] serves static assets through an
//!   [`AssetFetcher`] and answers unresolved `GET`s with `/index.html`.
//!
//! ## Quick Start
//!
//! ### Extract the last frame
//!
//! ```no_run
//! use lastframe::{FrameExtractor, LastFrameExtractor, SourceVideo};
//!
//! let source = SourceVideo::from_path("input.mp4").unwrap();
//! let frame = FrameExtractor::default().extract_last_frame(&source).unwrap();
//! std::fs::write("input.mp4.png", &frame.png[..]).unwrap();
//! ```
//!
//! ### Serve an app
//!
//! ```no_run
//! use lastframe::router::{StaticAssets, app};
//!
//! # async fn example() -> std::io::Result<()> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
//! axum::serve(listener, app(StaticAssets::new("dist"))).await
//! # }
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod binding;
pub mod configuration;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod metadata;
pub mod object_url;
pub mod router;
pub mod session;
pub mod source;
pub mod surface;
mod utilities;

pub use binding::MediaBinding;
pub use configuration::{DEFAULT_SEEK_EPSILON, ExtractOptions, ServeOptions};
pub use error::LastFrameError;
pub use extractor::{
    CapturedFrame, FrameExtractor, LastFrameExtractor, encode_png, ensure_drawable,
    extract_last_frame_async, extract_with,
};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use metadata::SurfaceMetadata;
pub use object_url::{ObjectUrl, ObjectUrlStore};
pub use router::{AssetFetcher, StaticAssets};
pub use session::{Download, ExtractionSession, download_name_for};
pub use source::{
    ACCEPTED_MEDIA_TYPES, ExtractionIdentity, SourceContent, SourceVideo, is_accepted_media_type,
};
pub use surface::VideoSurface;
pub use utilities::last_frame_target;
