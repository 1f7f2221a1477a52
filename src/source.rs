//! Source video handles.
//!
//! A [`SourceVideo`] is the user-supplied file: its bytes (on disk or in
//! memory), declared MIME type, display name, size, and last-modified time.
//! [`ExtractionIdentity`] is the `(name, size, last_modified)` key used to
//! recognise a file that has already been processed.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::error::LastFrameError;

/// MIME types accepted by drop-target intake.
pub const ACCEPTED_MEDIA_TYPES: [&str; 2] = ["video/mp4", "video/webm"];

/// Where a [`SourceVideo`]'s bytes live.
#[derive(Debug, Clone)]
pub enum SourceContent {
    /// A file on disk.
    Path(PathBuf),
    /// An owned in-memory buffer (e.g. an uploaded or dropped blob).
    Bytes(Arc<[u8]>),
}

/// A user-supplied video file.
///
/// # Example
///
/// ```no_run
/// use lastframe::SourceVideo;
///
/// let source = SourceVideo::from_path("clip.mp4")?;
/// assert_eq!(source.media_type(), Some("video/mp4"));
/// # Ok::<(), lastframe::LastFrameError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SourceVideo {
    content: SourceContent,
    name: String,
    media_type: Option<String>,
    size: u64,
    last_modified: u64,
}

impl SourceVideo {
    /// Describe a file on disk.
    ///
    /// Size and modification time come from the filesystem. The declared type
    /// is inferred from the extension, the way a host file dialog labels it.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::IoError`] if the file metadata cannot be read.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LastFrameError> {
        let path = path.as_ref();
        let file_metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let last_modified = file_metadata
            .modified()
            .map(system_time_to_millis)
            .unwrap_or(0);

        Ok(Self {
            media_type: media_type_for_path(path).map(str::to_string),
            content: SourceContent::Path(path.to_path_buf()),
            name,
            size: file_metadata.len(),
            last_modified,
        })
    }

    /// Describe an in-memory blob with an explicitly declared type.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        media_type: Option<&str>,
        last_modified: SystemTime,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            size: bytes.len() as u64,
            content: SourceContent::Bytes(bytes),
            name: name.into(),
            media_type: media_type.map(str::to_string),
            last_modified: system_time_to_millis(last_modified),
        }
    }

    /// Override the declared MIME type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: Option<&str>) -> Self {
        self.media_type = media_type.map(str::to_string);
        self
    }

    /// Where the bytes live.
    pub fn content(&self) -> &SourceContent {
        &self.content
    }

    /// Display name, including any extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type, as the host labelled the file.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last-modified time in milliseconds since the Unix epoch.
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Whether the declared type is one of [`ACCEPTED_MEDIA_TYPES`].
    pub fn has_accepted_type(&self) -> bool {
        self.media_type.as_deref().is_some_and(is_accepted_media_type)
    }

    /// Reject the source unless its declared type is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::UnsupportedInput`] on a mismatch.
    pub fn ensure_accepted_type(&self) -> Result<(), LastFrameError> {
        if self.has_accepted_type() {
            Ok(())
        } else {
            Err(LastFrameError::UnsupportedInput {
                media_type: self
                    .media_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        }
    }

    /// The dedup key for this file.
    pub fn identity(&self) -> ExtractionIdentity {
        ExtractionIdentity {
            name: self.name.clone(),
            size: self.size,
            last_modified: self.last_modified,
        }
    }
}

/// Composite key recognising a file that has already been processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractionIdentity {
    pub name: String,
    pub size: u64,
    pub last_modified: u64,
}

impl Display for ExtractionIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}-{}", self.name, self.size, self.last_modified)
    }
}

/// Check a declared MIME type against the accepted video formats.
///
/// Parameters such as `; codecs=vp9` are ignored and the comparison is
/// case-insensitive.
pub fn is_accepted_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_MEDIA_TYPES.contains(&essence.as_str())
}

/// Infer a declared MIME type from a file extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn system_time_to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn blob(name: &str, media_type: Option<&str>) -> SourceVideo {
        SourceVideo::from_bytes(
            name,
            vec![0_u8; 16],
            media_type,
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_000),
        )
    }

    #[test]
    fn accepted_media_types() {
        assert!(is_accepted_media_type("video/mp4"));
        assert!(is_accepted_media_type("video/webm"));
        assert!(is_accepted_media_type("Video/WebM; codecs=vp9"));
        assert!(!is_accepted_media_type("image/png"));
        assert!(!is_accepted_media_type("video/quicktime"));
        assert!(!is_accepted_media_type(""));
    }

    #[test]
    fn extension_inference() {
        assert_eq!(media_type_for_path(Path::new("a/b.MP4")), Some("video/mp4"));
        assert_eq!(media_type_for_path(Path::new("clip.webm")), Some("video/webm"));
        assert_eq!(media_type_for_path(Path::new("shot.png")), Some("image/png"));
        assert_eq!(media_type_for_path(Path::new("README")), None);
    }

    #[test]
    fn identity_uses_name_size_and_mtime() {
        let first = blob("clip.mp4", Some("video/mp4"));
        let second = blob("clip.mp4", None);
        assert_eq!(first.identity(), second.identity());

        let renamed = blob("other.mp4", Some("video/mp4"));
        assert_ne!(first.identity(), renamed.identity());
        assert_eq!(first.identity().size, 16);
        assert_eq!(first.identity().last_modified, 1_700_000_000_000);
    }

    #[test]
    fn overriding_the_declared_type() {
        let source = blob("clip.bin", Some("application/octet-stream"));
        assert!(!source.has_accepted_type());

        let relabelled = source.with_media_type(Some("video/webm"));
        assert!(relabelled.has_accepted_type());
        assert_eq!(relabelled.media_type(), Some("video/webm"));
        assert!(relabelled.with_media_type(None).ensure_accepted_type().is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let source = blob("mystery", None);
        let error = source.ensure_accepted_type().unwrap_err();
        assert!(error.to_string().contains("unknown"));
    }

    #[test]
    fn from_path_reads_filesystem_metadata() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("clip.webm");
        fs::write(&path, b"not really a video").unwrap();

        let source = SourceVideo::from_path(&path).unwrap();
        assert_eq!(source.name(), "clip.webm");
        assert_eq!(source.size(), 18);
        assert_eq!(source.media_type(), Some("video/webm"));
        assert!(matches!(source.content(), SourceContent::Path(_)));
    }
}
