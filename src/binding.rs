//! Temporary media bindings.
//!
//! FFmpeg opens media by path, so a [`SourceVideo`] has to be bound to one
//! before it can be decoded. On-disk sources are referenced in place;
//! in-memory sources are spilled into a named temporary file. Either way the
//! binding is released when the [`MediaBinding`] is dropped, which covers
//! every exit path of an extraction, including early `?` returns.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    error::LastFrameError,
    source::{SourceContent, SourceVideo},
};

/// A scoped binding between a [`SourceVideo`] and an FFmpeg-openable path.
#[derive(Debug)]
pub struct MediaBinding {
    path: PathBuf,
    name: String,
    spill: Option<NamedTempFile>,
}

impl MediaBinding {
    /// Bind `source` so FFmpeg can open it.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::IoError`] if an in-memory source cannot be
    /// written to a temporary file.
    pub fn bind(source: &SourceVideo) -> Result<Self, LastFrameError> {
        match source.content() {
            SourceContent::Path(path) => {
                log::debug!("Bound {} in place", path.display());
                Ok(Self {
                    path: path.clone(),
                    name: source.name().to_string(),
                    spill: None,
                })
            }
            SourceContent::Bytes(bytes) => {
                let suffix = Path::new(source.name())
                    .extension()
                    .map(|extension| format!(".{}", extension.to_string_lossy()))
                    .unwrap_or_default();
                let mut spill = tempfile::Builder::new()
                    .prefix("lastframe-")
                    .suffix(&suffix)
                    .tempfile()?;
                spill.write_all(bytes)?;
                spill.flush()?;

                let path = spill.path().to_path_buf();
                log::debug!(
                    "Bound {} ({} bytes) to {}",
                    source.name(),
                    bytes.len(),
                    path.display()
                );
                Ok(Self {
                    path,
                    name: source.name().to_string(),
                    spill: Some(spill),
                })
            }
        }
    }

    /// Path FFmpeg should open.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the binding owns a temporary copy of the source.
    pub fn is_spilled(&self) -> bool {
        self.spill.is_some()
    }
}

impl Drop for MediaBinding {
    fn drop(&mut self) {
        // The spilled file, if any, is removed when `spill` drops after this.
        log::debug!("Released media binding for {}", self.name);
    }
}
