//! Extraction sessions.
//!
//! [`ExtractionSession`] is the state a host keeps around one held video:
//! intake from a file picker or drop target, the dedup guard that runs
//! exactly one extraction per distinct file, the processing flag, the last
//! error message, and the captured image behind an [`ObjectUrl`].
//!
//! Extractions run on the Tokio runtime, so the intake methods never block.
//! Each trigger bumps a generation counter; a result that arrives after its
//! file was replaced or cleared is discarded instead of overwriting newer
//! state.
//!
//! # Example
//!
//! ```no_run
//! use lastframe::{ExtractOptions, ExtractionSession, FrameExtractor, SourceVideo};
//!
//! # async fn example() -> Result<(), lastframe::LastFrameError> {
//! let session = ExtractionSession::new(FrameExtractor::default(), ExtractOptions::new());
//! session.select_file(SourceVideo::from_path("clip.mp4")?)?;
//! session.settled().await;
//!
//! if let Some(download) = session.download() {
//!     std::fs::write(&download.file_name, &download.bytes[..])?;
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    mem,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::task::JoinHandle;

use crate::{
    configuration::ExtractOptions,
    error::LastFrameError,
    extractor::{CapturedFrame, LastFrameExtractor, extract_with},
    object_url::{ObjectUrl, ObjectUrlStore},
    source::{ExtractionIdentity, SourceVideo},
};

/// A ready-to-save copy of the captured image.
#[derive(Debug, Clone)]
pub struct Download {
    /// The source's display name with `.png` appended.
    pub file_name: String,
    /// Object URL of the held image.
    pub url: String,
    /// PNG bytes.
    pub bytes: Arc<[u8]>,
}

struct HeldImage {
    frame: CapturedFrame,
    url: ObjectUrl,
}

#[derive(Default)]
struct SessionState {
    source: Option<SourceVideo>,
    identity: Option<ExtractionIdentity>,
    generation: u64,
    is_processing: bool,
    error: Option<String>,
    image: Option<HeldImage>,
    extractions_started: u64,
}

type SharedState = Arc<Mutex<SessionState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds one video at a time and extracts its final frame.
pub struct ExtractionSession<E: LastFrameExtractor> {
    extractor: Arc<E>,
    options: ExtractOptions,
    urls: ObjectUrlStore,
    state: SharedState,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<E: LastFrameExtractor> Debug for ExtractionSession<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = lock(&self.state);
        f.debug_struct("ExtractionSession")
            .field("source", &state.source.as_ref().map(SourceVideo::name))
            .field("generation", &state.generation)
            .field("is_processing", &state.is_processing)
            .field("error", &state.error)
            .field("has_image", &state.image.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: LastFrameExtractor> ExtractionSession<E> {
    /// Create a session with its own [`ObjectUrlStore`].
    pub fn new(extractor: E, options: ExtractOptions) -> Self {
        Self::with_store(extractor, options, ObjectUrlStore::new())
    }

    /// Create a session that issues image URLs from `urls`.
    pub fn with_store(extractor: E, options: ExtractOptions, urls: ObjectUrlStore) -> Self {
        Self {
            extractor: Arc::new(extractor),
            options,
            urls,
            state: SharedState::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Accept a file from a file picker.
    ///
    /// The declared type is not checked unless the session was built with
    /// [`ExtractOptions::with_strict_picker`]. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`LastFrameError::UnsupportedInput`] in strict mode on a type mismatch.
    /// - [`LastFrameError::Unknown`] when called outside a Tokio runtime.
    pub fn select_file(&self, source: SourceVideo) -> Result<(), LastFrameError> {
        if self.options.strict_picker {
            self.reject_unaccepted(&source)?;
        }
        self.replace_source(source)
    }

    /// Accept a file dropped on the drop target.
    ///
    /// Only `video/mp4` and `video/webm` are accepted. A rejected drop leaves
    /// the held file untouched and starts nothing.
    ///
    /// # Errors
    ///
    /// Same as [`select_file`](Self::select_file), with the type check always
    /// applied.
    pub fn drop_file(&self, source: SourceVideo) -> Result<(), LastFrameError> {
        self.reject_unaccepted(&source)?;
        self.replace_source(source)
    }

    /// Forget the held file, revoke the image URL, and reset every flag.
    ///
    /// Any extraction still in flight is abandoned; its result is discarded.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.source = None;
        state.identity = None;
        state.is_processing = false;
        state.error = None;
        state.image = None;
        log::debug!("Session cleared (generation {})", state.generation);
    }

    /// Wait for every extraction spawned so far to settle.
    pub async fn settled(&self) {
        let handles = mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(join_error) = handle.await {
                log::warn!("Extraction task ended abnormally: {join_error}");
            }
        }
    }

    /// Whether an extraction for the held file is still running.
    pub fn is_processing(&self) -> bool {
        lock(&self.state).is_processing
    }

    /// The message of the most recent failure, if any.
    pub fn error_message(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// The held file, if any.
    pub fn source(&self) -> Option<SourceVideo> {
        lock(&self.state).source.clone()
    }

    /// The captured image of the held file, once extraction succeeded.
    pub fn captured_frame(&self) -> Option<CapturedFrame> {
        lock(&self.state)
            .image
            .as_ref()
            .map(|held| held.frame.clone())
    }

    /// Object URL of the held image.
    pub fn image_url(&self) -> Option<String> {
        lock(&self.state)
            .image
            .as_ref()
            .map(|held| held.url.as_str().to_string())
    }

    /// Store the image URLs come from.
    pub fn object_urls(&self) -> &ObjectUrlStore {
        &self.urls
    }

    /// Number of extractions this session has started.
    pub fn extractions_started(&self) -> u64 {
        lock(&self.state).extractions_started
    }

    /// File name offered for download: the full display name plus `.png`.
    pub fn download_name(&self) -> Option<String> {
        lock(&self.state)
            .source
            .as_ref()
            .map(|source| download_name_for(source.name()))
    }

    /// The held image as a download. `None` while no image is held.
    pub fn download(&self) -> Option<Download> {
        let state = lock(&self.state);
        let held = state.image.as_ref()?;
        Some(Download {
            file_name: download_name_for(&held.frame.source_name),
            url: held.url.as_str().to_string(),
            bytes: Arc::clone(&held.frame.png),
        })
    }

    /// Write the held image into `directory`.
    ///
    /// Returns the written path, or `None` when no image is held.
    ///
    /// # Errors
    ///
    /// Returns [`LastFrameError::IoError`] if the file cannot be written.
    pub fn save_download(&self, directory: &Path) -> Result<Option<PathBuf>, LastFrameError> {
        let Some(download) = self.download() else {
            return Ok(None);
        };
        let path = directory.join(&download.file_name);
        std::fs::write(&path, &download.bytes[..])?;
        log::info!("Saved {}", path.display());
        Ok(Some(path))
    }

    fn reject_unaccepted(&self, source: &SourceVideo) -> Result<(), LastFrameError> {
        if let Err(error) = source.ensure_accepted_type() {
            log::warn!("Rejected {}: {error}", source.name());
            lock(&self.state).error = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    /// Swap the held file and run the dedup guard.
    fn replace_source(&self, source: SourceVideo) -> Result<(), LastFrameError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| LastFrameError::Unknown(error.to_string()))?;

        let identity = source.identity();
        let generation = {
            let mut state = lock(&self.state);
            state.source = Some(source.clone());
            if state.identity.as_ref() == Some(&identity) {
                log::debug!("Ignoring repeat of {identity}");
                return Ok(());
            }

            state.identity = Some(identity);
            state.generation += 1;
            state.extractions_started += 1;
            state.is_processing = true;
            state.error = None;
            // Starting over revokes the previous image.
            state.image = None;
            state.generation
        };

        let extractor = Arc::clone(&self.extractor);
        let state = Arc::clone(&self.state);
        let urls = self.urls.clone();
        let timeout = self.options.timeout;

        let handle = runtime.spawn(async move {
            let _reset = ProcessingReset {
                state: Arc::clone(&state),
                generation,
            };
            let result = extract_with(extractor, source, timeout).await;
            publish(&state, &urls, generation, result);
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|task| !task.is_finished());
        pending.push(handle);
        Ok(())
    }
}

/// Apply an extraction result unless a newer trigger superseded it.
fn publish(
    state: &SharedState,
    urls: &ObjectUrlStore,
    generation: u64,
    result: Result<CapturedFrame, LastFrameError>,
) {
    let mut state = lock(state);
    if state.generation != generation {
        log::debug!(
            "Discarding result of superseded extraction (generation {generation}, current {})",
            state.generation
        );
        return;
    }

    match result {
        Ok(frame) => {
            let url = urls.create(Arc::clone(&frame.png));
            log::debug!("Published {} for {}", url, frame.source_name);
            state.image = Some(HeldImage { frame, url });
            state.error = None;
        }
        Err(error) => {
            log::warn!("Extraction failed: {error}");
            state.error = Some(error.to_string());
        }
    }
}

/// Clears the processing flag when the extraction task ends, however it ends.
struct ProcessingReset {
    state: SharedState,
    generation: u64,
}

impl Drop for ProcessingReset {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.generation == self.generation {
            state.is_processing = false;
        }
    }
}

/// Append `.png` to the full original name, keeping any existing extension.
pub fn download_name_for(name: &str) -> String {
    format!("{name}.png")
}
