//! Extraction session integration tests.
//!
//! A scripted extractor stands in for FFmpeg so intake, dedup, supersession
//! and cleanup can be checked without media fixtures.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use lastframe::{
    CapturedFrame, ExtractOptions, ExtractionSession, LastFrameError, LastFrameExtractor,
    ObjectUrlStore, SourceVideo,
};

/// Names starting with `slow` take a while, names starting with `broken`
/// fail, everything else yields a tiny fake PNG.
#[derive(Clone, Default)]
struct ScriptedExtractor {
    calls: Arc<AtomicUsize>,
}

impl LastFrameExtractor for ScriptedExtractor {
    fn extract_last_frame(&self, source: &SourceVideo) -> Result<CapturedFrame, LastFrameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.name().starts_with("slow") {
            thread::sleep(Duration::from_millis(200));
        }
        if source.name().starts_with("broken") {
            return Err(LastFrameError::Seek {
                position: Duration::from_secs(1),
                reason: "stream ended early".to_string(),
            });
        }
        Ok(CapturedFrame {
            png: Arc::from(source.name().as_bytes()),
            width: 4,
            height: 2,
            position: Duration::from_millis(990),
            source_name: source.name().to_string(),
        })
    }
}

fn video(name: &str, media_type: &str, modified_secs: u64) -> SourceVideo {
    SourceVideo::from_bytes(
        name,
        vec![0_u8; 16],
        Some(media_type),
        UNIX_EPOCH + Duration::from_secs(modified_secs),
    )
}

fn session() -> (ExtractionSession<ScriptedExtractor>, Arc<AtomicUsize>) {
    let extractor = ScriptedExtractor::default();
    let calls = Arc::clone(&extractor.calls);
    (ExtractionSession::new(extractor, ExtractOptions::new()), calls)
}

#[tokio::test]
async fn picked_file_produces_downloadable_image() {
    let (session, calls) = session();
    session.select_file(video("clip.mp4", "video/mp4", 10)).unwrap();
    assert!(session.is_processing());

    session.settled().await;
    assert!(!session.is_processing());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.error_message(), None);

    let download = session.download().expect("image should be held");
    assert_eq!(download.file_name, "clip.mp4.png");
    assert_eq!(&download.bytes[..], b"clip.mp4");
    assert_eq!(session.image_url().as_deref(), Some(download.url.as_str()));
    assert_eq!(session.download_name().as_deref(), Some("clip.mp4.png"));
}

#[tokio::test]
async fn same_identity_extracts_once() {
    let (session, calls) = session();
    session.select_file(video("clip.mp4", "video/mp4", 10)).unwrap();
    session.select_file(video("clip.mp4", "video/mp4", 10)).unwrap();
    session.settled().await;

    // A completed extraction does not reset the guard either.
    session.drop_file(video("clip.mp4", "video/mp4", 10)).unwrap();
    session.settled().await;

    assert_eq!(session.extractions_started(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(session.download().is_some());
}

#[tokio::test]
async fn changed_modification_time_extracts_again() {
    let (session, calls) = session();
    session.select_file(video("clip.mp4", "video/mp4", 10)).unwrap();
    session.settled().await;
    session.select_file(video("clip.mp4", "video/mp4", 11)).unwrap();
    session.settled().await;

    assert_eq!(session.extractions_started(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropped_image_is_rejected_without_side_effects() {
    let (session, calls) = session();
    session.select_file(video("clip.webm", "video/webm", 1)).unwrap();
    session.settled().await;
    let held_url = session.image_url();

    let result = session.drop_file(video("photo.png", "image/png", 2));
    assert!(matches!(result, Err(LastFrameError::UnsupportedInput { .. })));

    let message = session.error_message().expect("rejection should be reported");
    assert!(message.contains("image/png"), "unexpected message: {message}");
    assert_eq!(session.source().map(|source| source.name().to_string()).as_deref(), Some("clip.webm"));
    assert_eq!(session.image_url(), held_url);
    assert_eq!(session.extractions_started(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn picker_skips_type_check_unless_strict() {
    let (session, _) = session();
    session.select_file(video("clip.mov", "video/quicktime", 1)).unwrap();
    session.settled().await;
    assert_eq!(session.extractions_started(), 1);

    let strict = ExtractionSession::new(
        ScriptedExtractor::default(),
        ExtractOptions::new().with_strict_picker(true),
    );
    let result = strict.select_file(video("clip.mov", "video/quicktime", 1));
    assert!(matches!(result, Err(LastFrameError::UnsupportedInput { .. })));
    assert_eq!(strict.extractions_started(), 0);
}

#[tokio::test]
async fn failure_is_reported_and_processing_resets() {
    let (session, _) = session();
    session.select_file(video("broken.mp4", "video/mp4", 1)).unwrap();
    session.settled().await;

    assert!(!session.is_processing());
    assert!(session.download().is_none());
    let message = session.error_message().expect("failure should be reported");
    assert!(message.contains("stream ended early"), "unexpected message: {message}");
}

#[tokio::test]
async fn new_file_clears_previous_error() {
    let (session, _) = session();
    session.select_file(video("broken.mp4", "video/mp4", 1)).unwrap();
    session.settled().await;
    assert!(session.error_message().is_some());

    session.select_file(video("clip.mp4", "video/mp4", 1)).unwrap();
    assert_eq!(session.error_message(), None);
    session.settled().await;
    assert!(session.download().is_some());
}

#[tokio::test]
async fn superseded_result_is_discarded() {
    let (session, calls) = session();
    session.select_file(video("slow.mp4", "video/mp4", 1)).unwrap();
    session.select_file(video("fast.mp4", "video/mp4", 2)).unwrap();
    session.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!session.is_processing());
    let frame = session.captured_frame().expect("latest image should be held");
    assert_eq!(frame.source_name, "fast.mp4");
    assert_eq!(session.object_urls().live_count(), 1);
}

#[tokio::test]
async fn clear_revokes_image_and_resets_state() {
    let urls = ObjectUrlStore::new();
    let session =
        ExtractionSession::with_store(ScriptedExtractor::default(), ExtractOptions::new(), urls.clone());
    session.select_file(video("clip.mp4", "video/mp4", 1)).unwrap();
    session.settled().await;

    let url = session.image_url().expect("image should be held");
    assert!(urls.resolve(&url).is_some());

    session.clear();
    assert!(urls.resolve(&url).is_none());
    assert_eq!(urls.live_count(), 0);
    assert!(session.source().is_none());
    assert!(session.download().is_none());
    assert_eq!(session.error_message(), None);
    assert!(!session.is_processing());

    // The guard is reset too: the same file extracts again.
    session.select_file(video("clip.mp4", "video/mp4", 1)).unwrap();
    session.settled().await;
    assert_eq!(session.extractions_started(), 2);
}

#[tokio::test]
async fn clear_during_extraction_discards_result() {
    let (session, _) = session();
    session.select_file(video("slow.mp4", "video/mp4", 1)).unwrap();
    session.clear();
    assert!(!session.is_processing());

    session.settled().await;
    assert!(session.download().is_none());
    assert_eq!(session.object_urls().live_count(), 0);
    assert_eq!(session.error_message(), None);
}

#[tokio::test]
async fn download_is_inert_without_image() {
    let (session, _) = session();
    let directory = tempfile::tempdir().expect("Failed to create temp dir");

    assert!(session.download().is_none());
    assert_eq!(session.save_download(directory.path()).unwrap(), None);
    assert_eq!(std::fs::read_dir(directory.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn save_download_writes_png_name() {
    let (session, _) = session();
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    session.select_file(video("holiday.final.webm", "video/webm", 1)).unwrap();
    session.settled().await;

    let path = session.save_download(directory.path()).unwrap().expect("file should be written");
    assert_eq!(path, directory.path().join("holiday.final.webm.png"));
    assert_eq!(std::fs::read(&path).unwrap(), b"holiday.final.webm");
}

#[test]
fn intake_requires_a_runtime() {
    let session = ExtractionSession::new(ScriptedExtractor::default(), ExtractOptions::new());
    let source = SourceVideo::from_bytes("clip.mp4", vec![1_u8], Some("video/mp4"), SystemTime::now());
    assert!(matches!(session.select_file(source), Err(LastFrameError::Unknown(_))));
}
