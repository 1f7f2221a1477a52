//! Benchmarks for PNG encoding, object URLs, and end-to-end extraction.
//!
//! Run with: cargo bench
//!
//! The extraction benchmark needs fixtures from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{path::Path, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use lastframe::{
    FfmpegLogLevel, FrameExtractor, LastFrameExtractor, ObjectUrlStore, SourceVideo, encode_png,
    set_ffmpeg_log_level,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn benchmark_png_encoding(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("encode png");
    for (width, height) in [(320, 240), (1280, 720), (1920, 1080)] {
        let canvas = gradient(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &canvas,
            |bencher, canvas| {
                bencher.iter(|| encode_png(canvas).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_object_urls(criterion: &mut Criterion) {
    let store = ObjectUrlStore::new();
    let bytes: Arc<[u8]> = Arc::from(vec![0_u8; 64 * 1024]);

    criterion.bench_function("object url create + revoke", |bencher| {
        bencher.iter(|| {
            let url = store.create(Arc::clone(&bytes));
            url.revoke();
        });
    });
}

fn benchmark_last_frame(criterion: &mut Criterion) {
    set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let source = SourceVideo::from_path(SAMPLE_VIDEO).unwrap();
    let extractor = FrameExtractor::default();
    criterion.bench_function("extract last frame", |bencher| {
        bencher.iter(|| extractor.extract_last_frame(&source).unwrap());
    });

    let bytes = std::fs::read(SAMPLE_VIDEO).unwrap();
    let in_memory = SourceVideo::from_bytes(
        "sample_video.mp4",
        bytes,
        Some("video/mp4"),
        std::time::SystemTime::now(),
    );
    criterion.bench_function("extract last frame (spilled blob)", |bencher| {
        bencher.iter(|| extractor.extract_last_frame(&in_memory).unwrap());
    });
}

criterion::criterion_group!(
    benches,
    benchmark_png_encoding,
    benchmark_object_urls,
    benchmark_last_frame,
);
criterion::criterion_main!(benches);
