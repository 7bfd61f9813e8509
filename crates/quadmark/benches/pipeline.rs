use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Rotation3, Vector3};
use quadmark::core::GrayImage;
use quadmark::decode::CODEBOOK;
use quadmark::detector::synthetic::{render_scene, PlacedMarker};
use quadmark::{CameraModel, DetectorParams, MarkerDetector, Pose};

fn scene() -> (CameraModel, GrayImage) {
    let camera = CameraModel::pinhole(800.0, 800.0, 320.0, 240.0);
    let markers = [
        PlacedMarker {
            bits: CODEBOOK.compose([0, 1, 2, 3, 0]).expect("valid words"),
            length: 0.05,
            pose: Pose::new(
                Rotation3::from_euler_angles(0.35, -0.25, 0.4).into_inner(),
                Vector3::new(-0.04, -0.005, 0.3),
            ),
        },
        PlacedMarker {
            bits: CODEBOOK.compose([3, 3, 3, 3, 3]).expect("valid words"),
            length: 0.05,
            pose: Pose::new(
                Rotation3::from_euler_angles(-0.2, 0.3, 1.9).into_inner(),
                Vector3::new(0.05, 0.01, 0.32),
            ),
        },
    ];
    let img = render_scene(&camera, 640, 480, &markers, 2);
    (camera, img)
}

fn bench_pipeline(c: &mut Criterion) {
    let (camera, img) = scene();
    let params = DetectorParams {
        marker_length: 0.05,
        ..DetectorParams::default()
    };
    let detector = MarkerDetector::new(camera, params).expect("valid configuration");

    c.bench_function("binarize_640x480", |b| {
        b.iter(|| black_box(detector.binarize(black_box(&img))))
    });

    let binary = detector.binarize(&img);
    c.bench_function("find_candidates_640x480", |b| {
        b.iter(|| black_box(detector.find_candidates(black_box(&binary))))
    });

    c.bench_function("detect_640x480", |b| {
        b.iter(|| black_box(detector.detect_gray(black_box(&img))))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
