//! Benchmarks for depth post-processing and evaluation
//!
//! Sizes follow common KITTI training and evaluation resolutions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Matrix3;
use rust_depth_native::core::{PoseVector, Tensor, TensorShape};
use rust_depth_native::depth::{
    calc_smoothness, compute_depth_metrics, depth2inv, post_process_inv_depth, transform_depth,
    CropMode, FuseMethod, MetricsConfig,
};
use std::time::Duration;

const SIZES: [(usize, usize); 3] = [(96, 320), (192, 640), (375, 1242)];

fn synthetic_depth(batch: usize, height: usize, width: usize) -> Tensor {
    Tensor::from_fn(TensorShape::map(batch, height, width), |b, _, h, w| {
        if (h * 7 + w * 3) % 5 == 0 {
            0.0
        } else {
            2.0 + b as f32 + 30.0 * h as f32 / height as f32 + 0.01 * w as f32
        }
    })
}

fn benchmark_post_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_process_inv_depth");
    for (h, w) in SIZES {
        let inv = depth2inv(&synthetic_depth(4, h, w));
        let flipped = rust_depth_native::imgproc::flip_lr(&inv);
        group.bench_with_input(
            BenchmarkId::new("mean", format!("{h}x{w}")),
            &(inv, flipped),
            |b, (inv, flipped)| {
                b.iter(|| post_process_inv_depth(black_box(inv), black_box(flipped), FuseMethod::Mean))
            },
        );
    }
    group.finish();
}

fn benchmark_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_depth_metrics");
    group.measurement_time(Duration::from_secs(5));
    let config = MetricsConfig::default().with_crop(CropMode::Garg);
    for (h, w) in SIZES {
        let gt = synthetic_depth(4, h, w);
        let pred = gt.scale(1.1);
        for median in [false, true] {
            group.bench_with_input(
                BenchmarkId::new(if median { "median_scaled" } else { "raw" }, format!("{h}x{w}")),
                &(gt.clone(), pred.clone()),
                |b, (gt, pred)| {
                    b.iter(|| compute_depth_metrics(&config, black_box(gt), black_box(pred), median))
                },
            );
        }
    }
    group.finish();
}

fn benchmark_smoothness(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc_smoothness");
    let (h, w) = SIZES[1];
    let inv_depths: Vec<Tensor> = (0..4)
        .map(|i| depth2inv(&synthetic_depth(4, h >> i, w >> i)))
        .collect();
    let images: Vec<Tensor> = (0..4)
        .map(|i| Tensor::full(TensorShape::new(4, 3, h >> i, w >> i), 0.5))
        .collect();
    group.bench_function("4_scales", |b| {
        b.iter(|| calc_smoothness(black_box(&inv_depths), black_box(&images), 4))
    });
    group.finish();
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_depth");
    group.sample_size(20);
    let k = Matrix3::new(721.5, 0.0, 609.5, 0.0, 721.5, 172.8, 0.0, 0.0, 1.0);
    let pose = PoseVector::from_slice(&[0.05, -0.02, 0.1, 0.001, 0.002, -0.001]).unwrap_or_default();
    for (h, w) in SIZES {
        let depth = synthetic_depth(1, h, w);
        group.bench_with_input(BenchmarkId::new("euler", format!("{h}x{w}")), &depth, |b, depth| {
            b.iter(|| transform_depth(black_box(depth), &[k], &pose))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_post_process,
    benchmark_metrics,
    benchmark_smoothness,
    benchmark_transform
);
criterion_main!(benches);
