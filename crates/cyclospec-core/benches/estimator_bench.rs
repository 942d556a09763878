//! Benchmarks for the cyclostationary estimators
//!
//! Run with: cargo bench -p cyclospec-core --bench estimator_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cyclospec_core::prelude::*;
use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

fn bpsk_like(len: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.3).unwrap();
    (0..len)
        .map(|n| {
            let symbol = if (n / 8) % 3 == 0 { -1.0 } else { 1.0 };
            let carrier = Complex64::from_polar(symbol, 0.2 * n as f64);
            carrier + Complex64::new(noise.sample(&mut rng), noise.sample(&mut rng))
        })
        .collect()
}

// ============================================================================
// FAM SCD
// ============================================================================

fn bench_fam_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("fam_modes");
    group.measurement_time(Duration::from_secs(5));

    let signal = bpsk_like(8192, 1);
    group.throughput(Throughput::Elements(signal.len() as u64));

    for mode in [ScdMode::Coarse, ScdMode::CyclicResolved, ScdMode::FamFull] {
        for parallel in [false, true] {
            let estimator = FamEstimator::new(
                ScdConfig::builder()
                    .window_size(64)
                    .step(16)
                    .mode(mode)
                    .parallel(parallel)
                    .build(),
            )
            .unwrap();
            let id = format!("{:?}/{}", mode, if parallel { "par" } else { "seq" });
            group.bench_function(id, |b| b.iter(|| estimator.estimate(black_box(&signal))));
        }
    }

    group.finish();
}

// ============================================================================
// Cyclic-lag CCSD
// ============================================================================

fn bench_ccsd_window_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ccsd_window");

    let signal = bpsk_like(16384, 2);
    group.throughput(Throughput::Elements(signal.len() as u64));

    for ws in [64usize, 128, 256] {
        for parallel in [false, true] {
            let estimator = CcsdEstimator::new(
                CcsdConfig::builder()
                    .window_size(ws)
                    .step(ws)
                    .parallel(parallel)
                    .build(),
            )
            .unwrap();
            let label = if parallel { "par" } else { "seq" };
            group.bench_with_input(BenchmarkId::new(label, ws), &ws, |b, _| {
                b.iter(|| estimator.estimate(black_box(&signal)))
            });
        }
    }

    group.finish();
}

// ============================================================================
// Batch drivers
// ============================================================================

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.measurement_time(Duration::from_secs(5));

    let rows = 16;
    let len = 4096;
    let data: Vec<Complex64> = (0..rows).flat_map(|r| bpsk_like(len, r as u64)).collect();
    let batch = Array2::from_shape_vec((rows, len), data).unwrap();
    group.throughput(Throughput::Elements((rows * len) as u64));

    group.bench_function("scd_coarse", |b| {
        b.iter(|| batch_scd(black_box(batch.view().into_dyn()), 64, 16, true, ScdMode::Coarse))
    });
    group.bench_function("chtc", |b| {
        b.iter(|| {
            batch_ccsd(
                black_box(batch.view().into_dyn()),
                128,
                128,
                1.0,
                Kernel::TanhProduct,
                Boundary::WrapToNextBlock,
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_fam_modes, bench_ccsd_window_sizes, bench_batch);
criterion_main!(benches);
