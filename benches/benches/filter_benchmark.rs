//! Criterion benchmarks for biquad filter performance
//!
//! Measures:
//! - Per-kind block processing throughput
//! - Buffer size sensitivity
//! - Coefficient recomputation cost (live parameter updates)

use busker_benchmarks::{peak, stereo_sine};
use busker_core::domain::filter::{BiquadCoeffs, BiquadFilter, FilterKind, FilterParams};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const RATE: f32 = 48000.0;

fn bench_params() -> FilterParams {
    FilterParams {
        frequency: 1000.0,
        q: 1.0,
        gain_db: 6.0,
    }
}

fn bench_process_by_kind(c: &mut Criterion) {
    let mut group = c.benchmark_group("biquad_kind_512");

    for kind in FilterKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            let mut filter =
                BiquadFilter::new(BiquadCoeffs::for_kind(kind, RATE, bench_params()));
            let mut buffer = stereo_sine(440.0, RATE as u32, 256);
            b.iter(|| {
                filter.process(black_box(&mut buffer));
                black_box(peak(&buffer));
            });
        });
    }

    group.finish();
}

fn bench_process_by_buffer_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("biquad_buffer_size");

    for frames in [64usize, 256, 1024, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let mut filter = BiquadFilter::new(BiquadCoeffs::lowpass(RATE, 1000.0, 0.707));
            let mut buffer = stereo_sine(440.0, RATE as u32, frames);
            b.iter(|| {
                filter.process(black_box(&mut buffer));
            });
        });
    }

    group.finish();
}

fn bench_coefficient_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("coefficient_recompute");

    for kind in [FilterKind::Lowpass, FilterKind::Bandpass, FilterKind::Peaking] {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            let mut frequency = 100.0;
            b.iter(|| {
                // Sweep the corner the way a UI slider would
                frequency = if frequency > 10000.0 { 100.0 } else { frequency * 1.01 };
                black_box(BiquadCoeffs::for_kind(
                    kind,
                    RATE,
                    FilterParams {
                        frequency,
                        q: 1.0,
                        gain_db: 3.0,
                    },
                ));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_process_by_kind,
    bench_process_by_buffer_size,
    bench_coefficient_recompute
);
criterion_main!(benches);
