//! Criterion benchmarks for live chain surgery
//!
//! Measures:
//! - Full session toggle churn over the topology graph
//! - Render throughput as the active chain grows
//! - Mono downmix splice cost

use busker_benchmarks::stereo_sine;
use busker_core::domain::audio::SampleRate;
use busker_core::domain::filter::FilterKind;
use busker_core::domain::graph::EdgeListGraph;
use busker_core::domain::preset::EqPreset;
use busker_core::domain::session::Session;
use busker_infra::audio::graph::ProcessGraph;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::{Arc, Mutex};

const RATE: u32 = 48000;

fn bench_session_toggle_churn(c: &mut Criterion) {
    c.bench_function("session_toggle_churn", |b| {
        let graph = Arc::new(Mutex::new(EdgeListGraph::new()));
        let mut session =
            Session::start(Arc::clone(&graph), EqPreset::neutral(), SampleRate::Hz48000).unwrap();
        b.iter(|| {
            for kind in FilterKind::ALL {
                session.set_filter_enabled(kind, true);
            }
            for kind in FilterKind::ALL {
                session.set_filter_enabled(kind, false);
            }
            black_box(session.active_kinds().len());
        });
    });
}

fn bench_render_by_chain_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_512_frames");

    for active in [0usize, 1, 3, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(active), &active, |b, &active| {
            let graph = Arc::new(Mutex::new(ProcessGraph::new(RATE)));
            let mut session = Session::start(
                Arc::clone(&graph),
                EqPreset::neutral(),
                SampleRate::from_hz(RATE),
            )
            .unwrap();
            for &kind in FilterKind::ALL.iter().take(active) {
                session.set_filter_enabled(kind, true);
            }

            let input = stereo_sine(440.0, RATE, 512);
            let mut output = vec![0.0; input.len()];
            b.iter(|| {
                graph
                    .lock()
                    .unwrap()
                    .render(black_box(&input), black_box(&mut output))
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_mono_splice(c: &mut Criterion) {
    c.bench_function("mono_splice_toggle", |b| {
        let graph = Arc::new(Mutex::new(EdgeListGraph::new()));
        let mut session =
            Session::start(Arc::clone(&graph), EqPreset::bass_boost(), SampleRate::Hz48000)
                .unwrap();
        b.iter(|| {
            session.set_mono(true, 1.0);
            session.set_mono(false, 1.0);
        });
    });
}

criterion_group!(
    benches,
    bench_session_toggle_churn,
    bench_render_by_chain_length,
    bench_mono_splice
);
criterion_main!(benches);
