//! Criterion benchmarks for resynth-analysis
//!
//! Run with: cargo bench -p resynth-analysis
#![allow(missing_docs)]

use std::f32::consts::PI;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use resynth_analysis::{
    FrameLayout, ModelParams, NoteModels, PeakOptions, RenderOptions, Spectrum, Stft,
};
use resynth_core::{CacheSet, CancellationToken, DspContext};

const SAMPLE_RATE: u32 = 44100;

/// Harmonic test tone with decaying partials
fn generate_note(size: usize, frequency: f32) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (1..=6)
                .map(|k| (2.0 * PI * frequency * k as f32 * t).sin() * 0.4 / k as f32)
                .sum()
        })
        .collect()
}

fn context() -> DspContext {
    DspContext::with_seed(Arc::new(CacheSet::generate()), 1)
}

fn bench_peak_picking(c: &mut Criterion) {
    let mut group = c.benchmark_group("PeakPicking");
    let ctx = context();
    let cancel = CancellationToken::new();

    for &size in &[1024usize, 2048, 4096] {
        let frame = generate_note(size, 440.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let spectrum = Spectrum::analyze(
                    &ctx,
                    black_box(&frame),
                    SAMPLE_RATE,
                    PeakOptions::default(),
                    &cancel,
                );
                black_box(spectrum)
            })
        });
    }

    group.finish();
}

fn bench_stft(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stft");
    let ctx = context();
    let cancel = CancellationToken::new();
    let signal = generate_note(SAMPLE_RATE as usize, 220.0);

    for &(window, hop) in &[(512usize, 128usize), (2048, 256)] {
        let Ok(layout) = FrameLayout::new(window, hop) else {
            continue;
        };
        let Ok(stft) = Stft::new(&ctx, layout) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("analyze", window), |b| {
            b.iter(|| black_box(stft.analyze(black_box(&signal), &cancel)))
        });
    }

    group.finish();
}

fn bench_note(c: &mut Criterion) {
    let mut group = c.benchmark_group("Note");
    group.sample_size(10);
    let cancel = CancellationToken::new();
    let params = ModelParams::default();
    let signal = generate_note(SAMPLE_RATE as usize / 2, 330.0);

    group.bench_function("build", |b| {
        let mut ctx = context();
        b.iter(|| {
            let note = NoteModels::build(
                &mut ctx,
                black_box(signal.clone()),
                SAMPLE_RATE,
                64,
                &params,
                &cancel,
            );
            black_box(note)
        })
    });

    let mut ctx = context();
    if let Ok(note) = NoteModels::build(&mut ctx, signal.clone(), SAMPLE_RATE, 64, &params, &cancel)
    {
        let options = RenderOptions {
            pitch_factor: 1.5,
            time_factor: 2.0,
        };
        group.bench_function("render", |b| {
            b.iter(|| black_box(note.render(&mut ctx, options, &cancel)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_peak_picking, bench_stft, bench_note);
criterion_main!(benches);
