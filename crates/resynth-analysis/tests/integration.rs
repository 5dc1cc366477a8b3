//! Integration tests for resynth-analysis.
//!
//! Tests drive the public API with synthetic signals of known content:
//! pure tones, tone pairs, clicks and white noise.

use std::f32::consts::PI;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use resynth_analysis::{
    Instrument, ModelParams, NoteModels, NoteSpan, PeakOptions, RenderOptions, SinusoidModel,
    SinusoidParams, Spectrum, TaskKind, TaskScheduler, TransientModel, TransientParams,
};
use resynth_core::{CacheSet, CancellationToken, DspContext, Error, Wave};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 44100;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn context(seed: u64) -> DspContext {
    // RUST_LOG=resynth_analysis=debug shows the pipeline stages.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_test_writer()
        .try_init();
    DspContext::with_seed(Arc::new(CacheSet::generate()), seed)
}

/// Sine at `freq_hz` with peak `amplitude`.
fn sine(freq_hz: f32, amplitude: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Silence with a 64-sample uniform noise burst starting at `at`.
fn click(num_samples: usize, at: usize, level: f32) -> Vec<f32> {
    let mut rng = Pcg32::seed_from_u64(99);
    let mut signal = vec![0.0; num_samples];
    for sample in &mut signal[at..at + 64] {
        *sample = rng.gen_range(-level..level);
    }
    signal
}

fn energy(signal: &[f32]) -> f32 {
    signal.iter().map(|x| x * x).sum()
}

fn rms(signal: &[f32]) -> f32 {
    (energy(signal) / signal.len() as f32).sqrt()
}

// ---------------------------------------------------------------------------
// Peak picking
// ---------------------------------------------------------------------------

#[test]
fn pure_tone_yields_one_accurate_peak() {
    let ctx = context(1);
    let cancel = CancellationToken::new();
    for (freq, amplitude) in [(1000.0, 0.5), (440.0, 0.8), (5123.4, 0.25)] {
        let signal = sine(freq, amplitude, 8192);
        let spectrum =
            Spectrum::analyze(&ctx, &signal, SAMPLE_RATE, PeakOptions::default(), &cancel)
                .unwrap();
        assert_eq!(spectrum.len(), 1, "{freq} Hz: {:?}", spectrum.units());
        let peak = spectrum.units()[0];
        assert!(
            (peak.frequency - freq).abs() < 0.5,
            "{freq} Hz detected at {}",
            peak.frequency
        );
        assert!(
            (peak.amplitude - amplitude).abs() < 0.02 * amplitude,
            "{freq} Hz amplitude {} vs {amplitude}",
            peak.amplitude
        );
        assert_eq!(spectrum.fundamental(), Some(peak));
    }
}

// ---------------------------------------------------------------------------
// Sinusoid tracking
// ---------------------------------------------------------------------------

#[test]
fn tracker_keeps_distant_partials_apart() {
    let mut ctx = context(2);
    let cancel = CancellationToken::new();
    let len = 13230;
    // Two semitones apart: 1000 Hz (step 83.21) and 1122.46 Hz (step 85.21)
    let signal = mix(&sine(1000.0, 0.4, len), &sine(1122.46, 0.4, len));
    let (model, _) =
        SinusoidModel::analyze(&mut ctx, signal, SAMPLE_RATE, &SinusoidParams::default(), &cancel)
            .unwrap();

    let targets = [83.21f32, 85.21];
    let mut strong = 0;
    for trajectory in model.trajectories() {
        if trajectory.peak_amplitude() < 0.1 {
            continue;
        }
        strong += 1;
        let voiced: Vec<f32> = trajectory
            .points()
            .iter()
            .filter(|p| p.value.amplitude >= 0.1)
            .map(|p| p.value.step(&ctx))
            .collect();
        let nearest = |step: f32| {
            if (step - targets[0]).abs() < (step - targets[1]).abs() {
                0
            } else {
                1
            }
        };
        let owner = nearest(voiced[0]);
        for step in voiced {
            assert_eq!(nearest(step), owner, "trajectory jumped between partials");
            assert!((step - targets[owner]).abs() < 0.2, "step {step}");
        }
    }
    assert!(strong >= 2, "expected both partials, found {strong}");
}

#[test]
fn steady_tone_becomes_one_trajectory() {
    let mut ctx = context(3);
    let cancel = CancellationToken::new();
    let (model, residual) = SinusoidModel::analyze(
        &mut ctx,
        sine(440.0, 0.5, 22050),
        SAMPLE_RATE,
        &SinusoidParams::default(),
        &cancel,
    )
    .unwrap();
    let strong: Vec<_> = model
        .trajectories()
        .iter()
        .filter(|t| t.peak_amplitude() > 0.1)
        .collect();
    assert_eq!(strong.len(), 1);
    assert_eq!(model.hop_count(), 22050 / 256 + 1);
    assert_eq!(residual.len(), 22050);
}

#[test]
fn stationary_partials_reconstruct_within_tolerance() {
    let mut ctx = context(12);
    let cancel = CancellationToken::new();
    let params = SinusoidParams::default();
    let len = 22050;
    let tones = mix(&sine(440.0, 0.3, len), &sine(1320.0, 0.2, len));
    let (model, residual) =
        SinusoidModel::analyze(&mut ctx, tones.clone(), SAMPLE_RATE, &params, &cancel).unwrap();
    let rendered = model.render(&ctx, RenderOptions::default(), &cancel).unwrap();
    assert_eq!(rendered.len(), len);

    // Edge frames see a partial window, so compare the interior only.
    let interior = params.window_size..len - params.window_size;
    let input_energy = energy(&tones[interior.clone()]);
    let residual_db = 10.0 * (energy(&residual[interior.clone()]) / input_energy).log10();
    assert!(residual_db < -20.0, "residual at {residual_db:.1} dB");

    let level_db = 20.0 * (rms(&rendered[interior.clone()]) / rms(&tones[interior])).log10();
    assert!(level_db.abs() < 1.0, "rendered level off by {level_db:.2} dB");

    // Phases are free, so compare the partial amplitudes of the render.
    let middle = &rendered[len / 2 - 2048..len / 2 + 2048];
    let measured = Spectrum::analyze_fixed(&ctx, middle, SAMPLE_RATE, &[440.0, 1320.0], &cancel)
        .unwrap();
    assert_eq!(measured.len(), 2);
    for (unit, expected) in measured.units().iter().zip([0.3f32, 0.2]) {
        let error_db = 20.0 * (unit.amplitude / expected).log10();
        assert!(
            error_db.abs() < 1.0,
            "{} Hz rendered {:.2} dB off",
            unit.frequency,
            error_db
        );
    }
}

// ---------------------------------------------------------------------------
// Transients
// ---------------------------------------------------------------------------

#[test]
fn click_is_flagged_and_steady_tone_is_not() {
    let ctx = context(4);
    let cancel = CancellationToken::new();
    let params = TransientParams::default();
    let len = 22050;

    let clicked = click(len, 11025, 0.8);
    let (transient, residual) =
        TransientModel::analyze(&ctx, clicked.clone(), &params, &cancel).unwrap();
    assert!(!transient.is_empty());
    assert!(
        transient
            .transient_frames()
            .iter()
            .any(|&h| (h * params.hop_size).abs_diff(11025) <= 256),
        "flagged frames {:?}",
        transient.transient_frames()
    );
    // Whole-frame split: transient plus residual gives back the input.
    for (i, ((x, t), r)) in clicked.iter().zip(transient.wave()).zip(&residual).enumerate() {
        assert!((x - (t + r)).abs() < 1e-3, "sample {i}");
    }

    // 689.0625 Hz completes exactly two cycles per hop, so interior frames
    // have identical magnitudes.
    let amplitude = rms(&clicked) * 2f32.sqrt();
    let tone = sine(689.0625, amplitude, len);
    let (steady, _) = TransientModel::analyze(&ctx, tone, &params, &cancel).unwrap();
    let frames = len / params.hop_size + 1;
    let edge = params.window_size / params.hop_size + 2 * params.adjacency;
    for &h in steady.transient_frames() {
        assert!(
            h < edge || h >= frames - edge,
            "interior frame {h} of a steady tone flagged"
        );
    }
}

// ---------------------------------------------------------------------------
// Whole pipeline
// ---------------------------------------------------------------------------

#[test]
fn decomposition_preserves_energy() {
    let mut ctx = context(5);
    let cancel = CancellationToken::new();
    let len = 22050;
    let tones = mix(&sine(440.0, 0.3, len), &sine(1320.0, 0.2, len));
    let signal = mix(&tones, &click(len, 8000, 0.8));

    let note = NoteModels::build(
        &mut ctx,
        signal.clone(),
        SAMPLE_RATE,
        69,
        &ModelParams::default(),
        &cancel,
    )
    .unwrap();
    assert_eq!(note.len(), len);
    assert!(!note.sinusoid().is_empty());

    let rendered = note.render(&mut ctx, RenderOptions::default(), &cancel).unwrap();
    assert_eq!(rendered.len(), len);
    let (original, resynthesized) = (energy(&signal), energy(&rendered));
    assert!(
        (resynthesized / original - 1.0).abs() < 0.35,
        "energy {resynthesized} vs {original}"
    );

    // The noise stage only sees what the sinusoids left over.
    assert!(energy(note.noise().wave()) < 0.2 * original);
}

#[test]
fn pitch_factor_transposes_the_render() {
    let mut ctx = context(6);
    let cancel = CancellationToken::new();
    let note = NoteModels::build(
        &mut ctx,
        sine(440.0, 0.5, 22050),
        SAMPLE_RATE,
        69,
        &ModelParams::default(),
        &cancel,
    )
    .unwrap();

    let options = RenderOptions {
        pitch_factor: 2.0,
        time_factor: 1.5,
    };
    let rendered = note.render(&mut ctx, options, &cancel).unwrap();
    assert_eq!(rendered.len(), 33075);

    let middle = &rendered[12000..12000 + 8192];
    let spectrum =
        Spectrum::analyze(&ctx, middle, SAMPLE_RATE, PeakOptions::default(), &cancel).unwrap();
    let fundamental = spectrum.fundamental().unwrap();
    assert!(
        (fundamental.frequency - 880.0).abs() < 2.0,
        "fundamental at {}",
        fundamental.frequency
    );
}

#[test]
fn build_aborts_when_cancelled() {
    let mut ctx = context(7);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = NoteModels::build(
        &mut ctx,
        sine(440.0, 0.5, 8192),
        SAMPLE_RATE,
        69,
        &ModelParams::default(),
        &cancel,
    );
    assert_eq!(result.unwrap_err(), Error::Cancelled);
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut ctx = context(8);
    let cancel = CancellationToken::new();
    let mut params = ModelParams::default();
    params.sinusoid.hop_size = 0;
    let result = NoteModels::build(&mut ctx, vec![0.0; 1024], SAMPLE_RATE, 60, &params, &cancel);
    assert!(matches!(result, Err(Error::InvalidParameter { .. })));
}

#[test]
fn scheduler_cancels_a_running_build() {
    let mut scheduler = TaskScheduler::new();
    let caches = Arc::new(CacheSet::generate());

    let long = {
        let caches = Arc::clone(&caches);
        scheduler.spawn(TaskKind::WaveConversion, move |cancel| {
            let mut ctx = DspContext::with_seed(caches, 1);
            NoteModels::build(
                &mut ctx,
                sine(440.0, 0.5, 44100 * 20),
                SAMPLE_RATE,
                69,
                &ModelParams::default(),
                cancel,
            )
        })
    };
    let replacement = scheduler.spawn(TaskKind::WaveConversion, |_| Ok(()));

    assert_eq!(long.join().unwrap_err(), Error::Cancelled);
    assert!(replacement.join().is_ok());
}

// ---------------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------------

fn two_note_instrument(ctx: &DspContext) -> Instrument {
    let half = 22050;
    let mut samples = sine(440.0, 0.5, half);
    samples.extend(sine(880.0, 0.5, half));
    let wave = Wave::mono(samples, SAMPLE_RATE).unwrap();
    let spans = [
        NoteSpan {
            note_number: 69,
            start: 0.0,
            end: 0.5,
        },
        NoteSpan {
            note_number: 81,
            start: 0.5,
            end: 1.0,
        },
    ];
    Instrument::analyze(
        ctx,
        &wave,
        &spans,
        &ModelParams::default(),
        &CancellationToken::new(),
    )
    .unwrap()
}

fn loudest_step(ctx: &DspContext, note: &NoteModels) -> f32 {
    note.sinusoid()
        .trajectories()
        .iter()
        .max_by(|a, b| a.peak_amplitude().total_cmp(&b.peak_amplitude()))
        .map(|t| t.mean_step(ctx))
        .unwrap()
}

#[test]
fn instrument_generates_missing_notes() {
    let ctx = context(9);
    let instrument = two_note_instrument(&ctx);
    assert_eq!(instrument.len(), 2);
    assert!(instrument.note(69).is_some());

    let between = instrument.generate_note(&ctx, 75).unwrap();
    assert_eq!(between.note_number(), 75);
    assert!((loudest_step(&ctx, &between) - 75.0).abs() < 0.1);

    let above = instrument.generate_note(&ctx, 90).unwrap();
    assert!((loudest_step(&ctx, &above) - 90.0).abs() < 0.1);

    let exact = instrument.generate_note(&ctx, 81).unwrap();
    assert_eq!(Some(&exact), instrument.note(81));

    assert!(Instrument::new().generate_note(&ctx, 60).is_none());
}

#[test]
fn instrument_renders_generated_notes() {
    let mut ctx = context(10);
    let instrument = two_note_instrument(&ctx);
    let cancel = CancellationToken::new();
    let rendered = instrument
        .render_note(&mut ctx, 72, RenderOptions::default(), &cancel)
        .unwrap()
        .unwrap();
    assert_eq!(rendered.len(), 22050);
    assert!(rms(&rendered) > 0.1);
}
