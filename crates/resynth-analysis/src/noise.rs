//! Stochastic residual modelling.
//!
//! The final residual is described by a sequence of [`SpectralEnvelope`]s
//! sampled at a fixed rate. Rendering synthesizes a random-phase spectrum per
//! envelope frame, windows it and overlap-adds it, normalizing every output
//! sample by the root of the summed squared window so the noise level does
//! not depend on the overlap.

use resynth_core::{CancellationToken, DspContext, Fft, RatioPoint, Result};

use crate::RenderOptions;
use crate::envelope::{RAYLEIGH_MEDIAN_TO_RMS, SpectralEnvelope};
use crate::params::NoiseParams;
use crate::stft::{FrameLayout, Stft};

/// Noise envelopes over time.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseModel {
    envelopes: Vec<RatioPoint<SpectralEnvelope>>,
    layout: FrameLayout,
    sample_rate: u32,
    length: usize,
    wave: Vec<f32>,
}

impl NoiseModel {
    /// Frame geometry for a sample rate: the hop follows the sampling
    /// frequency, and the window is the smallest power of two whose
    /// effective Hann width covers one hop.
    pub fn layout(ctx: &DspContext, sample_rate: u32, params: &NoiseParams) -> Result<FrameLayout> {
        let hop = params.hop_size(sample_rate);
        // Tolerate table rounding so an exact multiple does not spill into the next power.
        let window = (hop as f64 / ctx.hann().effective_ratio() - 1e-3).ceil() as usize;
        FrameLayout::new(window.next_power_of_two().max(4), hop)
    }

    /// Describe `residual` and render it once at neutral options.
    pub fn analyze(
        ctx: &mut DspContext,
        residual: Vec<f32>,
        sample_rate: u32,
        params: &NoiseParams,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        params.validate(sample_rate)?;
        let layout = Self::layout(ctx, sample_rate, params)?;
        let length = residual.len();
        let mut model = Self {
            envelopes: Vec::new(),
            layout,
            sample_rate,
            length,
            wave: Vec::new(),
        };
        if length == 0 {
            return Ok(model);
        }

        let stft = Stft::new(ctx, layout)?;
        let scale = RAYLEIGH_MEDIAN_TO_RMS / stft.window_power().sqrt();
        let frame_count = layout.frame_count(length);
        let mut envelopes = Vec::with_capacity(frame_count);
        for h in 0..frame_count {
            cancel.check()?;
            let bins = stft.analyze_frame(&residual, h, cancel)?;
            let envelope = SpectralEnvelope::analyze(ctx, &bins, scale, sample_rate, cancel)?;
            envelopes.push(RatioPoint::new(envelope, layout.position_of(h, length)));
        }
        model.envelopes = envelopes;
        model.wave = model.render(ctx, RenderOptions::default(), cancel)?;
        tracing::debug!(
            envelopes = model.envelopes.len(),
            hop = layout.hop_size(),
            window = layout.window_size(),
            "noise envelopes extracted"
        );
        Ok(model)
    }

    /// Synthesize noise following the envelopes.
    ///
    /// The output length is the note length times `time_factor`; envelope
    /// positions stretch with it. `pitch_factor` shifts the envelopes.
    pub fn render(
        &self,
        ctx: &mut DspContext,
        options: RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let len = options.stretched_length(self.length);
        let mut output = vec![0.0f32; len];
        if len == 0 || self.envelopes.is_empty() {
            return Ok(output);
        }
        let semitones = ctx
            .logarithm()
            .semitones_of_ratio(options.pitch_factor.max(f32::MIN_POSITIVE)) as f32;
        let envelopes: Vec<RatioPoint<SpectralEnvelope>> = if semitones.abs() < 1e-3 {
            self.envelopes.clone()
        } else {
            self.envelopes
                .iter()
                .map(|p| RatioPoint::new(p.value.transposed(semitones), p.position))
                .collect()
        };

        let n = self.layout.fft_size();
        let window = ctx.hann().coefficients(n);
        let fft = Fft::new(n)?;
        let gain = (n as f32).sqrt();
        let hop = self.layout.hop_size();
        let mut power = vec![0.0f32; len];

        for m in 0..=len / hop {
            cancel.check()?;
            let centre = m * hop;
            let envelope = envelope_at(&envelopes, centre as f64 / len as f64);
            let spectrum = envelope.synthesize(ctx, n, self.sample_rate, gain, cancel)?;
            let frame = fft.inverse_real(&spectrum, cancel)?;
            let start = centre as isize - (n / 2) as isize;
            for (i, (&x, &w)) in frame.iter().zip(&window).enumerate() {
                let index = start + i as isize;
                if index < 0 || index as usize >= len {
                    continue;
                }
                output[index as usize] += x * w;
                power[index as usize] += w * w;
            }
        }
        for (sample, p) in output.iter_mut().zip(&power) {
            *sample = if *p > 1e-6 { *sample / p.sqrt() } else { 0.0 };
        }
        Ok(output)
    }

    /// Blend two models, `ratio` 0 = `a`, 1 = `b`.
    ///
    /// Envelopes are sampled at `a`'s positions. The stored waveform is left
    /// empty until rendered.
    pub fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        let envelopes = a
            .envelopes
            .iter()
            .map(|p| {
                let other = envelope_at(&b.envelopes, p.position);
                RatioPoint::new(SpectralEnvelope::interpolate(&p.value, &other, ratio), p.position)
            })
            .collect();
        Self {
            envelopes,
            layout: a.layout,
            sample_rate: a.sample_rate,
            length: resynth_core::math::lerp_i64(a.length as i64, b.length as i64, f64::from(ratio))
                .max(0) as usize,
            wave: Vec::new(),
        }
    }

    /// Copy with every envelope shifted by `semitones`.
    pub fn transposed(&self, semitones: f32) -> Self {
        Self {
            envelopes: self
                .envelopes
                .iter()
                .map(|p| RatioPoint::new(p.value.transposed(semitones), p.position))
                .collect(),
            wave: Vec::new(),
            ..self.clone()
        }
    }

    /// Envelope frames.
    pub fn envelopes(&self) -> &[RatioPoint<SpectralEnvelope>] {
        &self.envelopes
    }

    /// Frame geometry.
    pub fn frame_layout(&self) -> FrameLayout {
        self.layout
    }

    /// Waveform rendered at analysis time (empty for derived models).
    pub fn wave(&self) -> &[f32] {
        &self.wave
    }

    /// Note length in samples.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the model has no envelope frames.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}

/// Envelope at `position`, interpolated between the bracketing frames.
fn envelope_at(envelopes: &[RatioPoint<SpectralEnvelope>], position: f64) -> SpectralEnvelope {
    match resynth_core::ratio::bracket(envelopes, position) {
        Some((lo, hi, t)) if lo != hi => {
            SpectralEnvelope::interpolate(&envelopes[lo].value, &envelopes[hi].value, t as f32)
        }
        Some((lo, _, _)) => envelopes[lo].value.clone(),
        None => SpectralEnvelope::from_amplitudes(Vec::new(), 0.0),
    }
}
