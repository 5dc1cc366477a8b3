//! Per-note decomposition.
//!
//! A note is split in three stages, each taking ownership of the previous
//! stage's residual: transients first, then sinusoids, and whatever remains
//! is described as noise.

use resynth_core::{CancellationToken, DspContext, Result};

use crate::noise::NoiseModel;
use crate::params::ModelParams;
use crate::sinusoid::SinusoidModel;
use crate::transient::TransientModel;

/// Pitch and duration factors applied when rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Frequency multiplier.
    pub pitch_factor: f32,
    /// Duration multiplier.
    pub time_factor: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pitch_factor: 1.0,
            time_factor: 1.0,
        }
    }
}

impl RenderOptions {
    /// Rendered length of a `len`-sample note.
    pub fn stretched_length(&self, len: usize) -> usize {
        (len as f64 * self.time_factor.max(0.0)).round() as usize
    }
}

/// A note range of an input wave, as position ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpan {
    /// Scale step (MIDI note number) of the note.
    pub note_number: u8,
    /// Start ratio in `[0, 1]`.
    pub start: f64,
    /// End ratio in `[0, 1]`.
    pub end: f64,
}

/// The three models of one note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteModels {
    note_number: u8,
    sample_rate: u32,
    length: usize,
    params: ModelParams,
    transient: TransientModel,
    sinusoid: SinusoidModel,
    noise: NoiseModel,
}

impl NoteModels {
    /// Decompose `samples` into transient, sinusoid and noise models.
    pub fn build(
        ctx: &mut DspContext,
        samples: Vec<f32>,
        sample_rate: u32,
        note_number: u8,
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        params.validate(sample_rate)?;
        let length = samples.len();
        tracing::debug!(note_number, length, sample_rate, "analysing note");

        let (transient, residual) =
            TransientModel::analyze(ctx, samples, &params.transient, cancel)?;
        let (sinusoid, residual) =
            SinusoidModel::analyze(ctx, residual, sample_rate, &params.sinusoid, cancel)?;
        let noise = NoiseModel::analyze(ctx, residual, sample_rate, &params.noise, cancel)?;

        tracing::info!(
            note_number,
            transient_frames = transient.transient_frames().len(),
            trajectories = sinusoid.trajectories().len(),
            envelopes = noise.envelopes().len(),
            "note models built"
        );
        Ok(Self {
            note_number,
            sample_rate,
            length,
            params: *params,
            transient,
            sinusoid,
            noise,
        })
    }

    /// Sum of the three model renders.
    ///
    /// The transient is not time-stretched; it starts at the beginning of
    /// the output and is cut at its end.
    pub fn render(
        &self,
        ctx: &mut DspContext,
        options: RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let mut output = self.sinusoid.render(ctx, options, cancel)?;
        let noise = self.noise.render(ctx, options, cancel)?;
        for (sample, n) in output.iter_mut().zip(&noise) {
            *sample += n;
        }
        cancel.check()?;
        let transient = self.transient.render(options.pitch_factor);
        for (sample, t) in output.iter_mut().zip(&transient) {
            *sample += t;
        }
        Ok(output)
    }

    /// Copy transposed by `semitones`, becoming note `note_number + semitones`.
    pub fn transposed(&self, ctx: &DspContext, semitones: i32) -> Self {
        let factor = ctx.logarithm().ratio_of_semitones(f64::from(semitones));
        let note_number = (i32::from(self.note_number) + semitones).clamp(0, 127) as u8;
        Self {
            note_number,
            transient: self.transient.transposed(factor),
            sinusoid: self.sinusoid.scaled(factor),
            noise: self.noise.transposed(semitones as f32),
            ..self.clone()
        }
    }

    /// Blend two notes already transposed to the same pitch, `ratio` 0 = `a`.
    ///
    /// The transient of the nearer note is kept as is.
    pub fn interpolate(ctx: &DspContext, a: &Self, b: &Self, ratio: f32) -> Self {
        let range = a.params.sinusoid.continuation_range;
        let transient = if ratio < 0.5 { &a.transient } else { &b.transient };
        let sinusoid = SinusoidModel::interpolate(ctx, &a.sinusoid, &b.sinusoid, ratio, range);
        let length = sinusoid.len();
        Self {
            note_number: a.note_number,
            sample_rate: a.sample_rate,
            length,
            params: a.params,
            transient: transient.clone(),
            sinusoid,
            noise: NoiseModel::interpolate(&a.noise, &b.noise, ratio),
        }
    }

    /// Scale step of the note.
    pub fn note_number(&self) -> u8 {
        self.note_number
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the analysed note in samples.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the note had no samples.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Parameters the note was analysed with.
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Transient model.
    pub fn transient(&self) -> &TransientModel {
        &self.transient
    }

    /// Sinusoid model.
    pub fn sinusoid(&self) -> &SinusoidModel {
        &self.sinusoid
    }

    /// Noise model.
    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretched_length_rounds() {
        let options = RenderOptions {
            pitch_factor: 1.0,
            time_factor: 1.5,
        };
        assert_eq!(options.stretched_length(101), 152);
        assert_eq!(RenderOptions::default().stretched_length(77), 77);
    }
}
