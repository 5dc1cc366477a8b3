//! Transient extraction by per-bin spectral flux.
//!
//! For every frame `h` and bin `k` the half-wave rectified magnitude changes
//! towards the previous and the next frame are added, then summed over the
//! `adjacency` bins on either side. A bin is flagged when this flux exceeds
//! `strength` times its mean over the `adjacency` frames on either side, and
//! is above an absolute floor. A frame with more than `flag_ratio` of its
//! bins flagged is a transient frame: its whole spectrum moves to the
//! transient output and the other frames stay in the residual.

use resynth_core::{CancellationToken, Complex, DspContext, Result, lerp};

use crate::params::TransientParams;
use crate::stft::{FrameLayout, Stft};

/// Per-frame transient flags from frame magnitudes.
///
/// `magnitudes[h][k]` holds the scaled magnitude of bin `k` of frame `h`.
/// Neighbours outside the frame range count as unchanged.
pub fn detect_transient_frames(
    magnitudes: &[Vec<f32>],
    params: &TransientParams,
    flux_floor: f32,
    cancel: &CancellationToken,
) -> Result<Vec<bool>> {
    let frames = magnitudes.len();
    let Some(bins) = magnitudes.first().map(Vec::len) else {
        return Ok(Vec::new());
    };
    let adjacency = params.adjacency;

    // Rectified change towards both neighbours.
    let mut change = vec![vec![0.0f32; bins]; frames];
    for h in 0..frames {
        cancel.check()?;
        for k in 0..bins {
            let current = magnitudes[h][k];
            let previous = if h > 0 { magnitudes[h - 1][k] } else { current };
            let next = magnitudes.get(h + 1).map_or(current, |m| m[k]);
            change[h][k] = (current - previous).max(0.0) + (current - next).max(0.0);
        }
    }

    let mut flux = vec![vec![0.0f32; bins]; frames];
    for h in 0..frames {
        cancel.check()?;
        for k in 0..bins {
            let lo = k.saturating_sub(adjacency);
            let hi = (k + adjacency).min(bins - 1);
            flux[h][k] = change[h][lo..=hi].iter().sum();
        }
    }

    let mut flags = Vec::with_capacity(frames);
    for h in 0..frames {
        cancel.check()?;
        let lo = h.saturating_sub(adjacency);
        let hi = (h + adjacency).min(frames - 1);
        let span = (hi - lo + 1) as f32;
        let mut flagged = 0usize;
        for k in 0..bins {
            let mean = flux[lo..=hi].iter().map(|f| f[k]).sum::<f32>() / span;
            let f = flux[h][k];
            if f > params.strength * mean && f > flux_floor {
                flagged += 1;
            }
        }
        flags.push(flagged as f32 / bins as f32 > params.flag_ratio);
    }
    Ok(flags)
}

/// The percussive part of a note.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientModel {
    wave: Vec<f32>,
    transposable: bool,
    frames: Vec<usize>,
}

impl TransientModel {
    /// Model holding a ready waveform.
    pub fn from_wave(wave: Vec<f32>, transposable: bool) -> Self {
        Self {
            wave,
            transposable,
            frames: Vec::new(),
        }
    }

    /// Split `samples` into transient and residual.
    pub fn analyze(
        ctx: &DspContext,
        samples: Vec<f32>,
        params: &TransientParams,
        cancel: &CancellationToken,
    ) -> Result<(Self, Vec<f32>)> {
        params.validate()?;
        let length = samples.len();
        if length == 0 {
            return Ok((Self::from_wave(Vec::new(), params.transposable), samples));
        }

        let layout = FrameLayout::new(params.window_size, params.hop_size)?;
        let stft = Stft::new(ctx, layout)?;
        let spectra = stft.analyze(&samples, cancel)?;
        let scale = stft.amplitude_scale();
        let bins = layout.bin_count();
        let magnitudes: Vec<Vec<f32>> = spectra
            .iter()
            .map(|frame| frame[..bins].iter().map(|c| c.norm() * scale).collect())
            .collect();
        let floor = ctx.decibel().pcm_of(params.flux_floor_decibel);
        let flags = detect_transient_frames(&magnitudes, params, floor, cancel)?;

        let silent = vec![Complex::new(0.0, 0.0); layout.fft_size()];
        let mut transient_frames = Vec::with_capacity(spectra.len());
        let mut residual_frames = Vec::with_capacity(spectra.len());
        for (frame, &flag) in spectra.into_iter().zip(&flags) {
            if flag {
                transient_frames.push(frame);
                residual_frames.push(silent.clone());
            } else {
                transient_frames.push(silent.clone());
                residual_frames.push(frame);
            }
        }
        let frames: Vec<usize> = (0..flags.len()).filter(|&h| flags[h]).collect();
        tracing::debug!(
            transient_frames = frames.len(),
            total_frames = flags.len(),
            "transient frames flagged"
        );

        let (wave, residual) = if frames.is_empty() {
            (Vec::new(), samples)
        } else {
            (
                stft.synthesize(&transient_frames, length, cancel)?,
                stft.synthesize(&residual_frames, length, cancel)?,
            )
        };

        Ok((
            Self {
                wave,
                transposable: params.transposable,
                frames,
            },
            residual,
        ))
    }

    /// Render at `pitch_factor`.
    ///
    /// Transposable transients are resampled by linear interpolation with a
    /// read step of `pitch_factor`; others are returned unchanged.
    pub fn render(&self, pitch_factor: f32) -> Vec<f32> {
        if !self.transposable || (pitch_factor - 1.0).abs() < 1e-6 || pitch_factor <= 0.0 {
            return self.wave.clone();
        }
        resample_linear(&self.wave, pitch_factor)
    }

    /// Copy permanently transposed by `pitch_factor`.
    pub fn transposed(&self, pitch_factor: f32) -> Self {
        Self {
            wave: self.render(pitch_factor),
            transposable: self.transposable,
            frames: self.frames.clone(),
        }
    }

    /// Extracted waveform.
    pub fn wave(&self) -> &[f32] {
        &self.wave
    }

    /// Whether pitch transposition applies.
    pub fn is_transposable(&self) -> bool {
        self.transposable
    }

    /// Indices of the analysis frames classified as transient.
    pub fn transient_frames(&self) -> &[usize] {
        &self.frames
    }

    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }
}

fn resample_linear(input: &[f32], step: f32) -> Vec<f32> {
    if input.is_empty() {
        return Vec::new();
    }
    let len = (input.len() as f64 / f64::from(step)).ceil() as usize;
    let last = input.len() - 1;
    (0..len)
        .map(|n| {
            let position = n as f64 * f64::from(step);
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            lerp(input[index], input[next], (position - index as f64) as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(frames: usize, bins: usize, level: f32) -> Vec<Vec<f32>> {
        vec![vec![level; bins]; frames]
    }

    #[test]
    fn steady_magnitudes_are_never_flagged() {
        let cancel = CancellationToken::new();
        let flags = detect_transient_frames(
            &flat(20, 64, 0.5),
            &TransientParams::default(),
            1e-3,
            &cancel,
        )
        .unwrap();
        assert!(flags.iter().all(|&f| !f));
    }

    #[test]
    fn broadband_jump_is_flagged() {
        let cancel = CancellationToken::new();
        let mut magnitudes = flat(20, 64, 0.01);
        for k in 0..64 {
            magnitudes[10][k] = 0.5;
        }
        let flags = detect_transient_frames(
            &magnitudes,
            &TransientParams::default(),
            1e-3,
            &cancel,
        )
        .unwrap();
        assert!(flags[10]);
        assert!(!flags[3]);
        assert!(!flags[17]);
    }

    #[test]
    fn quiet_flux_stays_below_floor() {
        let cancel = CancellationToken::new();
        let mut magnitudes = flat(20, 64, 0.0);
        for k in 0..64 {
            magnitudes[10][k] = 1e-6;
        }
        let flags = detect_transient_frames(
            &magnitudes,
            &TransientParams::default(),
            1e-3,
            &cancel,
        )
        .unwrap();
        assert!(flags.iter().all(|&f| !f));
    }

    #[test]
    fn resampling_follows_pitch_factor() {
        let wave: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let model = TransientModel::from_wave(wave.clone(), true);
        let up = model.render(2.0);
        assert_eq!(up.len(), 50);
        assert_eq!(up[10], 20.0);
        let down = model.render(0.5);
        assert_eq!(down.len(), 200);
        assert_eq!(down[21], 10.5);

        let fixed = TransientModel::from_wave(wave.clone(), false);
        assert_eq!(fixed.render(2.0), wave);
    }
}
