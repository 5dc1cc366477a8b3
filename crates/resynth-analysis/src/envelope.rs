//! Per-semitone spectral envelope.
//!
//! The envelope holds one amplitude per equal-tempered note bucket of the
//! frequency cache. Analysis takes the median bin magnitude of every bucket;
//! synthesis interpolates between buckets at each bin's continuous step and
//! assigns a uniformly random phase.

use resynth_core::{CancellationToken, Complex, DspContext, Result, lerp, median};

/// Median-to-RMS factor of a Rayleigh-distributed magnitude, `1 / sqrt(ln 2)`.
pub const RAYLEIGH_MEDIAN_TO_RMS: f32 = 1.201_122_4;

/// Amplitudes indexed by note bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralEnvelope {
    amplitudes: Vec<f32>,
    lowest_step: f32,
}

impl SpectralEnvelope {
    /// Silent envelope covering the context's note range.
    pub fn silent(ctx: &DspContext) -> Self {
        Self {
            amplitudes: vec![0.0; ctx.frequency().note_count()],
            lowest_step: ctx.frequency().lowest_step(),
        }
    }

    /// Envelope from explicit bucket amplitudes starting at `lowest_step`.
    pub fn from_amplitudes(amplitudes: Vec<f32>, lowest_step: f32) -> Self {
        Self {
            amplitudes,
            lowest_step,
        }
    }

    /// Median magnitude per bucket of a full complex spectrum.
    ///
    /// Magnitudes are multiplied by `scale` before bucketing. Buckets no bin
    /// falls into are filled by interpolating their filled neighbours.
    pub fn analyze(
        ctx: &DspContext,
        bins: &[Complex<f32>],
        scale: f32,
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let mut envelope = Self::silent(ctx);
        let count = envelope.amplitudes.len();
        let mut buckets: Vec<Vec<f32>> = vec![Vec::new(); count];
        let fft_size = bins.len();
        let bin_hz = sample_rate as f32 / fft_size as f32;

        for (k, bin) in bins.iter().enumerate().take(fft_size / 2 + 1).skip(1) {
            cancel.check()?;
            let bucket = envelope.bucket_of(ctx.frequency().step_of(k as f32 * bin_hz));
            buckets[bucket].push(bin.norm() * scale);
        }

        let mut filled = vec![false; count];
        for (i, bucket) in buckets.iter_mut().enumerate() {
            if !bucket.is_empty() {
                envelope.amplitudes[i] = median(bucket);
                filled[i] = true;
            }
        }
        fill_gaps(&mut envelope.amplitudes, &filled);
        Ok(envelope)
    }

    /// Bucket amplitudes.
    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// Whether the envelope has no buckets.
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Amplitude at a continuous step, interpolated between buckets.
    pub fn amplitude_at(&self, step: f32) -> f32 {
        let Some(last) = self.amplitudes.len().checked_sub(1) else {
            return 0.0;
        };
        let position = (step - self.lowest_step).clamp(0.0, last as f32);
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(last);
        lerp(
            self.amplitudes[lower],
            self.amplitudes[upper],
            position - lower as f32,
        )
    }

    /// Envelope shifted up by `semitones` (fractional shifts interpolate).
    pub fn transposed(&self, semitones: f32) -> Self {
        let amplitudes = (0..self.amplitudes.len())
            .map(|i| self.amplitude_at(self.lowest_step + i as f32 - semitones))
            .collect();
        Self::from_amplitudes(amplitudes, self.lowest_step)
    }

    /// Bucket-wise interpolation, `ratio` 0 = `a`, 1 = `b`.
    pub fn interpolate(a: &Self, b: &Self, ratio: f32) -> Self {
        let amplitudes = a
            .amplitudes
            .iter()
            .zip(&b.amplitudes)
            .map(|(&x, &y)| lerp(x, y, ratio))
            .collect();
        Self::from_amplitudes(amplitudes, a.lowest_step)
    }

    /// Random-phase Hermitian spectrum of length `fft_size`.
    ///
    /// Bin `k` gets the envelope amplitude at its step times `gain`; DC is
    /// zero and the Nyquist bin is real.
    pub fn synthesize(
        &self,
        ctx: &mut DspContext,
        fft_size: usize,
        sample_rate: u32,
        gain: f32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Complex<f32>>> {
        let mut spectrum = vec![Complex::new(0.0, 0.0); fft_size];
        if fft_size < 2 {
            return Ok(spectrum);
        }
        let half = fft_size / 2;
        let bin_hz = sample_rate as f32 / fft_size as f32;
        for k in 1..half {
            cancel.check()?;
            let amplitude = gain * self.amplitude_at(ctx.frequency().step_of(k as f32 * bin_hz));
            let phase = ctx.random_phase();
            let value = Complex::new(
                amplitude * ctx.sine().cos_of(phase),
                amplitude * ctx.sine().sin_of(phase),
            );
            spectrum[k] = value;
            spectrum[fft_size - k] = value.conj();
        }
        let nyquist = gain * self.amplitude_at(ctx.frequency().step_of(half as f32 * bin_hz));
        let sign = if ctx.random_phase() < 0.5 { 1.0 } else { -1.0 };
        spectrum[half] = Complex::new(sign * nyquist, 0.0);
        Ok(spectrum)
    }

    fn bucket_of(&self, step: f32) -> usize {
        let last = self.amplitudes.len().saturating_sub(1);
        ((step - self.lowest_step).round().max(0.0) as usize).min(last)
    }
}

/// Linear fill of unfilled buckets; edges copy the nearest filled bucket.
fn fill_gaps(values: &mut [f32], filled: &[bool]) {
    let known: Vec<usize> = (0..values.len()).filter(|&i| filled[i]).collect();
    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return;
    };
    let (head, tail) = (values[first], values[last]);
    values[..first].fill(head);
    values[last + 1..].fill(tail);
    for pair in known.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        for i in lo + 1..hi {
            let t = (i - lo) as f32 / (hi - lo) as f32;
            values[i] = lerp(values[lo], values[hi], t);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resynth_core::CacheSet;

    use super::*;

    fn context() -> DspContext {
        DspContext::with_seed(Arc::new(CacheSet::generate()), 5)
    }

    #[test]
    fn gaps_are_interpolated() {
        let mut values = [0.0, 2.0, 0.0, 0.0, 8.0, 0.0];
        let filled = [false, true, false, false, true, false];
        fill_gaps(&mut values, &filled);
        assert_eq!(values, [2.0, 2.0, 4.0, 6.0, 8.0, 8.0]);
    }

    #[test]
    fn flat_spectrum_gives_flat_envelope() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let bins = vec![Complex::new(0.5, 0.0); 1024];
        let envelope = SpectralEnvelope::analyze(&ctx, &bins, 2.0, 44100, &cancel).unwrap();
        assert_eq!(envelope.len(), ctx.frequency().note_count());
        for &a in envelope.amplitudes() {
            assert!((a - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn synthesized_spectrum_is_hermitian() {
        let mut ctx = context();
        let cancel = CancellationToken::new();
        let envelope = SpectralEnvelope::from_amplitudes(vec![0.3; 137], 0.0);
        let n = 256;
        let spectrum = envelope.synthesize(&mut ctx, n, 44100, 2.0, &cancel).unwrap();
        assert_eq!(spectrum[0], Complex::new(0.0, 0.0));
        assert_eq!(spectrum[n / 2].im, 0.0);
        for k in 1..n / 2 {
            assert_eq!(spectrum[k], spectrum[n - k].conj());
            assert!((spectrum[k].norm() - 0.6).abs() < 1e-3);
        }
    }

    #[test]
    fn transposition_moves_features_up() {
        let mut amplitudes = vec![0.0; 137];
        amplitudes[60] = 1.0;
        let envelope = SpectralEnvelope::from_amplitudes(amplitudes, 0.0);
        let up = envelope.transposed(12.0);
        assert_eq!(up.amplitudes()[72], 1.0);
        assert_eq!(up.amplitudes()[60], 0.0);
        assert!((up.amplitude_at(71.5) - 0.5).abs() < 1e-6);
    }
}
