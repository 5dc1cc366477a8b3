//! Short-time Fourier transform with centred frames.
//!
//! Frame `h` is centred on sample `h * hop`; samples before the start or
//! past the end of the signal read as zero. A signal of `len` samples has
//! `len / hop + 1` frames, so both ends are covered by a full window.
//!
//! Resynthesis is weighted overlap-add: every inverse frame is added back
//! at its original place and each output sample is divided by the sum of
//! the analysis window values that covered it. An unmodified analysis
//! therefore reconstructs the input.

use resynth_core::{CancellationToken, Complex, DspContext, Error, Fft, Result};

/// Frame geometry shared by analysis and resynthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    window_size: usize,
    hop_size: usize,
    fft_size: usize,
}

impl FrameLayout {
    /// Layout with the FFT length rounded up to a power of two.
    pub fn new(window_size: usize, hop_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::invalid_parameter("window_size", "must be positive"));
        }
        if hop_size == 0 {
            return Err(Error::invalid_parameter("hop_size", "must be positive"));
        }
        Ok(Self {
            window_size,
            hop_size,
            fft_size: window_size.next_power_of_two(),
        })
    }

    /// Window length in samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Distance between frame centres.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Transform length.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bins from DC up to and including Nyquist.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of frames covering `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        len / self.hop_size + 1
    }

    /// Signal index of the first window sample of frame `h` (may be negative).
    pub fn frame_start(&self, h: usize) -> isize {
        (h * self.hop_size) as isize - (self.window_size / 2) as isize
    }

    /// Position of frame `h` as a ratio of a `len`-sample signal.
    pub fn position_of(&self, h: usize, len: usize) -> f64 {
        if len == 0 {
            return 0.0;
        }
        ((h * self.hop_size) as f64 / len as f64).clamp(0.0, 1.0)
    }

    /// Centre frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize, sample_rate: u32) -> f32 {
        k as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Copy the samples of frame `h` into `out` (length `window_size`).
    pub fn read_frame(&self, signal: &[f32], h: usize, out: &mut [f32]) {
        let start = self.frame_start(h);
        for (i, slot) in out.iter_mut().enumerate().take(self.window_size) {
            let index = start + i as isize;
            *slot = if index >= 0 {
                signal.get(index as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
        }
    }
}

/// Hann-windowed analyzer and overlap-add synthesizer.
#[derive(Debug, Clone)]
pub struct Stft {
    layout: FrameLayout,
    window: Vec<f32>,
    window_sum: f32,
    window_power: f32,
    fft: Fft,
}

impl Stft {
    /// Build for a layout, taking the window from the context's Hann table.
    pub fn new(ctx: &DspContext, layout: FrameLayout) -> Result<Self> {
        let window = ctx.hann().coefficients(layout.window_size);
        let window_sum = window.iter().sum();
        let window_power = window.iter().map(|w| w * w).sum();
        Ok(Self {
            layout,
            window,
            window_sum,
            window_power,
            fft: Fft::new(layout.fft_size)?,
        })
    }

    /// Frame geometry.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Window coefficients.
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Factor turning a bin magnitude into the amplitude of the sinusoid
    /// that produced it.
    pub fn amplitude_scale(&self) -> f32 {
        2.0 / self.window_sum
    }

    /// Sum of squared window values.
    pub fn window_power(&self) -> f32 {
        self.window_power
    }

    /// Windowed, zero-padded spectrum of frame `h`.
    pub fn analyze_frame(
        &self,
        signal: &[f32],
        h: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Complex<f32>>> {
        let mut frame = vec![0.0; self.layout.window_size];
        self.layout.read_frame(signal, h, &mut frame);
        for (sample, w) in frame.iter_mut().zip(&self.window) {
            *sample *= w;
        }
        self.fft.forward_real(&frame, cancel)
    }

    /// Spectra of every frame of `signal`.
    pub fn analyze(
        &self,
        signal: &[f32],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<Complex<f32>>>> {
        let count = self.layout.frame_count(signal.len());
        let mut frames = Vec::with_capacity(count);
        for h in 0..count {
            cancel.check()?;
            frames.push(self.analyze_frame(signal, h, cancel)?);
        }
        Ok(frames)
    }

    /// Overlap-add resynthesis of `frames` into `len` samples.
    pub fn synthesize(
        &self,
        frames: &[Vec<Complex<f32>>],
        len: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let mut output = vec![0.0f32; len];
        let mut weight = vec![0.0f32; len];
        for (h, spectrum) in frames.iter().enumerate() {
            cancel.check()?;
            let start = self.layout.frame_start(h);
            let inverse = self.fft.inverse_real(spectrum, cancel)?;
            for (i, (&value, &w)) in inverse.iter().zip(&self.window).enumerate() {
                let index = start + i as isize;
                if index < 0 || index as usize >= len {
                    continue;
                }
                output[index as usize] += value;
                weight[index as usize] += w;
            }
        }
        for (sample, w) in output.iter_mut().zip(&weight) {
            *sample = if *w > 1e-6 { *sample / w } else { 0.0 };
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resynth_core::CacheSet;

    use super::*;

    fn context() -> DspContext {
        DspContext::with_seed(Arc::new(CacheSet::generate()), 3)
    }

    #[test]
    fn frames_are_centred() {
        let layout = FrameLayout::new(8, 4).unwrap();
        assert_eq!(layout.frame_count(17), 5);
        assert_eq!(layout.frame_start(0), -4);
        assert_eq!(layout.frame_start(2), 4);

        let signal: Vec<f32> = (1..=10).map(|i| i as f32).collect();
        let mut frame = [0.0; 8];
        layout.read_frame(&signal, 0, &mut frame);
        assert_eq!(frame, [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        layout.read_frame(&signal, 2, &mut frame);
        assert_eq!(frame, [5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn non_power_of_two_window_is_padded() {
        let layout = FrameLayout::new(600, 150).unwrap();
        assert_eq!(layout.fft_size(), 1024);
        assert_eq!(layout.bin_count(), 513);
    }

    #[test]
    fn unmodified_frames_reconstruct_the_signal() {
        let ctx = context();
        let stft = Stft::new(&ctx, FrameLayout::new(256, 64).unwrap()).unwrap();
        let cancel = CancellationToken::new();
        let signal: Vec<f32> = (0..2000)
            .map(|i| (i as f32 * 0.05).sin() * 0.5 + (i as f32 * 0.31).cos() * 0.2)
            .collect();

        let frames = stft.analyze(&signal, &cancel).unwrap();
        let output = stft.synthesize(&frames, signal.len(), &cancel).unwrap();
        for (i, (a, b)) in signal.iter().zip(&output).enumerate() {
            assert!((a - b).abs() < 1e-3, "sample {i}: {a} vs {b}");
        }
    }

    #[test]
    fn analysis_honours_cancellation() {
        let ctx = context();
        let stft = Stft::new(&ctx, FrameLayout::new(256, 64).unwrap()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            stft.analyze(&[0.0; 1024], &cancel).unwrap_err(),
            Error::Cancelled
        );
    }
}
