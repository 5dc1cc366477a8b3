//! Spectral peaks.
//!
//! A [`Spectrum`] is the set of sinusoidal components found in one analysis
//! frame. Peaks are local maxima of the magnitude spectrum, refined to
//! sub-bin accuracy by fitting a parabola through the dB magnitudes of the
//! peak bin and its two neighbours.

use resynth_core::{
    CancellationToken, Complex, DspContext, Error, Fft, Result, parabolic_offset, parabolic_peak,
};

/// Peaks closer than this many semitones are merged into the louder one.
pub const MINIMUM_STEP_DISTANCE: f32 = 0.125;

/// Bins scanned on either side of a target in fixed-frequency analysis.
const FIXED_SEARCH_BINS: usize = 2;

/// One sinusoidal component: a linear amplitude at a frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralUnit {
    /// Linear peak amplitude.
    pub amplitude: f32,
    /// Frequency in Hz.
    pub frequency: f32,
}

impl SpectralUnit {
    /// Create a unit.
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    /// Zero-amplitude unit at `frequency`.
    pub fn silent(frequency: f32) -> Self {
        Self::new(0.0, frequency)
    }

    /// Whether the amplitude is below `floor`.
    pub fn is_silent(&self, floor: f32) -> bool {
        self.amplitude < floor
    }

    /// Continuous scale step of the frequency.
    pub fn step(&self, ctx: &DspContext) -> f32 {
        ctx.frequency().step_of(self.frequency)
    }

    /// Level in dB.
    pub fn decibel(&self, ctx: &DspContext) -> f32 {
        ctx.decibel().decibel_of(self.amplitude)
    }

    /// Render `len` samples of this sinusoid with a random start phase.
    pub fn render(&self, ctx: &mut DspContext, len: usize, sample_rate: u32) -> Vec<f32> {
        let mut phase = ctx.random_phase();
        let increment = f64::from(self.frequency) / f64::from(sample_rate);
        let sine = ctx.sine();
        (0..len)
            .map(|_| {
                let value = self.amplitude * sine.sin_of(phase);
                phase = (phase + increment).fract();
                value
            })
            .collect()
    }
}

/// Thresholds for peak picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakOptions {
    /// Absolute floor in dB.
    pub minimum_decibel: f32,
    /// Floor relative to the loudest peak of the frame, in dB.
    pub relative_minimum_decibel: Option<f32>,
}

impl Default for PeakOptions {
    fn default() -> Self {
        Self {
            minimum_decibel: -90.0,
            relative_minimum_decibel: Some(-70.0),
        }
    }
}

/// Peaks of one frame, ordered by frequency.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    units: Vec<SpectralUnit>,
    fundamental: Option<SpectralUnit>,
}

impl Spectrum {
    /// Spectrum from already picked units. Units are sorted by frequency.
    pub fn from_units(mut units: Vec<SpectralUnit>) -> Self {
        units.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        let fundamental = loudest(&units);
        Self { units, fundamental }
    }

    /// Hann-window `samples`, transform and pick peaks.
    pub fn analyze(
        ctx: &DspContext,
        samples: &[f32],
        sample_rate: u32,
        options: PeakOptions,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let (bins, scale) = windowed_spectrum(ctx, samples, cancel)?;
        Self::from_bins(ctx, &bins, scale, sample_rate, options, cancel)
    }

    /// Pick peaks from a full complex spectrum.
    ///
    /// `amplitude_scale` turns a bin magnitude into a sinusoid amplitude
    /// (`2 / sum(window)` for a windowed frame).
    pub fn from_bins(
        ctx: &DspContext,
        bins: &[Complex<f32>],
        amplitude_scale: f32,
        sample_rate: u32,
        options: PeakOptions,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let fft_size = bins.len();
        if fft_size < 4 {
            return Ok(Self::default());
        }
        let (magnitudes, decibels) = magnitude_tables(ctx, bins, amplitude_scale);
        let bin_hz = sample_rate as f32 / fft_size as f32;

        // (frequency, peak dB)
        let mut candidates: Vec<(f32, f32)> = Vec::new();
        for k in 1..fft_size / 2 {
            cancel.check()?;
            let m = magnitudes[k];
            if !(m > magnitudes[k - 1] && m >= magnitudes[k + 1]) {
                continue;
            }
            let (a, b, c) = (decibels[k - 1], decibels[k], decibels[k + 1]);
            let Some(p) = parabolic_offset(a, b, c) else {
                continue;
            };
            candidates.push(((k as f32 + p) * bin_hz, parabolic_peak(a, b, c, p)));
        }

        let frame_max = candidates
            .iter()
            .map(|&(_, db)| db)
            .fold(f32::NEG_INFINITY, f32::max);
        let threshold = match options.relative_minimum_decibel {
            Some(relative) => options.minimum_decibel.max(frame_max + relative),
            None => options.minimum_decibel,
        };

        let mut units: Vec<SpectralUnit> = Vec::new();
        let mut last_step = f32::NEG_INFINITY;
        for (frequency, db) in candidates {
            if db <= threshold {
                continue;
            }
            let unit = SpectralUnit::new(ctx.decibel().pcm_of(db), frequency);
            let step = unit.step(ctx);
            match units.last_mut() {
                Some(previous) if step - last_step < MINIMUM_STEP_DISTANCE => {
                    if unit.amplitude > previous.amplitude {
                        *previous = unit;
                        last_step = step;
                    }
                }
                _ => {
                    units.push(unit);
                    last_step = step;
                }
            }
        }

        let fundamental = loudest(&units);
        Ok(Self { units, fundamental })
    }

    /// Measure the amplitude at each of `frequencies` instead of searching.
    ///
    /// For every target the largest refined local maximum within two bins
    /// is reported at the target frequency. Targets without a nearby
    /// maximum report the loudest bin in range.
    pub fn analyze_fixed(
        ctx: &DspContext,
        samples: &[f32],
        sample_rate: u32,
        frequencies: &[f32],
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let (bins, scale) = windowed_spectrum(ctx, samples, cancel)?;
        Self::fixed_from_bins(ctx, &bins, scale, sample_rate, frequencies, cancel)
    }

    /// Fixed-frequency measurement on a full complex spectrum.
    ///
    /// Targets above Nyquist report silence. Negative or non-finite targets
    /// are an error.
    pub fn fixed_from_bins(
        ctx: &DspContext,
        bins: &[Complex<f32>],
        amplitude_scale: f32,
        sample_rate: u32,
        frequencies: &[f32],
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let fft_size = bins.len();
        if fft_size < 4 {
            return Ok(Self::default());
        }
        let (magnitudes, decibels) = magnitude_tables(ctx, bins, amplitude_scale);
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let last_inner = fft_size / 2 - 1;

        let mut units = Vec::with_capacity(frequencies.len());
        for &frequency in frequencies {
            cancel.check()?;
            if !frequency.is_finite() || frequency < 0.0 {
                return Err(Error::invalid_parameter(
                    "frequencies",
                    format!("{frequency} Hz is not a usable target"),
                ));
            }
            let centre = (frequency / bin_hz).round() as usize;
            let low = centre.saturating_sub(FIXED_SEARCH_BINS).max(1);
            let high = centre.saturating_add(FIXED_SEARCH_BINS).min(last_inner);

            let mut best: Option<f32> = None;
            let mut loudest_bin = f32::NEG_INFINITY;
            for k in low..=high {
                loudest_bin = loudest_bin.max(decibels[k]);
                if !(magnitudes[k] > magnitudes[k - 1] && magnitudes[k] >= magnitudes[k + 1]) {
                    continue;
                }
                let (a, b, c) = (decibels[k - 1], decibels[k], decibels[k + 1]);
                let db = parabolic_offset(a, b, c).map_or(b, |p| parabolic_peak(a, b, c, p));
                best = Some(best.map_or(db, |current: f32| current.max(db)));
            }
            let db = best.unwrap_or(loudest_bin);
            let amplitude = if db.is_finite() {
                ctx.decibel().pcm_of(db)
            } else {
                0.0
            };
            units.push(SpectralUnit::new(amplitude, frequency));
        }
        Ok(Self::from_units(units))
    }

    /// Peaks ordered by frequency.
    pub fn units(&self) -> &[SpectralUnit] {
        &self.units
    }

    /// The loudest peak.
    pub fn fundamental(&self) -> Option<SpectralUnit> {
        self.fundamental
    }

    /// Number of peaks.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no peak was found.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn loudest(units: &[SpectralUnit]) -> Option<SpectralUnit> {
    units
        .iter()
        .copied()
        .max_by(|a, b| a.amplitude.total_cmp(&b.amplitude))
}

/// Scaled magnitudes and their dB levels for bins `0..=N/2`.
fn magnitude_tables(
    ctx: &DspContext,
    bins: &[Complex<f32>],
    amplitude_scale: f32,
) -> (Vec<f32>, Vec<f32>) {
    let half = bins.len() / 2;
    let magnitudes: Vec<f32> = bins[..=half]
        .iter()
        .map(|c| c.norm() * amplitude_scale)
        .collect();
    let decibels = magnitudes
        .iter()
        .map(|&m| ctx.decibel().decibel_of(m))
        .collect();
    (magnitudes, decibels)
}

fn windowed_spectrum(
    ctx: &DspContext,
    samples: &[f32],
    cancel: &CancellationToken,
) -> Result<(Vec<Complex<f32>>, f32)> {
    if samples.is_empty() {
        return Err(Error::EmptyInput);
    }
    let window = ctx.hann().coefficients(samples.len());
    let window_sum: f32 = window.iter().sum();
    let windowed: Vec<f32> = samples.iter().zip(&window).map(|(x, w)| x * w).collect();
    let fft = Fft::new(samples.len().next_power_of_two())?;
    let bins = fft.forward_real(&windowed, cancel)?;
    Ok((bins, 2.0 / window_sum))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;
    use std::sync::Arc;

    use resynth_core::CacheSet;

    use super::*;

    fn context() -> DspContext {
        DspContext::with_seed(Arc::new(CacheSet::generate()), 11)
    }

    fn sine(frequency: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn close_peaks_merge_into_the_louder() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let fft_size = 64;
        let mut bins = vec![Complex::new(0.0, 0.0); fft_size];
        // 1 kHz bins: maxima at 10 kHz and 12 kHz are three semitones apart.
        for (k, m) in [(9, 0.2), (10, 1.0), (11, 0.3), (12, 0.5), (13, 0.1)] {
            bins[k] = Complex::new(m, 0.0);
        }
        let spectrum = Spectrum::from_bins(
            &ctx,
            &bins,
            1.0,
            64_000,
            PeakOptions::default(),
            &cancel,
        )
        .unwrap();
        assert_eq!(spectrum.len(), 2);

        // 1 Hz bins: maxima at 2000 Hz and 2002 Hz are 0.017 semitones apart.
        let fft_size = 4096;
        let mut bins = vec![Complex::new(0.0, 0.0); fft_size];
        for (k, m) in [
            (1999, 0.2),
            (2000, 1.0),
            (2001, 0.3),
            (2002, 0.5),
            (2003, 0.1),
        ] {
            bins[k] = Complex::new(m, 0.0);
        }
        let spectrum = Spectrum::from_bins(
            &ctx,
            &bins,
            1.0,
            4096,
            PeakOptions::default(),
            &cancel,
        )
        .unwrap();
        assert_eq!(spectrum.len(), 1);
        let kept = spectrum.units()[0];
        assert!((kept.frequency - 2000.0).abs() < 0.5, "{kept:?}");
    }

    #[test]
    fn relative_floor_drops_quiet_peaks() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let mut bins = vec![Complex::new(0.0, 0.0); 256];
        for (k, m) in [(19, 0.5), (20, 1.0), (21, 0.5), (79, 0.0005), (80, 0.001), (81, 0.0005)] {
            bins[k] = Complex::new(m, 0.0);
        }
        let absolute = PeakOptions {
            minimum_decibel: -90.0,
            relative_minimum_decibel: None,
        };
        let relative = PeakOptions {
            minimum_decibel: -90.0,
            relative_minimum_decibel: Some(-40.0),
        };
        let all = Spectrum::from_bins(&ctx, &bins, 1.0, 25_600, absolute, &cancel).unwrap();
        let loud = Spectrum::from_bins(&ctx, &bins, 1.0, 25_600, relative, &cancel).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(loud.len(), 1);
        assert_eq!(loud.fundamental(), Some(loud.units()[0]));
    }

    #[test]
    fn fixed_frequency_reports_targets() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let sample_rate = 44100;
        let mut signal = sine(1000.0, 0.5, 4096, sample_rate);
        for (s, t) in signal.iter_mut().zip(sine(3000.0, 0.25, 4096, sample_rate)) {
            *s += t;
        }
        let spectrum =
            Spectrum::analyze_fixed(&ctx, &signal, sample_rate, &[1000.0, 3000.0], &cancel)
                .unwrap();
        let units = spectrum.units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].frequency, 1000.0);
        assert!((units[0].amplitude - 0.5).abs() < 0.03, "{:?}", units[0]);
        assert!((units[1].amplitude - 0.25).abs() < 0.02, "{:?}", units[1]);
    }

    #[test]
    fn unusable_fixed_targets_are_rejected() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let signal = sine(1000.0, 0.5, 1024, 44100);
        for target in [f32::NAN, f32::INFINITY, -20.0] {
            let result = Spectrum::analyze_fixed(&ctx, &signal, 44100, &[target], &cancel);
            assert!(
                matches!(
                    result,
                    Err(resynth_core::Error::InvalidParameter {
                        name: "frequencies",
                        ..
                    })
                ),
                "{target}"
            );
        }
        let beyond = Spectrum::analyze_fixed(&ctx, &signal, 44100, &[1e30], &cancel).unwrap();
        assert_eq!(beyond.units()[0].amplitude, 0.0);
    }

    #[test]
    fn rendered_unit_has_requested_amplitude() {
        let mut ctx = context();
        let unit = SpectralUnit::new(0.25, 441.0);
        let wave = unit.render(&mut ctx, 4410, 44100);
        let peak = wave.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!((peak - 0.25).abs() < 1e-3, "peak {peak}");
        let rms = (wave.iter().map(|x| x * x).sum::<f32>() / wave.len() as f32).sqrt();
        assert!((rms - 0.25 / 2f32.sqrt()).abs() < 1e-3, "rms {rms}");
    }

    #[test]
    fn empty_input_is_rejected() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let result = Spectrum::analyze(&ctx, &[], 44100, PeakOptions::default(), &cancel);
        assert_eq!(result.unwrap_err(), resynth_core::Error::EmptyInput);
    }
}
