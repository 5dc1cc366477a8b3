//! Sinusoidal modelling.
//!
//! Frames are analysed into peak [`Spectrum`]s, and peaks are linked into
//! [`SpectralTrajectory`]s by walking the frames from the last to the first.
//! In each frame the active trajectories and the frame's peaks are paired
//! greedily by step distance (see [`DistanceMatrix`]). Walking backwards
//! lets a note's stable tail seed the trajectories before the noisy attack
//! is reached.
//!
//! After tracking, [`optimize_trajectories`] trims silent ends and drops
//! short fragments. The residual handed to the next stage is the input with
//! the rendered sinusoids removed by spectral magnitude subtraction.

use resynth_core::{
    Assignment, CancellationToken, Complex, DistanceMatrix, DspContext, RatioPoint, Result,
};

use crate::params::SinusoidParams;
use crate::spectral::{PeakOptions, SpectralUnit, Spectrum};
use crate::stft::{FrameLayout, Stft};
use crate::trajectory::SpectralTrajectory;
use crate::RenderOptions;

/// A trajectory still being extended by the tracker.
///
/// The tracker runs backwards, so every extension inserts a point before
/// the current first one and moves the start hop back.
#[derive(Debug)]
struct ActiveTrajectory {
    trajectory: SpectralTrajectory,
    front: SpectralUnit,
    silent_run: usize,
}

impl ActiveTrajectory {
    fn born(
        unit: SpectralUnit,
        hop: usize,
        position: f64,
        fade_in: Option<f64>,
        phase: f64,
    ) -> Self {
        let mut trajectory = SpectralTrajectory::new(Vec::with_capacity(8), hop, phase);
        if let Some(later) = fade_in {
            trajectory.insert(RatioPoint::new(SpectralUnit::silent(unit.frequency), later));
        }
        trajectory.insert(RatioPoint::new(unit, position));
        Self {
            trajectory,
            front: unit,
            silent_run: 0,
        }
    }

    fn extend(&mut self, unit: SpectralUnit, hop: usize, position: f64, silence: f32) {
        if unit.is_silent(silence) {
            self.silent_run += 1;
        } else {
            self.silent_run = 0;
        }
        self.trajectory.insert(RatioPoint::new(unit, position));
        self.trajectory.set_start_hop(hop);
        self.front = unit;
    }

    fn seal(self) -> SpectralTrajectory {
        self.trajectory
    }
}

/// Link per-frame peaks into trajectories.
///
/// `spectra[h]` are the peaks of frame `h` and `positions[h]` its position
/// ratio. A trajectory born at frame `h` gets a zero-amplitude point at
/// frame `h + 1` so it fades in from silence when played forwards. A
/// trajectory that finds no continuation gets a zero-amplitude point at its
/// last frequency, and is sealed once its leading silent run reaches
/// [`SinusoidParams::sleep_frames`]. New peaks within the continuation range
/// of an active trajectory are not allowed to start trajectories.
pub fn track_trajectories(
    ctx: &mut DspContext,
    spectra: &[Spectrum],
    positions: &[f64],
    sample_rate: u32,
    params: &SinusoidParams,
    cancel: &CancellationToken,
) -> Result<Vec<SpectralTrajectory>> {
    let silence = ctx.decibel().pcm_of(params.minimum_decibel);
    let max_sleep = params.sleep_frames(sample_rate);
    let range = params.continuation_range;

    let mut active: Vec<ActiveTrajectory> = Vec::new();
    let mut sealed: Vec<SpectralTrajectory> = Vec::new();

    for h in (0..spectra.len()).rev() {
        cancel.check()?;
        let position = positions[h];
        let peaks = spectra[h].units();
        let peak_steps: Vec<f32> = peaks.iter().map(|p| p.step(ctx)).collect();
        let active_steps: Vec<f32> = active.iter().map(|t| t.front.step(ctx)).collect();

        let matrix = DistanceMatrix::new(&active_steps, &peak_steps, f64::from(range), |a, b| {
            f64::from((a - b).abs())
        });

        let mut births = Vec::new();
        let mut retired = vec![false; active.len()];
        for assignment in matrix.closest_pairs() {
            match assignment {
                Assignment::Matched { row, column, .. } => {
                    active[row].extend(peaks[column], h, position, silence);
                }
                Assignment::UnmatchedRow(row) => {
                    let frequency = active[row].front.frequency;
                    active[row].extend(SpectralUnit::silent(frequency), h, position, silence);
                    retired[row] = active[row].silent_run >= max_sleep;
                }
                Assignment::UnmatchedColumn(column) => births.push(column),
            }
        }

        let fronts: Vec<f32> = active
            .iter()
            .zip(&retired)
            .filter(|&(_, &gone)| !gone)
            .map(|(t, _)| t.front.step(ctx))
            .collect();
        let mut born = Vec::new();
        for column in births {
            if fronts.iter().any(|s| (s - peak_steps[column]).abs() <= range) {
                continue;
            }
            let fade_in = positions.get(h + 1).copied();
            born.push(ActiveTrajectory::born(
                peaks[column],
                h,
                position,
                fade_in,
                ctx.random_phase(),
            ));
        }

        let mut kept = Vec::with_capacity(active.len() + born.len());
        for (trajectory, gone) in active.drain(..).zip(retired) {
            if gone {
                sealed.push(trajectory.seal());
            } else {
                kept.push(trajectory);
            }
        }
        kept.extend(born);
        active = kept;
    }

    sealed.extend(active.into_iter().map(ActiveTrajectory::seal));
    Ok(sealed)
}

/// Trim silent ends and drop short or silent trajectories.
///
/// While the first two points are both below `minimum_decibel`, the first
/// is removed and the start hop advances; the tail is trimmed the same way.
/// One silent point is kept at each end so trajectories still fade.
///
/// Trajectories left with fewer than `minimum_length` points are dropped.
/// Trimming reduces an entirely silent trajectory to a single point, which
/// would still pass a `minimum_length` of 1; such trajectories are dropped
/// as well since they render nothing.
pub fn optimize_trajectories(
    ctx: &DspContext,
    trajectories: Vec<SpectralTrajectory>,
    params: &SinusoidParams,
) -> Vec<SpectralTrajectory> {
    let silence = ctx.decibel().pcm_of(params.minimum_decibel);
    trajectories
        .into_iter()
        .filter_map(|trajectory| {
            let points = trajectory.points();
            let mut first = 0;
            let mut last = points.len();
            while last - first >= 2
                && points[first].value.is_silent(silence)
                && points[first + 1].value.is_silent(silence)
            {
                first += 1;
            }
            while last - first >= 2
                && points[last - 1].value.is_silent(silence)
                && points[last - 2].value.is_silent(silence)
            {
                last -= 1;
            }
            let kept = &points[first..last];
            if kept.len() < params.minimum_length || kept.iter().all(|p| p.value.is_silent(silence))
            {
                return None;
            }
            Some(SpectralTrajectory::new(
                kept.to_vec(),
                trajectory.start_hop() + first,
                trajectory.start_phase(),
            ))
        })
        .collect()
}

/// The deterministic part of a note.
#[derive(Debug, Clone, PartialEq)]
pub struct SinusoidModel {
    trajectories: Vec<SpectralTrajectory>,
    hop_count: usize,
    hop_size: usize,
    sample_rate: u32,
    length: usize,
}

impl SinusoidModel {
    /// Model without trajectories.
    pub fn empty(length: usize, hop_size: usize, sample_rate: u32) -> Self {
        Self {
            trajectories: Vec::new(),
            hop_count: 0,
            hop_size,
            sample_rate,
            length,
        }
    }

    /// Extract trajectories from `samples` and return the model together
    /// with the residual.
    pub fn analyze(
        ctx: &mut DspContext,
        samples: Vec<f32>,
        sample_rate: u32,
        params: &SinusoidParams,
        cancel: &CancellationToken,
    ) -> Result<(Self, Vec<f32>)> {
        params.validate()?;
        let length = samples.len();
        if length == 0 {
            return Ok((Self::empty(0, params.hop_size, sample_rate), samples));
        }

        let layout = FrameLayout::new(params.window_size, params.hop_size)?;
        let stft = Stft::new(ctx, layout)?;
        let frames = stft.analyze(&samples, cancel)?;
        let options = PeakOptions {
            minimum_decibel: params.minimum_decibel,
            relative_minimum_decibel: params.relative_minimum_decibel,
        };
        let spectra = frames
            .iter()
            .map(|bins| {
                Spectrum::from_bins(ctx, bins, stft.amplitude_scale(), sample_rate, options, cancel)
            })
            .collect::<Result<Vec<_>>>()?;
        let positions: Vec<f64> = (0..frames.len())
            .map(|h| layout.position_of(h, length))
            .collect();

        let tracked =
            track_trajectories(ctx, &spectra, &positions, sample_rate, params, cancel)?;
        let tracked_count = tracked.len();
        let trajectories = optimize_trajectories(ctx, tracked, params);
        tracing::debug!(
            frames = frames.len(),
            tracked = tracked_count,
            kept = trajectories.len(),
            "sinusoid trajectories tracked"
        );

        let model = Self {
            trajectories,
            hop_count: frames.len(),
            hop_size: params.hop_size,
            sample_rate,
            length,
        };
        let rendered = model.render(ctx, RenderOptions::default(), cancel)?;
        let residual = subtract_magnitudes(&stft, &frames, &rendered, cancel)?;
        Ok((model, residual))
    }

    /// Render all trajectories.
    pub fn render(
        &self,
        ctx: &DspContext,
        options: RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let mut out = vec![0.0; options.stretched_length(self.length)];
        for trajectory in &self.trajectories {
            cancel.check()?;
            trajectory.render_into(ctx, &mut out, self.sample_rate, options.pitch_factor);
        }
        Ok(out)
    }

    /// Blend two models, `ratio` 0 = `a`, 1 = `b`.
    ///
    /// Trajectories are paired greedily by mean step within
    /// `continuation_range`; unpaired ones fade by the ratio.
    pub fn interpolate(
        ctx: &DspContext,
        a: &Self,
        b: &Self,
        ratio: f32,
        continuation_range: f32,
    ) -> Self {
        let steps_a: Vec<f32> = a.trajectories.iter().map(|t| t.mean_step(ctx)).collect();
        let steps_b: Vec<f32> = b.trajectories.iter().map(|t| t.mean_step(ctx)).collect();
        let matrix = DistanceMatrix::new(&steps_a, &steps_b, f64::from(continuation_range), |x, y| {
            f64::from((x - y).abs())
        });

        let trajectories = matrix
            .closest_pairs()
            .into_iter()
            .map(|assignment| match assignment {
                Assignment::Matched { row, column, .. } => SpectralTrajectory::interpolate(
                    ctx,
                    &a.trajectories[row],
                    &b.trajectories[column],
                    ratio,
                ),
                Assignment::UnmatchedRow(row) => a.trajectories[row].attenuated(1.0 - ratio),
                Assignment::UnmatchedColumn(column) => b.trajectories[column].attenuated(ratio),
            })
            .filter(|t| t.peak_amplitude() > 0.0)
            .collect();

        Self {
            trajectories,
            hop_count: a.hop_count.max(b.hop_count),
            hop_size: a.hop_size,
            sample_rate: a.sample_rate,
            length: resynth_core::math::lerp_i64(a.length as i64, b.length as i64, f64::from(ratio))
                .max(0) as usize,
        }
    }

    /// Copy with every frequency multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            trajectories: self.trajectories.iter().map(|t| t.scaled(factor)).collect(),
            ..self.clone()
        }
    }

    /// Extracted trajectories.
    pub fn trajectories(&self) -> &[SpectralTrajectory] {
        &self.trajectories
    }

    /// Number of analysis frames.
    pub fn hop_count(&self) -> usize {
        self.hop_count
    }

    /// Analysis hop in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Note length in samples.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether no trajectory was kept.
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

/// Remove the magnitude of `rendered` from every analysis frame, keeping
/// the original phase, and resynthesize.
fn subtract_magnitudes(
    stft: &Stft,
    frames: &[Vec<Complex<f32>>],
    rendered: &[f32],
    cancel: &CancellationToken,
) -> Result<Vec<f32>> {
    let model_frames = stft.analyze(rendered, cancel)?;
    let mut residual_frames = Vec::with_capacity(frames.len());
    for (original, model) in frames.iter().zip(&model_frames) {
        cancel.check()?;
        let frame = original
            .iter()
            .zip(model)
            .map(|(x, s)| {
                let magnitude = x.norm();
                if magnitude > 0.0 {
                    *x * ((magnitude - s.norm()).max(0.0) / magnitude)
                } else {
                    *x
                }
            })
            .collect();
        residual_frames.push(frame);
    }
    stft.synthesize(&residual_frames, rendered.len(), cancel)
}
