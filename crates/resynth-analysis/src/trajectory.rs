//! Sinusoidal trajectories.
//!
//! A trajectory is a time-ordered run of [`SpectralUnit`]s anchored at
//! position ratios of the note, plus the hop it starts at and a fixed random
//! start phase. Frequencies are interpolated in the step (log-frequency)
//! domain when rendering.

use resynth_core::{DspContext, RatioPoint, lerp};

use crate::spectral::SpectralUnit;

/// One partial over time.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTrajectory {
    points: Vec<RatioPoint<SpectralUnit>>,
    start_hop: usize,
    start_phase: f64,
}

impl SpectralTrajectory {
    /// Build from points ordered by position.
    pub fn new(points: Vec<RatioPoint<SpectralUnit>>, start_hop: usize, start_phase: f64) -> Self {
        debug_assert!(resynth_core::ratio::is_ordered(&points));
        Self {
            points,
            start_hop,
            start_phase,
        }
    }

    /// Points ordered by position.
    pub fn points(&self) -> &[RatioPoint<SpectralUnit>] {
        &self.points
    }

    /// Insert `point` at its position, keeping points strictly ordered.
    ///
    /// A point at an occupied position replaces the unit there. Returns the
    /// index the point now occupies. The start hop is left unchanged.
    pub fn insert(&mut self, point: RatioPoint<SpectralUnit>) -> usize {
        resynth_core::ratio::insert_ordered(&mut self.points, point)
    }

    pub(crate) fn set_start_hop(&mut self, hop: usize) {
        self.start_hop = hop;
    }

    /// Hop index of the first point.
    pub fn start_hop(&self) -> usize {
        self.start_hop
    }

    /// Start phase in cycles.
    pub fn start_phase(&self) -> f64 {
        self.start_phase
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the trajectory has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of the first point.
    pub fn start(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.position)
    }

    /// Position of the last point.
    pub fn end(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.position)
    }

    /// Loudest amplitude.
    pub fn peak_amplitude(&self) -> f32 {
        self.points
            .iter()
            .fold(0.0, |m, p| m.max(p.value.amplitude))
    }

    /// Amplitude-weighted mean step, or the plain mean when all points are silent.
    pub fn mean_step(&self, ctx: &DspContext) -> f32 {
        let (mut weighted, mut weight, mut plain) = (0.0, 0.0, 0.0);
        for p in &self.points {
            let step = p.value.step(ctx);
            weighted += step * p.value.amplitude;
            weight += p.value.amplitude;
            plain += step;
        }
        if weight > 0.0 {
            weighted / weight
        } else if self.points.is_empty() {
            0.0
        } else {
            plain / self.points.len() as f32
        }
    }

    /// Unit at `position`, interpolated between the surrounding points.
    ///
    /// Outside the trajectory the amplitude is zero and the frequency is that
    /// of the nearest end.
    pub fn sample_at(&self, ctx: &DspContext, position: f64) -> SpectralUnit {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return SpectralUnit::default();
        };
        if position < first.position {
            return SpectralUnit::silent(first.value.frequency);
        }
        if position > last.position {
            return SpectralUnit::silent(last.value.frequency);
        }
        match resynth_core::ratio::bracket(&self.points, position) {
            Some((lo, hi, t)) if lo != hi => {
                interpolate_unit(ctx, &self.points[lo].value, &self.points[hi].value, t as f32)
            }
            Some((lo, _, _)) => self.points[lo].value,
            None => SpectralUnit::default(),
        }
    }

    /// Copy with every frequency multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| {
                RatioPoint::new(
                    SpectralUnit::new(p.value.amplitude, p.value.frequency * factor),
                    p.position,
                )
            })
            .collect();
        Self::new(points, self.start_hop, self.start_phase)
    }

    /// Copy with every amplitude multiplied by `gain`.
    pub fn attenuated(&self, gain: f32) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| {
                RatioPoint::new(
                    SpectralUnit::new(p.value.amplitude * gain, p.value.frequency),
                    p.position,
                )
            })
            .collect();
        Self::new(points, self.start_hop, self.start_phase)
    }

    /// Point-wise blend of two trajectories, `ratio` 0 = `a`, 1 = `b`.
    ///
    /// Points are taken at the union of both position sets; positions
    /// outside one trajectory's span treat it as silent there.
    pub fn interpolate(ctx: &DspContext, a: &Self, b: &Self, ratio: f32) -> Self {
        let mut positions: Vec<f64> = a
            .points
            .iter()
            .chain(&b.points)
            .map(|p| p.position)
            .collect();
        positions.sort_by(f64::total_cmp);
        positions.dedup();

        let points = positions
            .into_iter()
            .map(|position| {
                let x = a.sample_at(ctx, position);
                let y = b.sample_at(ctx, position);
                RatioPoint::new(interpolate_unit(ctx, &x, &y, ratio), position)
            })
            .collect();
        let start_hop = if ratio < 0.5 { a.start_hop } else { b.start_hop };
        Self::new(points, start_hop, a.start_phase)
    }

    /// Add this trajectory to `out`, which spans the whole note.
    ///
    /// Frequencies are multiplied by `pitch_factor`; segments at or above
    /// Nyquist are skipped while the phase keeps running.
    pub fn render_into(
        &self,
        ctx: &DspContext,
        out: &mut [f32],
        sample_rate: u32,
        pitch_factor: f32,
    ) {
        if self.points.len() < 2 || out.is_empty() {
            return;
        }
        let len = out.len();
        let nyquist = sample_rate as f32 / 2.0;
        let rate = f64::from(sample_rate);
        let index_of = |position: f64| ((position * len as f64).round() as usize).min(len);
        let mut phase = self.start_phase;

        for pair in self.points.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let (start, end) = (index_of(from.position), index_of(to.position));
            if end <= start {
                continue;
            }
            let step_from = from.value.step(ctx);
            let step_to = to.value.step(ctx);
            let span = (end - start) as f32;
            for (i, sample) in out[start..end].iter_mut().enumerate() {
                let t = i as f32 / span;
                let step = lerp(step_from, step_to, t);
                let frequency = ctx.frequency().frequency_of(step) * pitch_factor;
                let amplitude = lerp(from.value.amplitude, to.value.amplitude, t);
                if frequency < nyquist {
                    *sample += amplitude * ctx.sine().sin_of(phase);
                }
                phase = (phase + f64::from(frequency) / rate).fract();
            }
        }
    }
}

/// Blend two units: amplitude linearly, frequency in the step domain.
fn interpolate_unit(ctx: &DspContext, a: &SpectralUnit, b: &SpectralUnit, t: f32) -> SpectralUnit {
    let step = lerp(a.step(ctx), b.step(ctx), t);
    SpectralUnit::new(lerp(a.amplitude, b.amplitude, t), ctx.frequency().frequency_of(step))
}
