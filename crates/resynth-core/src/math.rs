//! Mathematical utility functions for analysis and resynthesis.
//!
//! These are the exact (non-tabulated) conversions. The caches in
//! [`crate::cache`] are generated from them and answer the same questions
//! by table lookup.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear PCM amplitude
//!
//! # Pitch Conversions
//!
//! - [`frequency_to_step`] / [`step_to_frequency`] - Hz to equal-tempered scale step
//!   (MIDI note number)
//!
//! # Utilities
//!
//! - [`lerp`], [`lerp_f64`], [`lerp_i64`] - Linear interpolation with clamped ratio
//! - [`parabolic_offset`] / [`parabolic_peak`] - Sub-bin peak refinement
//! - [`median`]

use libm::{exp2, expf, log2, logf};

/// Reference pitch of scale step 69 (A4).
pub const A4_FREQUENCY: f64 = 440.0;

/// Scale step of the reference pitch.
pub const A4_STEP: f64 = 69.0;

/// Convert decibels to linear amplitude.
///
/// # Example
/// ```rust
/// use resynth_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear amplitude to decibels.
///
/// Values at or below zero map to -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert a frequency in Hz to a continuous equal-tempered scale step.
///
/// Step 69 is A4 = 440 Hz; one step is one semitone.
#[inline]
pub fn frequency_to_step(frequency: f64) -> f64 {
    A4_STEP + 12.0 * log2(frequency.max(1e-6) / A4_FREQUENCY)
}

/// Convert a continuous scale step to a frequency in Hz.
#[inline]
pub fn step_to_frequency(step: f64) -> f64 {
    A4_FREQUENCY * exp2((step - A4_STEP) / 12.0)
}

/// Linear interpolation between two values.
///
/// `t` is clamped to `[0, 1]`, so out-of-range ratios return the
/// respective endpoint.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Linear interpolation over `f64`, ratio clamped to `[0, 1]`.
#[inline]
pub fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Linear interpolation over integers, rounded to the nearest value.
#[inline]
pub fn lerp_i64(a: i64, b: i64, t: f64) -> i64 {
    lerp_f64(a as f64, b as f64, t).round() as i64
}

/// Sub-bin offset of a parabola through three equally spaced samples.
///
/// `a`, `b`, `c` are the magnitudes (in dB) of the bins left of, at and
/// right of a local maximum. Returns `p = 0.5 (a - c) / (a - 2b + c)`, or
/// `None` when the samples are colinear or the result is not a usable
/// refinement (non-finite or more than half a bin away).
#[inline]
pub fn parabolic_offset(a: f32, b: f32, c: f32) -> Option<f32> {
    let denominator = a - 2.0 * b + c;
    if denominator.abs() < 1e-9 {
        return None;
    }
    let p = 0.5 * (a - c) / denominator;
    if p.is_finite() && p.abs() <= 0.5 {
        Some(p)
    } else {
        None
    }
}

/// Height of the parabola at offset `p` (see [`parabolic_offset`]).
#[inline]
pub fn parabolic_peak(a: f32, b: f32, c: f32, p: f32) -> f32 {
    b - 0.25 * (a - c) * p
}

/// Median of a slice, reordering it in place.
///
/// Returns 0 for an empty slice. For even lengths the upper median is used.
pub fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}
