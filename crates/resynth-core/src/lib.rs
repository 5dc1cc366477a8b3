//! Resynth Core - numeric building blocks for note analysis and resynthesis
//!
//! This crate provides the leaf components every model-building stage shares:
//!
//! - [`cache`] - Precomputed lookup tables (decibel, scale step, logarithm,
//!   sine cycle, Hann window) with opaque byte-blob persistence
//! - [`fft`] - Cancellable radix-2 FFT and Bluestein fallback
//! - [`math`] - Exact conversions, interpolation, parabolic peak refinement
//! - [`note`] - Note-name parsing
//! - [`distance`] - Pairwise distance matrix with greedy closest-pair matching
//! - [`ratio`] - Values anchored at relative positions in time
//! - [`DspContext`] - Caches plus a seedable random source, passed explicitly
//! - [`CancellationToken`] - Cooperative cancellation polled inside every loop
//! - [`Wave`] - Raw interleaved input buffers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use resynth_core::{CacheSet, DspContext};
//!
//! let ctx = DspContext::with_seed(Arc::new(CacheSet::generate()), 42);
//! let pcm = ctx.decibel().pcm_of(-6.0);
//! assert!((pcm - 0.501).abs() < 1e-3);
//! assert!((ctx.frequency().step_of(440.0) - 69.0).abs() < 0.02);
//! ```

pub mod cache;
pub mod distance;
pub mod fft;
pub mod math;
pub mod note;
pub mod ratio;

mod cancel;
mod context;
mod error;
mod wave;

pub use cache::{CacheKind, CacheSet, NumericCache};
pub use cancel::CancellationToken;
pub use context::DspContext;
pub use distance::{Assignment, DistanceMatrix};
pub use error::{Error, Result};
pub use fft::{Bluestein, Complex, Fft};
pub use math::{
    db_to_linear, frequency_to_step, lerp, lerp_f64, linear_to_db, median, parabolic_offset,
    parabolic_peak, step_to_frequency,
};
pub use note::NoteName;
pub use ratio::RatioPoint;
pub use wave::Wave;
