//! Resynth Analysis - decomposition of sampled notes into resynthesis models
//!
//! A note is split into three parts that are modelled independently:
//!
//! - [`transient`] - Short broadband bursts found by per-bin spectral flux
//! - [`sinusoid`] - Partials tracked across frames as [`SpectralTrajectory`]s
//! - [`noise`] - The stochastic remainder as a sequence of [`SpectralEnvelope`]s
//!
//! Supporting modules:
//!
//! - [`stft`] - Centred-frame STFT and overlap-add resynthesis
//! - [`spectral`] - Peak picking with parabolic refinement
//! - [`envelope`] - Per-semitone median envelopes and random-phase synthesis
//! - [`trajectory`] - Trajectory sampling, blending and rendering
//! - [`note`] - The per-note pipeline and render options
//! - [`instrument`] - Analysed notes plus generation of missing ones
//! - [`scheduler`] - One cancellable background task per operation kind
//! - [`params`] - Parameter bundles with documented defaults
//!
//! ## Example
//!
//! ```rust
//! use std::f32::consts::PI;
//! use std::sync::Arc;
//! use resynth_analysis::{ModelParams, NoteModels, RenderOptions};
//! use resynth_core::{CacheSet, CancellationToken, DspContext};
//!
//! let mut ctx = DspContext::with_seed(Arc::new(CacheSet::generate()), 1);
//! let cancel = CancellationToken::new();
//! let samples: Vec<f32> = (0..8820)
//!     .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 44100.0).sin())
//!     .collect();
//!
//! let note = NoteModels::build(&mut ctx, samples, 44100, 69, &ModelParams::default(), &cancel)?;
//! let octave_up = RenderOptions { pitch_factor: 2.0, time_factor: 1.0 };
//! let rendered = note.render(&mut ctx, octave_up, &cancel)?;
//! assert_eq!(rendered.len(), 8820);
//! # Ok::<(), resynth_core::Error>(())
//! ```

pub mod envelope;
pub mod instrument;
pub mod noise;
pub mod note;
pub mod params;
pub mod scheduler;
pub mod sinusoid;
pub mod spectral;
pub mod stft;
pub mod trajectory;
pub mod transient;

pub use envelope::SpectralEnvelope;
pub use instrument::Instrument;
pub use noise::NoiseModel;
pub use note::{NoteModels, NoteSpan, RenderOptions};
pub use params::{MAX_ADJACENCY, ModelParams, NoiseParams, SinusoidParams, TransientParams};
pub use scheduler::{TaskHandle, TaskKind, TaskScheduler};
pub use sinusoid::{SinusoidModel, optimize_trajectories, track_trajectories};
pub use spectral::{PeakOptions, SpectralUnit, Spectrum};
pub use stft::{FrameLayout, Stft};
pub use trajectory::SpectralTrajectory;
pub use transient::TransientModel;
