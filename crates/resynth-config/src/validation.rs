//! Parameter range validation.
//!
//! The analysis stages reject bad parameters one at a time as they run.
//! This module checks a whole [`ModelParams`] up front and reports every
//! problem at once, which is what a preset editor needs.
//!
//! # Example
//!
//! ```rust
//! use resynth_analysis::{MAX_ADJACENCY, ModelParams};
//! use resynth_config::validate_params;
//!
//! let mut params = ModelParams::default();
//! params.transient.flag_ratio = 0.0;
//! params.noise.sampling_frequency = -1.0;
//! assert_eq!(validate_params(&params, 44100).len(), 2);
//! ```

use resynth_analysis::{MAX_ADJACENCY, ModelParams};
use thiserror::Error;

use crate::AnalysisPreset;

/// Largest analysis window accepted, in samples.
pub const MAX_WINDOW_SIZE: usize = 1 << 16;

/// Lowest level accepted for any decibel threshold.
pub const MIN_DECIBEL: f64 = -200.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted parameter path, e.g. `sinusoid.hop_size`.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value rejected for a reason other than its range.
    #[error("invalid value for parameter '{param}': {reason}")]
    Invalid {
        /// Dotted parameter path.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn range(&mut self, param: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                param: param.to_string(),
                value,
                min,
                max,
            });
        }
    }

    // Strictly above `min`.
    fn above(&mut self, param: &str, value: f64, min: f64, max: f64) {
        if value <= min {
            self.errors.push(ValidationError::Invalid {
                param: param.to_string(),
                reason: format!("must be greater than {min}"),
            });
        } else {
            self.range(param, value, min, max);
        }
    }

    fn frames(&mut self, stage: &str, window_size: usize, hop_size: usize) {
        self.range(
            &format!("{stage}.window_size"),
            window_size as f64,
            4.0,
            MAX_WINDOW_SIZE as f64,
        );
        self.range(
            &format!("{stage}.hop_size"),
            hop_size as f64,
            1.0,
            window_size.max(1) as f64,
        );
    }
}

/// Check every parameter of `params` for a signal at `sample_rate`.
///
/// Returns an empty list when everything is in range.
pub fn validate_params(params: &ModelParams, sample_rate: u32) -> Vec<ValidationError> {
    let mut check = Checker::default();

    let sinusoid = &params.sinusoid;
    check.frames("sinusoid", sinusoid.window_size, sinusoid.hop_size);
    check.range(
        "sinusoid.minimum_decibel",
        f64::from(sinusoid.minimum_decibel),
        MIN_DECIBEL,
        0.0,
    );
    if let Some(relative) = sinusoid.relative_minimum_decibel {
        check.range(
            "sinusoid.relative_minimum_decibel",
            f64::from(relative),
            MIN_DECIBEL,
            0.0,
        );
    }
    check.above(
        "sinusoid.continuation_range",
        f64::from(sinusoid.continuation_range),
        0.0,
        12.0,
    );
    check.range("sinusoid.sleep_time", sinusoid.sleep_time, 0.0, 10.0);
    check.range(
        "sinusoid.minimum_length",
        sinusoid.minimum_length as f64,
        1.0,
        f64::from(u32::MAX),
    );

    let transient = &params.transient;
    check.frames("transient", transient.window_size, transient.hop_size);
    check.above("transient.strength", f64::from(transient.strength), 0.0, 100.0);
    check.range(
        "transient.adjacency",
        transient.adjacency as f64,
        0.0,
        MAX_ADJACENCY as f64,
    );
    check.above("transient.flag_ratio", f64::from(transient.flag_ratio), 0.0, 1.0);
    check.range(
        "transient.flux_floor_decibel",
        f64::from(transient.flux_floor_decibel),
        MIN_DECIBEL,
        0.0,
    );

    check.above(
        "noise.sampling_frequency",
        params.noise.sampling_frequency,
        0.0,
        f64::from(sample_rate),
    );

    // The stages must never reject what passes here.
    if check.errors.is_empty() {
        let rejected = params.validate(sample_rate).err();
        check.errors.extend(rejected.map(|err| stage_error(&err)));
    }

    check.errors
}

fn stage_error(err: &resynth_core::Error) -> ValidationError {
    let param = match err {
        resynth_core::Error::InvalidParameter { name, .. } => (*name).to_string(),
        _ => "params".to_string(),
    };
    ValidationError::Invalid {
        param,
        reason: err.to_string(),
    }
}

/// Validate a preset's parameters, folding several problems into
/// [`ValidationError::Multiple`].
pub fn validate_preset(preset: &AnalysisPreset, sample_rate: u32) -> ValidationResult<()> {
    let mut errors = validate_params(&preset.params, sample_rate);
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
