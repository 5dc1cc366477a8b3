//! WAV boundary for the resynth analysis engine.
//!
//! Sample data enters the engine as a [`Wave`](resynth_core::Wave) and
//! leaves it as rendered float PCM. This crate moves both through WAV files:
//!
//! - [`read_wave`] loads a file as an interleaved `Wave`
//! - [`read_wav`] loads a file mixed down to mono
//! - [`write_wav`] / [`write_wave`] save samples
//! - [`read_wav_info`] reads the header only
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resynth_io::{WavSpec, read_wave, write_wav};
//!
//! let wave = read_wave("cello_c3.wav")?;
//! let first_second = wave.mono_range(0.0, 1.0 / wave.duration());
//! let spec = WavSpec { sample_rate: wave.sample_rate(), ..WavSpec::default() };
//! write_wav("cello_c3_head.wav", &first_second, spec)?;
//! # Ok::<(), resynth_io::Error>(())
//! ```

mod wav;

pub use wav::{
    WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, read_wave, write_wav, write_wave,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The decoded samples did not form a valid wave.
    #[error("Invalid wave: {0}")]
    Wave(#[from] resynth_core::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
