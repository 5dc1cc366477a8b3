//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use resynth_core::Wave;
use std::io::Read;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
///
/// 32-bit files are written as IEEE float, narrower ones as integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample: 8, 16, 24 or 32.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

impl WavSpec {
    fn check(&self) -> Result<()> {
        if !matches!(self.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(Error::UnsupportedFormat(format!(
                "{}-bit samples",
                self.bits_per_sample
            )));
        }
        if self.channels == 0 {
            return Err(Error::UnsupportedFormat("zero channels".to_string()));
        }
        Ok(())
    }
}

/// Decode every sample of `reader` as interleaved f32 in `[-1, 1)`.
fn decode<R: Read>(reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float if spec.bits_per_sample == 32 => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int if (1..=32).contains(&spec.bits_per_sample) => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        format => {
            return Err(Error::UnsupportedFormat(format!(
                "{}-bit {format:?}",
                spec.bits_per_sample
            )));
        }
    };
    Ok(samples)
}

/// Read a WAV file as an interleaved [`Wave`].
pub fn read_wave<P: AsRef<Path>>(path: P) -> Result<Wave> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = decode(reader)?;
    let wave = Wave::new(samples, spec.sample_rate, spec.channels)?;
    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        frames = wave.frames(),
        "wave loaded"
    );
    Ok(wave)
}

/// Read a WAV file and return samples as f32 along with the spec.
///
/// Multi-channel files are mixed down to mono by averaging channels.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let wave = read_wave(path)?;
    let spec = WavSpec {
        channels: wave.channels(),
        sample_rate: wave.sample_rate(),
        bits_per_sample: 32,
    };
    Ok((wave.mono_range(0.0, 1.0), spec))
}

/// Write interleaved samples to a WAV file.
///
/// Integer formats clamp samples to the representable range.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    spec.check()?;
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "wav written"
    );
    Ok(())
}

/// Write a [`Wave`] as 32-bit float with its own rate and channel count.
pub fn write_wave<P: AsRef<Path>>(path: P, wave: &Wave) -> Result<()> {
    let spec = WavSpec {
        channels: wave.channels(),
        sample_rate: wave.sample_rate(),
        bits_per_sample: 32,
    };
    write_wav(path, wave.samples(), spec)
}
