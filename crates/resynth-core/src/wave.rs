//! Raw sample buffers handed over by the host application.

use crate::{Error, Result};

/// Interleaved float PCM with a known sample rate and channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Wave {
    /// Wrap interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::invalid_parameter("sample_rate", "must be positive"));
        }
        if channels == 0 {
            return Err(Error::invalid_parameter("channels", "must be positive"));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Mono wave.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample frames per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Channel-averaged copy of the frames between two position ratios.
    ///
    /// Ratios are clamped to `[0, 1]`; `start` past `end` yields an empty buffer.
    pub fn mono_range(&self, start: f64, end: f64) -> Vec<f32> {
        let frames = self.frames();
        let first = (start.clamp(0.0, 1.0) * frames as f64).round() as usize;
        let last = (end.clamp(0.0, 1.0) * frames as f64).round() as usize;
        if last <= first {
            return Vec::new();
        }
        let channels = self.channels as usize;
        self.samples[first * channels..last * channels]
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}
