//! Frequency ↔ equal-tempered scale step table.

use super::{BlobReader, BlobWriter, CacheKind, NumericCache, nearest_index, span_len};
use crate::Result;
use crate::math::step_to_frequency;

/// Scale step table parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteFrequencyConfig {
    /// Lowest scale step (MIDI note number).
    pub lowest_step: f32,
    /// Highest scale step.
    pub highest_step: f32,
    /// Table entries per semitone.
    pub resolution: u32,
}

impl Default for DiscreteFrequencyConfig {
    fn default() -> Self {
        Self {
            lowest_step: 0.0,
            highest_step: 136.0,
            resolution: 100,
        }
    }
}

impl DiscreteFrequencyConfig {
    fn span(&self) -> f64 {
        f64::from(self.highest_step) - f64::from(self.lowest_step)
    }
}

/// Frequency in Hz for every fractional scale step between the bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteFrequencyCache {
    config: DiscreteFrequencyConfig,
    frequencies: Vec<f32>,
}

impl DiscreteFrequencyCache {
    /// Lowest representable step.
    pub fn lowest_step(&self) -> f32 {
        self.config.lowest_step
    }

    /// Highest representable step.
    pub fn highest_step(&self) -> f32 {
        self.config.highest_step
    }

    /// Number of whole-semitone buckets covered (one per integer step).
    pub fn note_count(&self) -> usize {
        (self.config.highest_step - self.config.lowest_step).floor() as usize + 1
    }

    /// Frequency of a scale step, clamped to the table range.
    pub fn frequency_of(&self, step: f32) -> f32 {
        let offset = (step - self.config.lowest_step) * self.config.resolution as f32;
        let index = (offset.round().max(0.0) as usize).min(self.frequencies.len() - 1);
        self.frequencies[index]
    }

    /// Scale step of a frequency, clamped to the table range.
    pub fn step_of(&self, frequency: f32) -> f32 {
        let index = nearest_index(&self.frequencies, frequency);
        self.config.lowest_step + index as f32 / self.config.resolution as f32
    }

    /// Distance in semitones between two frequencies.
    pub fn distance(&self, a: f32, b: f32) -> f32 {
        (self.step_of(a) - self.step_of(b)).abs()
    }
}

impl NumericCache for DiscreteFrequencyCache {
    type Config = DiscreteFrequencyConfig;
    const KIND: CacheKind = CacheKind::DiscreteFrequency;

    fn generate(config: DiscreteFrequencyConfig) -> Self {
        let config = DiscreteFrequencyConfig {
            resolution: config.resolution.max(1),
            ..config
        };
        let resolution = f64::from(config.resolution);
        let Some(len) = span_len(config.span(), resolution) else {
            tracing::warn!(?config, "scale step range not representable, using defaults");
            return Self::generate(DiscreteFrequencyConfig::default());
        };
        let lowest = f64::from(config.lowest_step);
        let frequencies = (0..len)
            .map(|i| step_to_frequency(lowest + i as f64 / resolution) as f32)
            .collect();
        Self {
            config,
            frequencies,
        }
    }

    fn config(&self) -> DiscreteFrequencyConfig {
        self.config
    }

    fn len(&self) -> usize {
        self.frequencies.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        BlobWriter::new(Self::KIND)
            .param(f64::from(self.config.lowest_step))
            .param(f64::from(self.config.highest_step))
            .param(f64::from(self.config.resolution))
            .table(&self.frequencies)
            .finish()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BlobReader::new(Self::KIND, bytes)?;
        let config = DiscreteFrequencyConfig {
            lowest_step: reader.param()? as f32,
            highest_step: reader.param()? as f32,
            resolution: reader.count(1, u32::MAX as usize)? as u32,
        };
        let len = reader.span_len(config.span(), f64::from(config.resolution))?;
        let frequencies = reader.table(len)?;
        reader.finish()?;
        Ok(Self {
            config,
            frequencies,
        })
    }
}
