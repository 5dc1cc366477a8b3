//! Value ↔ logarithm table for a fixed base.

use super::{BlobReader, BlobWriter, CacheKind, NumericCache, nearest_index, span_len};
use crate::{Error, Result};

/// Logarithm table parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogarithmConfig {
    /// Logarithm base.
    pub base: f64,
    /// Lowest tabulated exponent.
    pub lowest_exponent: f64,
    /// Highest tabulated exponent.
    pub highest_exponent: f64,
    /// Table entries per unit exponent.
    pub resolution: u32,
}

impl Default for LogarithmConfig {
    /// Base 2 over ±4 octaves at one-cent resolution.
    fn default() -> Self {
        Self {
            base: 2.0,
            lowest_exponent: -4.0,
            highest_exponent: 4.0,
            resolution: 1200,
        }
    }
}

impl LogarithmConfig {
    fn table_len(&self) -> Option<usize> {
        if !(self.base.is_finite() && self.base > 0.0) {
            return None;
        }
        span_len(
            self.highest_exponent - self.lowest_exponent,
            f64::from(self.resolution),
        )
    }
}

/// `base^exponent` for evenly spaced exponents.
#[derive(Debug, Clone, PartialEq)]
pub struct LogarithmCache {
    config: LogarithmConfig,
    values: Vec<f32>,
}

impl LogarithmCache {
    /// Base of this table.
    pub fn base(&self) -> f64 {
        self.config.base
    }

    /// `base^exponent`, with the exponent clamped to the table range.
    pub fn value_of(&self, exponent: f64) -> f32 {
        let offset = (exponent - self.config.lowest_exponent) * f64::from(self.config.resolution);
        let index = (offset.round().max(0.0) as usize).min(self.values.len() - 1);
        self.values[index]
    }

    /// `log_base(value)`, clamped to the table range.
    pub fn logarithm_of(&self, value: f32) -> f64 {
        let index = nearest_index(&self.values, value);
        self.config.lowest_exponent + index as f64 / f64::from(self.config.resolution)
    }

    /// Frequency factor of a transposition by `semitones` (base-2 tables only).
    pub fn ratio_of_semitones(&self, semitones: f64) -> f32 {
        debug_assert!((self.config.base - 2.0).abs() < f64::EPSILON);
        self.value_of(semitones / 12.0)
    }

    /// Transposition in semitones of a frequency factor (base-2 tables only).
    pub fn semitones_of_ratio(&self, ratio: f32) -> f64 {
        debug_assert!((self.config.base - 2.0).abs() < f64::EPSILON);
        self.logarithm_of(ratio) * 12.0
    }
}

impl NumericCache for LogarithmCache {
    type Config = LogarithmConfig;
    const KIND: CacheKind = CacheKind::Logarithm;

    fn generate(config: LogarithmConfig) -> Self {
        let config = LogarithmConfig {
            resolution: config.resolution.max(1),
            ..config
        };
        let resolution = f64::from(config.resolution);
        let Some(len) = config.table_len() else {
            tracing::warn!(?config, "logarithm table not representable, using defaults");
            return Self::generate(LogarithmConfig::default());
        };
        let values = (0..len)
            .map(|i| config.base.powf(config.lowest_exponent + i as f64 / resolution) as f32)
            .collect();
        Self { config, values }
    }

    fn config(&self) -> LogarithmConfig {
        self.config
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        BlobWriter::new(Self::KIND)
            .param(self.config.base)
            .param(self.config.lowest_exponent)
            .param(self.config.highest_exponent)
            .param(f64::from(self.config.resolution))
            .table(&self.values)
            .finish()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BlobReader::new(Self::KIND, bytes)?;
        let config = LogarithmConfig {
            base: reader.param()?,
            lowest_exponent: reader.param()?,
            highest_exponent: reader.param()?,
            resolution: reader.count(1, u32::MAX as usize)? as u32,
        };
        let len = config
            .table_len()
            .ok_or_else(|| Error::cache_blob(Self::KIND.identity(), "unusable base or span"))?;
        let values = reader.table(len)?;
        reader.finish()?;
        Ok(Self { config, values })
    }
}
