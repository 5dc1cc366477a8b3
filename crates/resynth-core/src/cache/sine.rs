//! One tabulated sine cycle.

use super::{BlobReader, BlobWriter, CacheKind, MAX_TABLE_LEN, NumericCache, sample_uniform};
use crate::Result;

/// Sine table parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineWaveConfig {
    /// Samples per cycle.
    pub length: usize,
}

impl Default for SineWaveConfig {
    fn default() -> Self {
        Self { length: 1 << 14 }
    }
}

/// `sin(2π·phase)` sampled over one cycle (with the closing sample repeated).
#[derive(Debug, Clone, PartialEq)]
pub struct SineWaveCache {
    table: Vec<f32>,
}

impl SineWaveCache {
    /// Sine of a phase expressed as a fraction of a cycle.
    ///
    /// Phases outside `[0, 1)` wrap.
    #[inline]
    pub fn sin_of(&self, phase: f64) -> f32 {
        sample_uniform(&self.table, phase.rem_euclid(1.0))
    }

    /// Cosine of a phase expressed as a fraction of a cycle.
    #[inline]
    pub fn cos_of(&self, phase: f64) -> f32 {
        self.sin_of(phase + 0.25)
    }
}

impl NumericCache for SineWaveCache {
    type Config = SineWaveConfig;
    const KIND: CacheKind = CacheKind::SineWave;

    fn generate(config: SineWaveConfig) -> Self {
        let length = config.length.clamp(4, MAX_TABLE_LEN - 1);
        let table = (0..=length)
            .map(|i| (core::f64::consts::TAU * i as f64 / length as f64).sin() as f32)
            .collect();
        Self { table }
    }

    fn config(&self) -> SineWaveConfig {
        SineWaveConfig {
            length: self.table.len() - 1,
        }
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        BlobWriter::new(Self::KIND)
            .param((self.table.len() - 1) as f64)
            .table(&self.table)
            .finish()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BlobReader::new(Self::KIND, bytes)?;
        let length = reader.count(4, MAX_TABLE_LEN - 1)?;
        let table = reader.table(length + 1)?;
        reader.finish()?;
        Ok(Self { table })
    }
}
