//! Hann window and its cumulative integral.

use super::{BlobReader, BlobWriter, CacheKind, MAX_TABLE_LEN, NumericCache, sample_uniform};
use crate::Result;

/// Hann table parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HannWindowConfig {
    /// Number of intervals the window is sampled over.
    pub length: usize,
}

impl Default for HannWindowConfig {
    fn default() -> Self {
        Self { length: 1 << 12 }
    }
}

/// Hann window sampled over `[0, 1]`, plus its running integral.
///
/// The integral is measured in window lengths, so its last entry is the
/// window's mean value.
#[derive(Debug, Clone, PartialEq)]
pub struct HannWindowCache {
    values: Vec<f32>,
    integral: Vec<f32>,
}

impl HannWindowCache {
    /// Window value at a position ratio in `[0, 1]`.
    #[inline]
    pub fn value_at(&self, ratio: f64) -> f32 {
        sample_uniform(&self.values, ratio)
    }

    /// Area of the window left of `ratio`, in window lengths.
    pub fn integral_at(&self, ratio: f64) -> f32 {
        sample_uniform(&self.integral, ratio)
    }

    /// Width of a rectangle of equal area and peak height, as a fraction of
    /// the window. Hann windows overlapped at this hop ratio sum to a constant.
    pub fn effective_ratio(&self) -> f64 {
        f64::from(self.integral_at(1.0))
    }

    /// Periodic window coefficients for a frame of `size` samples.
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| self.value_at(i as f64 / size as f64))
            .collect()
    }
}

impl NumericCache for HannWindowCache {
    type Config = HannWindowConfig;
    const KIND: CacheKind = CacheKind::HannWindow;

    fn generate(config: HannWindowConfig) -> Self {
        let length = config.length.clamp(4, MAX_TABLE_LEN - 1);
        let values: Vec<f32> = (0..=length)
            .map(|i| {
                let x = core::f64::consts::TAU * i as f64 / length as f64;
                (0.5 * (1.0 - x.cos())) as f32
            })
            .collect();
        Self::from_values(values)
    }

    fn config(&self) -> HannWindowConfig {
        HannWindowConfig {
            length: self.values.len() - 1,
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        BlobWriter::new(Self::KIND)
            .param((self.values.len() - 1) as f64)
            .table(&self.values)
            .table(&self.integral)
            .finish()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BlobReader::new(Self::KIND, bytes)?;
        let length = reader.count(4, MAX_TABLE_LEN - 1)?;
        let values = reader.table(length + 1)?;
        let integral = reader.table(length + 1)?;
        reader.finish()?;
        Ok(Self { values, integral })
    }
}

impl HannWindowCache {
    fn from_values(values: Vec<f32>) -> Self {
        // Trapezoidal running sum, in window lengths.
        let intervals = values.len().saturating_sub(1).max(1) as f64;
        let mut integral = Vec::with_capacity(values.len());
        let mut acc = 0.0f64;
        integral.push(0.0);
        for pair in values.windows(2) {
            acc += 0.5 * f64::from(pair[0] + pair[1]) / intervals;
            integral.push(acc as f32);
        }
        Self { values, integral }
    }
}
