//! Amplitude ↔ decibel table.

use super::{BlobReader, BlobWriter, CacheKind, NumericCache, nearest_index, span_len};
use crate::Result;
use crate::math::db_to_linear;

/// Decibel table parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecibelConfig {
    /// Lowest representable level; anything quieter maps here.
    pub lowest_decibel: f32,
    /// Highest representable level.
    pub highest_decibel: f32,
    /// Table entries per decibel.
    pub resolution: u32,
}

impl Default for DecibelConfig {
    fn default() -> Self {
        Self {
            lowest_decibel: -120.0,
            highest_decibel: 24.0,
            resolution: 100,
        }
    }
}

impl DecibelConfig {
    fn span(&self) -> f64 {
        f64::from(self.highest_decibel) - f64::from(self.lowest_decibel)
    }
}

/// Linear PCM amplitude for every decibel step between the configured bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DecibelCache {
    config: DecibelConfig,
    pcm: Vec<f32>,
}

impl DecibelCache {
    /// Lowest representable level.
    pub fn lowest_decibel(&self) -> f32 {
        self.config.lowest_decibel
    }

    /// Linear amplitude of `decibel`, clamped to the table range.
    pub fn pcm_of(&self, decibel: f32) -> f32 {
        let offset = (decibel - self.config.lowest_decibel) * self.config.resolution as f32;
        let index = (offset.round().max(0.0) as usize).min(self.pcm.len() - 1);
        self.pcm[index]
    }

    /// Decibel level of a linear amplitude, clamped to the table range.
    ///
    /// The sign of `pcm` is ignored.
    pub fn decibel_of(&self, pcm: f32) -> f32 {
        let pcm = pcm.abs();
        if pcm <= self.pcm[0] {
            return self.config.lowest_decibel;
        }
        let index = nearest_index(&self.pcm, pcm);
        self.config.lowest_decibel + index as f32 / self.config.resolution as f32
    }
}

impl NumericCache for DecibelCache {
    type Config = DecibelConfig;
    const KIND: CacheKind = CacheKind::Decibel;

    fn generate(config: DecibelConfig) -> Self {
        let resolution = config.resolution.max(1) as f32;
        let config = DecibelConfig {
            resolution: resolution as u32,
            ..config
        };
        let Some(len) = span_len(config.span(), f64::from(config.resolution)) else {
            tracing::warn!(?config, "decibel range not representable, using defaults");
            return Self::generate(DecibelConfig::default());
        };
        let pcm = (0..len)
            .map(|i| db_to_linear(config.lowest_decibel + i as f32 / resolution))
            .collect();
        Self { config, pcm }
    }

    fn config(&self) -> DecibelConfig {
        self.config
    }

    fn len(&self) -> usize {
        self.pcm.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        BlobWriter::new(Self::KIND)
            .param(f64::from(self.config.lowest_decibel))
            .param(f64::from(self.config.highest_decibel))
            .param(f64::from(self.config.resolution))
            .table(&self.pcm)
            .finish()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BlobReader::new(Self::KIND, bytes)?;
        let config = DecibelConfig {
            lowest_decibel: reader.param()? as f32,
            highest_decibel: reader.param()? as f32,
            resolution: reader.count(1, u32::MAX as usize)? as u32,
        };
        let len = reader.span_len(config.span(), f64::from(config.resolution))?;
        let pcm = reader.table(len)?;
        reader.finish()?;
        Ok(Self { config, pcm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::cache::tests::overwrite_param;

    fn hundred_db() -> DecibelCache {
        DecibelCache::generate(DecibelConfig {
            lowest_decibel: -100.0,
            highest_decibel: 0.0,
            resolution: 100,
        })
    }

    #[test]
    fn known_levels() {
        let cache = hundred_db();
        assert!((cache.pcm_of(-100.0) - 1e-5).abs() < 1e-9);
        assert_eq!(cache.pcm_of(0.0), 1.0);
        assert!((cache.pcm_of(-6.02) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn clamps_outside_range() {
        let cache = hundred_db();
        assert_eq!(cache.pcm_of(-300.0), cache.pcm_of(-100.0));
        assert_eq!(cache.pcm_of(12.0), 1.0);
        assert_eq!(cache.decibel_of(0.0), -100.0);
        assert_eq!(cache.decibel_of(4.0), 0.0);
    }

    #[test]
    fn decibel_pcm_roundtrip() {
        let cache = hundred_db();
        for db in [-90.0f32, -40.0, -12.5, -0.01] {
            let back = cache.decibel_of(cache.pcm_of(db));
            assert!((back - db).abs() < 0.011, "{db} -> {back}");
        }
    }

    #[test]
    fn corrupt_header_is_an_error() {
        let blob = hundred_db().to_bytes();
        for (index, value) in [(1, f64::INFINITY), (0, f64::NAN), (1, -1000.0), (2, 0.0)] {
            let mut corrupt = blob.clone();
            overwrite_param(&mut corrupt, index, value);
            assert!(
                matches!(
                    DecibelCache::from_bytes(&corrupt),
                    Err(Error::CacheBlob { .. })
                ),
                "param {index} = {value}"
            );
        }
    }

    #[test]
    fn unrepresentable_config_falls_back_to_defaults() {
        let cache = DecibelCache::generate(DecibelConfig {
            highest_decibel: f32::INFINITY,
            ..DecibelConfig::default()
        });
        assert_eq!(cache.config(), DecibelConfig::default());
    }

    #[test]
    fn persisted_blob_answers_identically() {
        let cache = hundred_db();
        let restored = DecibelCache::from_bytes(&cache.to_bytes()).unwrap();
        assert_eq!(restored, cache);
        assert!((restored.decibel_of(restored.pcm_of(-40.0)) + 40.0).abs() < 0.011);
    }
}
