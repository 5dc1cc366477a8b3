//! Precomputed lookup tables.
//!
//! Every cache is a closed variant behind the [`NumericCache`] capability:
//! it is generated once from a small configuration record, serialized to an
//! opaque byte blob for an external store, and restored verbatim on the next
//! run. Queries never recompute the underlying function.
//!
//! Lookups in the non-uniform direction use [`nearest_index`], a
//! fixed-iteration search over a monotonic table. It always costs
//! `log2(len)` probes and returns an index that is the nearest entry or one
//! of its immediate neighbours' nearest, which is plenty for 0.01 dB or
//! 1-cent tables.

mod decibel;
mod frequency;
mod hann;
mod logarithm;
mod sine;

pub use decibel::{DecibelCache, DecibelConfig};
pub use frequency::{DiscreteFrequencyCache, DiscreteFrequencyConfig};
pub use hann::{HannWindowCache, HannWindowConfig};
pub use logarithm::{LogarithmCache, LogarithmConfig};
pub use sine::{SineWaveCache, SineWaveConfig};

use std::fmt;

use crate::{Error, Result};

/// Identity of a cache variant, used as the persistence key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Amplitude ↔ decibel.
    Decibel,
    /// Frequency ↔ equal-tempered scale step.
    DiscreteFrequency,
    /// Value ↔ logarithm in a fixed base.
    Logarithm,
    /// One tabulated sine cycle.
    SineWave,
    /// Hann window and its cumulative integral.
    HannWindow,
}

impl CacheKind {
    /// All cache variants, in persistence order.
    pub const ALL: [CacheKind; 5] = [
        CacheKind::Decibel,
        CacheKind::DiscreteFrequency,
        CacheKind::Logarithm,
        CacheKind::SineWave,
        CacheKind::HannWindow,
    ];

    /// Stable identity string.
    pub fn identity(self) -> &'static str {
        match self {
            CacheKind::Decibel => "decibel",
            CacheKind::DiscreteFrequency => "discrete-frequency",
            CacheKind::Logarithm => "logarithm",
            CacheKind::SineWave => "sine-wave",
            CacheKind::HannWindow => "hann-window",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identity())
    }
}

/// Capability shared by all lookup tables.
pub trait NumericCache: Sized {
    /// Construction parameters.
    type Config: Copy + Default + PartialEq + fmt::Debug;

    /// Which variant this is.
    const KIND: CacheKind;

    /// Compute the tables for `config`.
    fn generate(config: Self::Config) -> Self;

    /// Parameters this cache was generated with.
    fn config(&self) -> Self::Config;

    /// Number of entries in the primary table.
    fn len(&self) -> usize;

    /// Whether the primary table is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize to an opaque blob.
    fn to_bytes(&self) -> Vec<u8>;

    /// Restore from a blob produced by [`NumericCache::to_bytes`].
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Index of the entry of a monotonic table nearest to `target`.
///
/// Runs a fixed number of probes over a floating index (halving the step
/// each time, clamped to the table bounds), then settles between the final
/// probe and its neighbours. Works for ascending and descending tables.
pub fn nearest_index(values: &[f32], target: f32) -> usize {
    let len = values.len();
    if len < 2 {
        return 0;
    }
    let last = (len - 1) as f64;
    let ascending = values[len - 1] >= values[0];
    let iterations = usize::BITS - (len - 1).leading_zeros();

    let mut index = last / 2.0;
    let mut step = last / 4.0;
    for _ in 0..=iterations {
        let probe = values[index.round() as usize];
        if (probe < target) == ascending {
            index += step;
        } else {
            index -= step;
        }
        index = index.clamp(0.0, last);
        step *= 0.5;
    }

    let center = index.round() as usize;
    let lo = center.saturating_sub(1);
    let hi = (center + 1).min(len - 1);
    (lo..=hi)
        .min_by(|&a, &b| {
            (values[a] - target)
                .abs()
                .total_cmp(&(values[b] - target).abs())
        })
        .unwrap_or(center)
}

/// Sample a table laid out uniformly over `[0, 1]` with linear interpolation.
pub(crate) fn sample_uniform(values: &[f32], ratio: f64) -> f32 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        len => {
            let position = ratio.clamp(0.0, 1.0) * (len - 1) as f64;
            let i = (position.floor() as usize).min(len - 2);
            let frac = (position - i as f64) as f32;
            values[i] + (values[i + 1] - values[i]) * frac
        }
    }
}

/// Upper bound on the entries of any table, generated or restored.
pub(crate) const MAX_TABLE_LEN: usize = 1 << 26;

/// Entries of a table spanning `span` units at `resolution` entries per unit,
/// both endpoints included.
///
/// `None` when the span is negative, non-finite or exceeds [`MAX_TABLE_LEN`].
pub(crate) fn span_len(span: f64, resolution: f64) -> Option<usize> {
    let intervals = (span * resolution).round();
    if !intervals.is_finite() || intervals < 0.0 || intervals >= MAX_TABLE_LEN as f64 {
        return None;
    }
    (intervals as usize).checked_add(1)
}

/// Little-endian blob writer: a header of `f64` parameters then an `f32` table.
pub(crate) struct BlobWriter {
    bytes: Vec<u8>,
}

impl BlobWriter {
    pub(crate) fn new(kind: CacheKind) -> Self {
        let identity = kind.identity().as_bytes();
        let mut bytes = Vec::with_capacity(64);
        bytes.push(identity.len() as u8);
        bytes.extend_from_slice(identity);
        Self { bytes }
    }

    pub(crate) fn param(mut self, value: f64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn table(mut self, values: &[f32]) -> Self {
        self.bytes
            .extend_from_slice(&(values.len() as u64).to_le_bytes());
        self.bytes.reserve(values.len() * 4);
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reader for blobs produced by [`BlobWriter`].
pub(crate) struct BlobReader<'a> {
    kind: CacheKind,
    bytes: &'a [u8],
}

impl<'a> BlobReader<'a> {
    pub(crate) fn new(kind: CacheKind, bytes: &'a [u8]) -> Result<Self> {
        let identity = kind.identity().as_bytes();
        let (&len, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::cache_blob(kind.identity(), "empty blob"))?;
        if rest.len() < len as usize || &rest[..len as usize] != identity {
            return Err(Error::cache_blob(kind.identity(), "identity mismatch"));
        }
        Ok(Self {
            kind,
            bytes: &rest[len as usize..],
        })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(self.error("truncated blob"));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    /// A finite header parameter.
    pub(crate) fn param(&mut self) -> Result<f64> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        let value = f64::from_le_bytes(buf);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.error(format!("non-finite parameter {value}")))
        }
    }

    /// An integral header parameter within `min..=max`.
    pub(crate) fn count(&mut self, min: usize, max: usize) -> Result<usize> {
        let value = self.param()?;
        if value.fract() != 0.0 || value < min as f64 || value > max as f64 {
            return Err(self.error(format!("parameter {value} outside {min}..={max}")));
        }
        Ok(value as usize)
    }

    /// Table length implied by the header, or an error naming the bad span.
    pub(crate) fn span_len(&self, span: f64, resolution: f64) -> Result<usize> {
        span_len(span, resolution)
            .ok_or_else(|| self.error(format!("span {span} at resolution {resolution}")))
    }

    pub(crate) fn table(&mut self, expected_len: usize) -> Result<Vec<f32>> {
        let len = self.param_u64()?;
        if usize::try_from(len).ok() != Some(expected_len) {
            return Err(self.error(format!("table length {len}, expected {expected_len}")));
        }
        let bytes = expected_len
            .checked_mul(4)
            .ok_or_else(|| self.error("table too large"))?;
        let raw = self.take(bytes)?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn param_u64(&mut self) -> Result<u64> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_le_bytes(buf))
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(self.error("trailing bytes"))
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::cache_blob(self.kind.identity(), reason)
    }
}

/// The process-wide, read-only set of caches.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSet {
    /// Amplitude ↔ decibel.
    pub decibel: DecibelCache,
    /// Frequency ↔ scale step.
    pub frequency: DiscreteFrequencyCache,
    /// Base-2 logarithms for transposition ratios.
    pub logarithm: LogarithmCache,
    /// Sine cycle for additive rendering.
    pub sine: SineWaveCache,
    /// Hann window and cumulative integral.
    pub hann: HannWindowCache,
}

impl CacheSet {
    /// Generate every cache with its default configuration.
    pub fn generate() -> Self {
        tracing::debug!("generating default cache set");
        Self {
            decibel: DecibelCache::generate(DecibelConfig::default()),
            frequency: DiscreteFrequencyCache::generate(DiscreteFrequencyConfig::default()),
            logarithm: LogarithmCache::generate(LogarithmConfig::default()),
            sine: SineWaveCache::generate(SineWaveConfig::default()),
            hann: HannWindowCache::generate(HannWindowConfig::default()),
        }
    }

    /// Serialize one member of the set.
    pub fn to_bytes(&self, kind: CacheKind) -> Vec<u8> {
        match kind {
            CacheKind::Decibel => self.decibel.to_bytes(),
            CacheKind::DiscreteFrequency => self.frequency.to_bytes(),
            CacheKind::Logarithm => self.logarithm.to_bytes(),
            CacheKind::SineWave => self.sine.to_bytes(),
            CacheKind::HannWindow => self.hann.to_bytes(),
        }
    }

    /// Replace one member of the set from a persisted blob.
    pub fn load(&mut self, kind: CacheKind, bytes: &[u8]) -> Result<()> {
        match kind {
            CacheKind::Decibel => self.decibel = DecibelCache::from_bytes(bytes)?,
            CacheKind::DiscreteFrequency => {
                self.frequency = DiscreteFrequencyCache::from_bytes(bytes)?;
            }
            CacheKind::Logarithm => self.logarithm = LogarithmCache::from_bytes(bytes)?,
            CacheKind::SineWave => self.sine = SineWaveCache::from_bytes(bytes)?,
            CacheKind::HannWindow => self.hann = HannWindowCache::from_bytes(bytes)?,
        }
        tracing::debug!(cache = %kind, "cache restored from blob");
        Ok(())
    }
}

impl Default for CacheSet {
    fn default() -> Self {
        Self::generate()
    }
}
