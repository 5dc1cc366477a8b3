//! Analysis parameter bundles.
//!
//! Every stage takes its own immutable parameter record. All records
//! deserialize with missing fields filled from [`Default`], so a preset file
//! only needs to name the values it changes.

use resynth_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Peak picking and tracking parameters for the sinusoid stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinusoidParams {
    /// Analysis window length in samples.
    pub window_size: usize,
    /// Distance between frame centres in samples.
    pub hop_size: usize,
    /// Absolute peak floor in dB.
    pub minimum_decibel: f32,
    /// Peak floor relative to the loudest peak of the frame, in dB.
    ///
    /// When set, the effective floor is the louder of this and
    /// [`minimum_decibel`](Self::minimum_decibel). Serialized as `"off"`
    /// when unset.
    #[serde(with = "relative_floor")]
    pub relative_minimum_decibel: Option<f32>,
    /// Largest step distance (semitones) a trajectory may jump between frames.
    pub continuation_range: f32,
    /// How long a trajectory may stay silent before it is sealed, in seconds.
    pub sleep_time: f64,
    /// Trajectories with fewer points are discarded.
    pub minimum_length: usize,
}

impl Default for SinusoidParams {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 256,
            minimum_decibel: -90.0,
            relative_minimum_decibel: Some(-70.0),
            continuation_range: 1.0,
            sleep_time: 0.05,
            minimum_length: 4,
        }
    }
}

impl SinusoidParams {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        validate_frames(self.window_size, self.hop_size)?;
        if !self.continuation_range.is_finite() || self.continuation_range <= 0.0 {
            return Err(Error::invalid_parameter(
                "continuation_range",
                "must be positive",
            ));
        }
        if !self.sleep_time.is_finite() || self.sleep_time < 0.0 {
            return Err(Error::invalid_parameter("sleep_time", "must be non-negative"));
        }
        if self.minimum_length == 0 {
            return Err(Error::invalid_parameter("minimum_length", "must be at least 1"));
        }
        Ok(())
    }

    /// Silent frames a trajectory may accumulate before it is sealed.
    pub fn sleep_frames(&self, sample_rate: u32) -> usize {
        let frames = self.sleep_time * f64::from(sample_rate) / self.hop_size as f64;
        (frames.round() as usize).max(1)
    }
}

/// Widest bin and frame neighbourhood the transient stage accepts.
pub const MAX_ADJACENCY: usize = 64;

/// Spectral-flux detection parameters for the transient stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientParams {
    /// Analysis window length in samples.
    pub window_size: usize,
    /// Distance between frame centres in samples.
    pub hop_size: usize,
    /// Factor over the local mean flux a bin must exceed to be flagged.
    pub strength: f32,
    /// Half-width of the bin and frame neighbourhoods.
    pub adjacency: usize,
    /// Fraction of flagged bins above which a frame is a transient.
    pub flag_ratio: f32,
    /// Flux below this level (dB) is never flagged.
    pub flux_floor_decibel: f32,
    /// Whether the extracted transient follows pitch transposition.
    pub transposable: bool,
}

impl Default for TransientParams {
    fn default() -> Self {
        Self {
            window_size: 512,
            hop_size: 128,
            strength: 1.1,
            adjacency: 3,
            flag_ratio: 0.15,
            flux_floor_decibel: -60.0,
            transposable: true,
        }
    }
}

impl TransientParams {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        validate_frames(self.window_size, self.hop_size)?;
        if !self.strength.is_finite() || self.strength <= 0.0 {
            return Err(Error::invalid_parameter("strength", "must be positive"));
        }
        if self.adjacency > MAX_ADJACENCY {
            return Err(Error::invalid_parameter(
                "adjacency",
                format!("must be at most {MAX_ADJACENCY}"),
            ));
        }
        if !(self.flag_ratio > 0.0 && self.flag_ratio <= 1.0) {
            return Err(Error::invalid_parameter("flag_ratio", "must be within (0, 1]"));
        }
        if !self.flux_floor_decibel.is_finite() {
            return Err(Error::invalid_parameter("flux_floor_decibel", "must be finite"));
        }
        Ok(())
    }
}

/// Envelope sampling parameters for the noise stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Envelope frames per second.
    pub sampling_frequency: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            sampling_frequency: 100.0,
        }
    }
}

impl NoiseParams {
    /// Check ranges against the signal's sample rate.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if !self.sampling_frequency.is_finite() || self.sampling_frequency <= 0.0 {
            return Err(Error::invalid_parameter(
                "sampling_frequency",
                "must be positive",
            ));
        }
        if self.sampling_frequency > f64::from(sample_rate) {
            return Err(Error::invalid_parameter(
                "sampling_frequency",
                format!("exceeds the sample rate {sample_rate}"),
            ));
        }
        Ok(())
    }

    /// Hop between envelope frames in samples.
    pub fn hop_size(&self, sample_rate: u32) -> usize {
        ((f64::from(sample_rate) / self.sampling_frequency).round() as usize).max(1)
    }
}

/// Parameters of the whole decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Sinusoid stage.
    pub sinusoid: SinusoidParams,
    /// Transient stage.
    pub transient: TransientParams,
    /// Noise stage.
    pub noise: NoiseParams,
}

impl ModelParams {
    /// Validate all stages for a signal at `sample_rate`.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        self.sinusoid.validate()?;
        self.transient.validate()?;
        self.noise.validate(sample_rate)
    }
}

/// `Option<f32>` as either a number or the string `"off"`.
///
/// TOML has no null, so a plain `Option` would fall back to the default
/// floor when read back.
mod relative_floor {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const OFF: &str = "off";

    // serde's `with` fixes the signature.
    #[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(value: &Option<f32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(db) => serializer.serialize_f32(*db),
            None => serializer.serialize_str(OFF),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FloorVisitor)
    }

    struct FloorVisitor;

    impl Visitor<'_> for FloorVisitor {
        type Value = Option<f32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a level in dB or \"off\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if v.eq_ignore_ascii_case(OFF) {
                Ok(None)
            } else {
                Err(E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }
}

fn validate_frames(window_size: usize, hop_size: usize) -> Result<()> {
    if window_size < 4 {
        return Err(Error::invalid_parameter("window_size", "must be at least 4"));
    }
    if hop_size == 0 || hop_size > window_size {
        return Err(Error::invalid_parameter(
            "hop_size",
            format!("must be within 1..={window_size}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ModelParams::default().validate(44100).is_ok());
    }

    #[test]
    fn sleep_frames_rounds_and_floors_at_one() {
        let params = SinusoidParams::default();
        // 0.05 s * 44100 / 256 = 8.6
        assert_eq!(params.sleep_frames(44100), 9);
        let instant = SinusoidParams {
            sleep_time: 0.0,
            ..params
        };
        assert_eq!(instant.sleep_frames(44100), 1);
    }

    #[test]
    fn rejects_hop_larger_than_window() {
        let params = SinusoidParams {
            hop_size: 4096,
            ..SinusoidParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter {
                name: "hop_size",
                ..
            })
        ));
    }

    #[test]
    fn transient_ranges_match_the_detector() {
        let breakages: [fn(&mut TransientParams); 5] = [
            |p| p.flag_ratio = 0.0,
            |p| p.flag_ratio = f32::NAN,
            |p| p.flag_ratio = 1.5,
            |p| p.adjacency = MAX_ADJACENCY + 1,
            |p| p.flux_floor_decibel = f32::NEG_INFINITY,
        ];
        for breakage in breakages {
            let mut params = TransientParams::default();
            breakage(&mut params);
            assert!(params.validate().is_err(), "{params:?}");
        }
        let edges = TransientParams {
            flag_ratio: 1.0,
            adjacency: MAX_ADJACENCY,
            ..TransientParams::default()
        };
        assert!(edges.validate().is_ok());
    }

    #[test]
    fn rejects_noise_rate_above_sample_rate() {
        let params = NoiseParams {
            sampling_frequency: 96000.0,
        };
        assert!(params.validate(44100).is_err());
        assert_eq!(NoiseParams::default().hop_size(44100), 441);
    }
}
