//! Analysis preset file format and operations.

use resynth_analysis::ModelParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// A named set of analysis parameters.
///
/// Presets are stored as TOML. Every parameter table is optional; missing
/// values take their defaults, so a preset only lists what it changes.
///
/// # TOML Format
///
/// ```toml
/// name = "Plucked"
/// description = "Short attacks, fast decays"
///
/// [params.sinusoid]
/// sleep_time = 0.02
///
/// [params.transient]
/// strength = 1.05
/// flag_ratio = 0.1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisPreset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parameters of every analysis stage.
    #[serde(default)]
    pub params: ModelParams,
}

impl AnalysisPreset {
    /// Preset with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: ModelParams::default(),
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the parameters.
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let preset = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), name = %preset.name, "preset loaded");
        Ok(preset)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), name = %self.name, "preset saved");
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for AnalysisPreset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_new_has_defaults() {
        let preset = AnalysisPreset::new("Test");
        assert_eq!(preset.name, "Test");
        assert!(preset.description.is_none());
        assert_eq!(preset.params, ModelParams::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
name = "Plucked"
description = "Short attacks"

[params.sinusoid]
sleep_time = 0.02

[params.transient]
strength = 1.05
"#;
        let preset = AnalysisPreset::from_toml(toml).unwrap();
        assert_eq!(preset.name, "Plucked");
        assert_eq!(preset.description.as_deref(), Some("Short attacks"));
        assert_eq!(preset.params.sinusoid.sleep_time, 0.02);
        assert_eq!(preset.params.sinusoid.window_size, 2048);
        assert_eq!(preset.params.transient.strength, 1.05);
        assert_eq!(preset.params.transient.adjacency, 3);
        assert_eq!(preset.params.noise.sampling_frequency, 100.0);
    }

    #[test]
    fn test_minimal_toml() {
        let preset = AnalysisPreset::from_toml("name = \"Minimal\"").unwrap();
        assert_eq!(preset.params, ModelParams::default());
    }

    #[test]
    fn test_preset_roundtrip() {
        let mut params = ModelParams::default();
        params.sinusoid.relative_minimum_decibel = Some(-60.0);
        params.noise.sampling_frequency = 250.0;
        params.transient.transposable = false;
        let original = AnalysisPreset::new("Roundtrip")
            .with_description("Testing serialization")
            .with_params(params);

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("name = \"Roundtrip\""));
        let parsed = AnalysisPreset::from_toml(&toml).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_disabled_relative_floor_roundtrip() {
        let mut params = ModelParams::default();
        params.sinusoid.relative_minimum_decibel = None;
        let original = AnalysisPreset::new("Open floor").with_params(params);

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("relative_minimum_decibel = \"off\""), "{toml}");
        let parsed = AnalysisPreset::from_toml(&toml).unwrap();
        assert_eq!(parsed.params.sinusoid.relative_minimum_decibel, None);
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_relative_floor_accepts_integers_and_rejects_words() {
        let toml = "name = \"x\"\n[params.sinusoid]\nrelative_minimum_decibel = -60";
        let preset = AnalysisPreset::from_toml(toml).unwrap();
        assert_eq!(preset.params.sinusoid.relative_minimum_decibel, Some(-60.0));

        let toml = "name = \"x\"\n[params.sinusoid]\nrelative_minimum_decibel = \"quiet\"";
        assert!(matches!(
            AnalysisPreset::from_toml(toml),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let result =
            AnalysisPreset::from_toml("name = \"x\"\n[params.sinusoid]\nhop_size = \"big\"");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}
