//! Analysis presets bundled with the library.
//!
//! These are embedded at compile time and always available. Each one only
//! lists the parameters it changes from the defaults.

use crate::AnalysisPreset;

/// Names of the factory presets.
pub static FACTORY_PRESET_NAMES: &[&str] = &["init", "plucked", "sustained", "breathy"];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", INIT_PRESET),
    ("plucked", PLUCKED_PRESET),
    ("sustained", SUSTAINED_PRESET),
    ("breathy", BREATHY_PRESET),
];

const INIT_PRESET: &str = r#"
name = "Init"
description = "Default analysis parameters"
"#;

const PLUCKED_PRESET: &str = r#"
name = "Plucked"
description = "Sharp attacks and fast decays: guitars, harps, pizzicato"

[params.sinusoid]
hop_size = 128
sleep_time = 0.02

[params.transient]
strength = 1.05
flag_ratio = 0.1
"#;

const SUSTAINED_PRESET: &str = r#"
name = "Sustained"
description = "Long stable tones: organs, bowed strings, pads"

[params.sinusoid]
window_size = 4096
hop_size = 512
sleep_time = 0.1
minimum_length = 8

[params.transient]
strength = 1.5
flag_ratio = 0.3
"#;

const BREATHY_PRESET: &str = r#"
name = "Breathy"
description = "Strong noise component: flutes, voices, brushed drums"

[params.sinusoid]
relative_minimum_decibel = -50.0
continuation_range = 0.5

[params.noise]
sampling_frequency = 200.0
"#;

/// Load all factory presets.
///
/// Presets that fail to parse are skipped with a warning.
pub fn factory_presets() -> Vec<AnalysisPreset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(name, toml)| match AnalysisPreset::from_toml(toml) {
            Ok(preset) => Some(preset),
            Err(e) => {
                tracing::warn!(preset = name, error = %e, "factory preset failed to parse");
                None
            }
        })
        .collect()
}

/// Get a factory preset by name (case-insensitive).
pub fn get_factory_preset(name: &str) -> Option<AnalysisPreset> {
    let lower = name.to_lowercase();
    FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| *id == lower)
        .and_then(|(_, toml)| AnalysisPreset::from_toml(toml).ok())
}

/// Whether `name` is a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    let lower = name.to_lowercase();
    FACTORY_PRESET_NAMES.contains(&lower.as_str())
}
