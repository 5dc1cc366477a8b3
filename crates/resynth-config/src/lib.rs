//! Configuration and persistence for the resynth analysis engine.
//!
//! - **Presets**: named [`ModelParams`](resynth_analysis::ModelParams) stored
//!   as TOML, plus a few built-in factory presets
//! - **Validation**: every out-of-range parameter reported at once
//! - **Cache store**: numeric lookup tables persisted between runs
//! - **Paths**: platform-specific preset and cache directories
//!
//! # Example
//!
//! ```rust,no_run
//! use resynth_config::{AnalysisPreset, CacheStore, get_factory_preset, user_presets_dir};
//!
//! // Reload the lookup tables, generating any that are missing
//! let (_caches, generated) = CacheStore::user().load_or_generate().unwrap();
//! println!("{} tables regenerated", generated.len());
//!
//! // Start from a factory preset and save a tweaked copy
//! let mut preset = get_factory_preset("plucked").unwrap();
//! preset.name = "Nylon".to_string();
//! preset.params.sinusoid.sleep_time = 0.03;
//! preset.save(user_presets_dir().join("nylon.toml")).unwrap();
//!
//! let reloaded = AnalysisPreset::load(user_presets_dir().join("nylon.toml")).unwrap();
//! assert_eq!(reloaded, preset);
//! ```

mod cache_store;
mod error;
mod preset;

/// Platform-specific paths for presets and cached tables.
pub mod paths;

/// Parameter range validation.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use cache_store::CacheStore;
pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset,
};
pub use paths::{
    ensure_user_presets_dir, find_preset, list_user_presets, preset_name_from_path,
    user_cache_dir, user_config_dir, user_presets_dir,
};
pub use preset::AnalysisPreset;
pub use validation::{ValidationError, ValidationResult, validate_params, validate_preset};
