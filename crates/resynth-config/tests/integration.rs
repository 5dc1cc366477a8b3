//! Integration tests for resynth-config.
//!
//! These tests drive presets and the cache store end to end: files on disk,
//! validation, and analysis with the restored tables.

use std::f32::consts::PI;
use std::sync::Arc;

use resynth_analysis::NoteModels;
use resynth_config::{
    AnalysisPreset, CacheStore, ConfigError, ValidationError, factory_presets,
    get_factory_preset, paths, validate_preset,
};
use resynth_core::{CacheKind, CancellationToken, DspContext};
use tempfile::TempDir;

/// Save every factory preset, list the directory, and load them back.
#[test]
fn test_factory_presets_survive_disk() {
    let temp_dir = TempDir::new().unwrap();
    for preset in factory_presets() {
        let file = temp_dir
            .path()
            .join(format!("{}.toml", preset.name.to_lowercase()));
        preset.save(&file).unwrap();
    }

    let files = paths::list_presets_in_dir(temp_dir.path());
    assert_eq!(files.len(), factory_presets().len());
    for file in files {
        let loaded = AnalysisPreset::load(&file).unwrap();
        let name = paths::preset_name_from_path(&file).unwrap();
        assert_eq!(Some(loaded), get_factory_preset(&name), "{name}");
    }
}

#[test]
fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("deep").join("er").join("p.toml");
    AnalysisPreset::new("Nested").save(&file).unwrap();
    assert_eq!(AnalysisPreset::load(&file).unwrap().name, "Nested");
}

#[test]
fn test_load_missing_file_reports_path() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");
    let err = AnalysisPreset::load(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { ref path, .. } if path == &missing));
}

/// A preset edited by hand into nonsense is caught before analysis, and the
/// analysis itself refuses the same parameters.
#[test]
fn test_invalid_preset_is_rejected_everywhere() {
    let preset = AnalysisPreset::from_toml(
        r#"
name = "Broken"

[params.sinusoid]
window_size = 256
hop_size = 512

[params.noise]
sampling_frequency = 0.0
"#,
    )
    .unwrap();

    let err = validate_preset(&preset, 44100).unwrap_err();
    let ValidationError::Multiple(errors) = &err else {
        panic!("expected two errors, got {err:?}");
    };
    assert_eq!(errors.len(), 2);
    let config_err = ConfigError::from(err.clone());
    assert!(config_err.to_string().starts_with("validation failed"));

    let mut ctx = DspContext::with_seed(Arc::new(resynth_core::CacheSet::generate()), 0);
    let result = NoteModels::build(
        &mut ctx,
        vec![0.0; 4096],
        44100,
        60,
        &preset.params,
        &CancellationToken::new(),
    );
    assert!(result.is_err());
}

/// Tables restored from the store drive the analysis exactly like freshly
/// generated ones.
#[test]
fn test_restored_caches_analyse_identically() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::new(temp_dir.path());
    let (fresh, generated) = store.load_or_generate().unwrap();
    assert_eq!(generated.len(), CacheKind::ALL.len());
    let (restored, generated) = store.load_or_generate().unwrap();
    assert!(generated.is_empty());

    let signal: Vec<f32> = (0..8820)
        .map(|i| 0.5 * (2.0 * PI * 523.25 * i as f32 / 44100.0).sin())
        .collect();
    let params = get_factory_preset("plucked").unwrap().params;
    let cancel = CancellationToken::new();

    let mut a = DspContext::with_seed(Arc::new(fresh), 9);
    let mut b = DspContext::with_seed(Arc::new(restored), 9);
    let note_a = NoteModels::build(&mut a, signal.clone(), 44100, 72, &params, &cancel).unwrap();
    let note_b = NoteModels::build(&mut b, signal, 44100, 72, &params, &cancel).unwrap();
    assert_eq!(note_a, note_b);
}
