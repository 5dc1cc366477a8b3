//! Platform-specific paths for presets and cached tables.
//!
//! # Directory Structure
//!
//! - **User presets**: `~/.config/resynth/presets/` (Linux), `~/Library/Application Support/resynth/presets/` (macOS), `%APPDATA%\resynth\presets\` (Windows)
//! - **User config**: `~/.config/resynth/` (Linux), `~/Library/Application Support/resynth/` (macOS), `%APPDATA%\resynth\` (Windows)
//! - **Cache tables**: `~/.cache/resynth/tables/` (Linux), `~/Library/Caches/resynth/tables/` (macOS), `%LOCALAPPDATA%\resynth\tables\` (Windows)
//!
//! # Example
//!
//! ```rust,no_run
//! use resynth_config::paths;
//!
//! if let Some(path) = paths::find_preset("plucked") {
//!     println!("Found preset at: {:?}", path);
//! }
//! println!("Tables live in {:?}", paths::user_cache_dir());
//! ```

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "resynth";

/// Subdirectory name for presets.
const PRESETS_SUBDIR: &str = "presets";

/// Subdirectory name for persisted cache tables.
const TABLES_SUBDIR: &str = "tables";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform has none.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific presets directory.
pub fn user_presets_dir() -> PathBuf {
    user_config_dir().join(PRESETS_SUBDIR)
}

/// Returns the directory holding persisted cache tables.
///
/// Falls back to the current directory if the platform has no cache
/// directory.
pub fn user_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(TABLES_SUBDIR)
}

/// Find a preset file by path or name.
///
/// `name` may be a path to an existing file, or a preset name (with or
/// without `.toml`) looked up in [`user_presets_dir`].
pub fn find_preset(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let user_path = user_presets_dir().join(filename);
    user_path.is_file().then_some(user_path)
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }
    Ok(())
}

/// Ensure the user presets directory exists and return it.
pub fn ensure_user_presets_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_presets_dir();
    ensure_dir(&dir)?;
    Ok(dir)
}

/// List all preset files in the user presets directory.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_user_presets() -> Vec<PathBuf> {
    list_presets_in_dir(&user_presets_dir())
}

/// List the `.toml` files directly inside `dir`, sorted by path.
pub fn list_presets_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut presets: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    presets.sort();
    presets
}

/// Get the preset name (file stem) from a file path.
///
/// ```rust
/// use resynth_config::paths::preset_name_from_path;
/// use std::path::Path;
///
/// let name = preset_name_from_path(Path::new("/path/to/plucked.toml"));
/// assert_eq!(name, Some("plucked".to_string()));
/// ```
pub fn preset_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}
