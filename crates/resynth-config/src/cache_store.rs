//! File-backed persistence for the numeric caches.
//!
//! Each cache is stored as `<dir>/<identity>.bin`, holding the blob produced
//! by [`CacheSet::to_bytes`]. Loading reads whatever is present and
//! regenerates the rest; a blob that no longer decodes is regenerated and
//! overwritten rather than failing the caller.

use std::path::{Path, PathBuf};

use resynth_core::{CacheKind, CacheSet};

use crate::ConfigError;
use crate::paths;

/// Extension of persisted cache blobs.
const BLOB_EXTENSION: &str = "bin";

/// A directory of persisted cache blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Store rooted at `dir`. Nothing is touched until loading or saving.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform cache directory.
    pub fn user() -> Self {
        Self::new(paths::user_cache_dir())
    }

    /// Directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the blob of `kind`.
    pub fn path_of(&self, kind: CacheKind) -> PathBuf {
        self.dir
            .join(kind.identity())
            .with_extension(BLOB_EXTENSION)
    }

    /// Restore every cache from disk, generating and saving missing ones.
    ///
    /// Returns the set together with the kinds that had to be generated.
    pub fn load_or_generate(&self) -> Result<(CacheSet, Vec<CacheKind>), ConfigError> {
        // Defaults double as the fallback for any blob we cannot use.
        let mut set = CacheSet::generate();
        let mut generated = Vec::new();

        for kind in CacheKind::ALL {
            let path = self.path_of(kind);
            match std::fs::read(&path) {
                Ok(bytes) => match set.load(kind, &bytes) {
                    Ok(()) => {
                        tracing::info!(cache = %kind, bytes = bytes.len(), "cache reloaded");
                    }
                    Err(e) => {
                        tracing::warn!(cache = %kind, error = %e, "stale cache blob, regenerating");
                        generated.push(kind);
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!(cache = %kind, "cache not found, generating");
                    generated.push(kind);
                }
                Err(e) => return Err(ConfigError::read_file(path, e)),
            }
        }

        if !generated.is_empty() {
            paths::ensure_dir(&self.dir)?;
            for &kind in &generated {
                self.write(&set, kind)?;
            }
        }
        Ok((set, generated))
    }

    /// Persist every member of `set`.
    pub fn save(&self, set: &CacheSet) -> Result<(), ConfigError> {
        paths::ensure_dir(&self.dir)?;
        for kind in CacheKind::ALL {
            self.write(set, kind)?;
        }
        Ok(())
    }

    /// Delete every persisted blob. Missing files are ignored.
    pub fn clear(&self) -> Result<(), ConfigError> {
        for kind in CacheKind::ALL {
            let path = self.path_of(kind);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(cache = %kind, "cache blob removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ConfigError::write_file(path, e)),
            }
        }
        Ok(())
    }

    fn write(&self, set: &CacheSet, kind: CacheKind) -> Result<(), ConfigError> {
        let path = self.path_of(kind);
        let bytes = set.to_bytes(kind);
        std::fs::write(&path, &bytes).map_err(|e| ConfigError::write_file(&path, e))?;
        tracing::debug!(cache = %kind, bytes = bytes.len(), path = %path.display(), "cache saved");
        Ok(())
    }
}
