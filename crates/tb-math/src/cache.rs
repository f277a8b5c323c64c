//! Memoization storage for rendered equations.
//!
//! [`EquationCache`] is the only state shared between concurrent compiles.
//! Implementations must tolerate concurrent reads and duplicate writes of the
//! same key; the value for a key never changes, so last-write-wins is fine.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::key::EquationKey;

/// Key-value store for rendered equation markup.
pub trait EquationCache: Send + Sync {
    /// Look up previously rendered markup.
    fn get(&self, key: &EquationKey<'_>) -> Option<String>;

    /// Store rendered markup, overwriting any existing entry.
    fn set(&self, key: &EquationKey<'_>, markup: &str);
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEquationCache;

impl EquationCache for NullEquationCache {
    fn get(&self, _key: &EquationKey<'_>) -> Option<String> {
        None
    }

    fn set(&self, _key: &EquationKey<'_>, _markup: &str) {}
}

/// In-process cache shared across compiles of one build.
#[derive(Debug, Default)]
pub struct MemoryEquationCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryEquationCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EquationCache for MemoryEquationCache {
    fn get(&self, key: &EquationKey<'_>) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries.get(&key.compute_hash()).cloned()
    }

    fn set(&self, key: &EquationKey<'_>, markup: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.compute_hash(), markup.to_owned());
        }
    }
}

/// File-backed cache persisted between builds.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION        # cache format version
/// +-- 3f/
///     +-- 3fa9...e1  # rendered markup for one key
/// ```
///
/// Entries are written to a temporary file and renamed into place, so a
/// concurrent reader sees either nothing or a complete entry.
#[derive(Debug)]
pub struct FileEquationCache {
    root: PathBuf,
    counter: AtomicUsize,
}

impl FileEquationCache {
    /// Open a cache at `root`, wiping it if the stored version differs.
    ///
    /// Problems creating the directory are logged and leave a cache that
    /// simply misses.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self {
            root,
            counter: AtomicUsize::new(0),
        }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[..2]).join(hash)
    }
}

impl EquationCache for FileEquationCache {
    fn get(&self, key: &EquationKey<'_>) -> Option<String> {
        fs::read_to_string(self.entry_path(&key.compute_hash())).ok()
    }

    fn set(&self, key: &EquationKey<'_>, markup: &str) {
        let hash = key.compute_hash();
        let path = self.entry_path(&hash);
        let Some(dir) = path.parent() else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), "failed to create equation cache directory: {e}");
            return;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".{hash}.{}.{n}", std::process::id()));
        if let Err(e) = fs::write(&tmp, markup).and_then(|()| fs::rename(&tmp, &path)) {
            tracing::warn!(path = %path.display(), "failed to write equation cache entry: {e}");
            let _ = fs::remove_file(&tmp);
        }
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("equation cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "equation cache version mismatch (stored={stored}, current={version}), wiping"
            );
        }
        Err(_) => {
            tracing::info!("no equation cache VERSION file found, initializing");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove equation cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create equation cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write equation cache VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: EquationKey<'static> = EquationKey {
        source: "x+1",
        inline: true,
    };

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullEquationCache;
        cache.set(&KEY, "<svg/>");
        assert_eq!(cache.get(&KEY), None);
    }

    #[test]
    fn test_memory_cache_roundtrip() {
        let cache = MemoryEquationCache::new();
        assert!(cache.is_empty());

        cache.set(&KEY, "<svg>a</svg>");
        assert_eq!(cache.get(&KEY).as_deref(), Some("<svg>a</svg>"));

        let display = EquationKey {
            inline: false,
            ..KEY
        };
        assert_eq!(cache.get(&display), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_cache_overwrite() {
        let cache = MemoryEquationCache::new();
        cache.set(&KEY, "one");
        cache.set(&KEY, "two");
        assert_eq!(cache.get(&KEY).as_deref(), Some("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_file_cache_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let cache = FileEquationCache::new(tmp.path().join("math"), "v1");

        assert_eq!(cache.get(&KEY), None);
        cache.set(&KEY, "<svg>x</svg>");
        assert_eq!(cache.get(&KEY).as_deref(), Some("<svg>x</svg>"));

        // Reopening with the same version keeps entries
        let reopened = FileEquationCache::new(tmp.path().join("math"), "v1");
        assert_eq!(reopened.get(&KEY).as_deref(), Some("<svg>x</svg>"));
    }

    #[test]
    fn test_file_cache_version_mismatch_wipes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("math");

        let cache = FileEquationCache::new(root.clone(), "v1");
        cache.set(&KEY, "<svg>x</svg>");

        let cache = FileEquationCache::new(root.clone(), "v2");
        assert_eq!(cache.get(&KEY), None);
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "v2");
    }

    #[test]
    fn test_file_cache_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let cache = FileEquationCache::new(tmp.path().join("math"), "v1");
        cache.set(&KEY, "a");
        cache.set(&KEY, "b");

        let hash = KEY.compute_hash();
        let shard = tmp.path().join("math").join(&hash[..2]);
        let names: Vec<String> = fs::read_dir(shard)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![hash]);
    }
}
