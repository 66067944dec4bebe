// Durable key/value store backing response memoization.
// One JSON object on disk; the whole file expires together after 24 hours.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tracing::debug;

use crate::error::{HerdError, Result};

/// Age past which the durable cache file is treated as empty.
pub const MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// In-memory mapping from call-key digests to cached JSON values.
///
/// Loaded once at startup, mutated in memory, persisted once at shutdown
/// (or immediately on `clear`). Exclusively owned by its constructor.
pub struct CacheStore {
    location: PathBuf,
    data: HashMap<String, Value>,
}

impl CacheStore {
    /// Create an empty store backed by the given file.
    pub fn new(location: PathBuf) -> Self {
        Self {
            location,
            data: HashMap::new(),
        }
    }

    /// Create a store and populate it from the durable file.
    pub fn open(location: PathBuf) -> Self {
        let mut store = Self::new(location);
        store.load();
        store
    }

    /// Populate the mapping from the durable file.
    ///
    /// A missing, stale (older than [`MAX_CACHE_AGE`]), or unparseable file
    /// resets the mapping to empty. A cold cache is never an error.
    pub fn load(&mut self) {
        self.data = match self.read_fresh() {
            Some(data) => data,
            None => HashMap::new(),
        };
    }

    fn read_fresh(&self) -> Option<HashMap<String, Value>> {
        let modified = fs::metadata(&self.location).ok()?.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;
        if age > MAX_CACHE_AGE {
            debug!(path = %self.location.display(), "cache file stale, starting cold");
            return None;
        }
        let contents = fs::read_to_string(&self.location).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Serialize the whole mapping to the durable file, overwriting it.
    pub fn store(&self) -> Result<()> {
        if let Some(parent) = self.location.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.data)?;

        // Write atomically via temp file
        let temp_path = self.location.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.location)?;
        Ok(())
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.data
            .get(key)
            .ok_or_else(|| HerdError::KeyNotFound(key.to_string()))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Upsert a value in memory; not durable until [`CacheStore::store`].
    pub fn save(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    /// Remove a single key. Missing keys are a no-op.
    pub fn invalidate(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Reset the mapping to empty and persist immediately.
    pub fn clear(&mut self) -> Result<()> {
        self.data = HashMap::new();
        self.store()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("cache.json"))
    }

    fn backdate(path: &std::path::Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_save_get_exists() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(!store.exists("abc123"));
        store.save("abc123".to_string(), json!(42));
        assert!(store.exists("abc123"));
        assert_eq!(store.get("abc123").unwrap(), &json!(42));
    }

    #[test]
    fn test_get_missing_key_fails() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(
            store.get("missing"),
            Err(HerdError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.save("abc123".to_string(), json!(1));
        store.invalidate("abc123");
        assert!(!store.exists("abc123"));
        store.invalidate("abc123"); // no-op
    }

    #[test]
    fn test_store_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.save("abc123".to_string(), json!({"n": 7}));
        store.store().unwrap();

        let reloaded = CacheStore::open(dir.path().join("cache.json"));
        assert_eq!(reloaded.get("abc123").unwrap(), &json!({"n": 7}));
    }

    #[test]
    fn test_fresh_file_loads_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"abc123": 42}"#).unwrap();
        backdate(&path, Duration::from_secs(60 * 60)); // 1 hour old

        let store = CacheStore::open(path);
        assert_eq!(store.get("abc123").unwrap(), &json!(42));
    }

    #[test]
    fn test_stale_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"abc123": 42}"#).unwrap();
        backdate(&path, Duration::from_secs(25 * 60 * 60)); // 25 hours old

        let store = CacheStore::open(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::open(dir.path().join("nonexistent.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json {").unwrap();

        let store = CacheStore::open(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_empties_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = CacheStore::new(path.clone());

        store.save("abc123".to_string(), json!(1));
        store.clear().unwrap();
        assert!(store.is_empty());

        // Durable copy is the empty mapping, not the old contents.
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{}");
    }
}
