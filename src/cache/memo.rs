// Memoization wrappers around remote operations.
// Read-through caching keyed by operation name + arguments, and
// write-through whole-cache invalidation for mutating operations.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;

use super::store::CacheStore;

/// Derive the cache key for one memoized call.
///
/// The key is the SHA-256 hex digest of the operation name joined with its
/// positional arguments by `_`. Absent arguments are skipped, so calls that
/// differ only in absent arguments collide on the same key; the cache is
/// content-addressed over idempotent reads and this is intentional.
pub fn call_key(name: &str, args: &[Option<&str>]) -> String {
    let mut parts = vec![name];
    parts.extend(args.iter().filter_map(|arg| *arg));

    let mut hasher = Sha256::new();
    hasher.update(parts.join("_"));
    format!("{:x}", hasher.finalize())
}

/// Read-through wrapper: return the cached value when present, otherwise
/// invoke `fetch`, cache its result in memory, and return it.
///
/// Failures of `fetch` propagate unchanged and are never cached. A cached
/// entry that no longer decodes to the requested type is dropped and
/// refetched.
pub fn cached<T, F>(store: &mut CacheStore, name: &str, args: &[Option<&str>], fetch: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    let key = call_key(name, args);

    if store.exists(&key) {
        match serde_json::from_value(store.get(&key)?.clone()) {
            Ok(value) => {
                debug!(op = name, "cache hit");
                return Ok(value);
            }
            Err(err) => {
                warn!(op = name, %err, "cached value no longer decodes, refetching");
                store.invalidate(&key);
            }
        }
    }

    let value = fetch()?;
    store.save(key, serde_json::to_value(&value)?);
    Ok(value)
}

/// Write-through wrapper: invoke `action`, then clear the entire cache.
///
/// A mutation can stale any number of previously cached reads whose
/// dependency set is not tracked, so the whole cache goes. The cache is
/// cleared even when `action` fails, since a failed mutation may have had
/// partial remote effect; the action's error wins over a clear error.
pub fn invalidating<T, F>(store: &mut CacheStore, action: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let result = action();
    match store.clear() {
        Ok(()) => result,
        Err(clear_err) => match result {
            Ok(_) => Err(clear_err),
            Err(err) => {
                warn!(%clear_err, "cache clear failed while handling a failed mutation");
                Err(err)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HerdError;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("cache.json"))
    }

    #[test]
    fn test_call_key_skips_absent_arguments() {
        let with_gaps = call_key("pr_list", &[Some("acme/one"), None, Some("clean")]);
        let without = call_key("pr_list", &[Some("acme/one"), Some("clean")]);
        assert_eq!(with_gaps, without);

        let different = call_key("pr_list", &[Some("acme/two"), Some("clean")]);
        assert_ne!(with_gaps, different);
    }

    #[test]
    fn test_call_key_is_hex_digest() {
        let key = call_key("workflow_list", &[Some("acme/one")]);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_read_through_invokes_underlying_once() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let mut calls = 0;

        for _ in 0..2 {
            let value: u64 = cached(&mut store, "op", &[Some("a")], || {
                calls += 1;
                Ok(17)
            })
            .unwrap();
            assert_eq!(value, 17);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let result: Result<u64> = cached(&mut store, "op", &[], || {
            Err(HerdError::Other("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.is_empty());

        // A later call still invokes the underlying operation.
        let value: u64 = cached(&mut store, "op", &[], || Ok(3)).unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_write_invalidates_all() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let first: u64 = cached(&mut store, "op", &[Some("a")], || Ok(1)).unwrap();
        assert_eq!(first, 1);

        invalidating(&mut store, || Ok(())).unwrap();

        // The underlying value changed; a fresh fetch must observe it.
        let second: u64 = cached(&mut store, "op", &[Some("a")], || Ok(2)).unwrap();
        assert_eq!(second, 2);
    }

    #[test]
    fn test_failed_write_still_invalidates() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save("abc123".to_string(), json!(1));

        let result: Result<()> =
            invalidating(&mut store, || Err(HerdError::Other("boom".to_string())));
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_undecodable_entry_is_refetched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save(call_key("op", &[]), json!("not a number"));

        let value: u64 = cached(&mut store, "op", &[], || Ok(9)).unwrap();
        assert_eq!(value, 9);
    }
}
