use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use super::{Fetched, ResourceResolver};
use crate::error::RenderResult;

/// Metadata stored next to each cached blob as `{hash}.cache.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub name: String,
    pub mime: String,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

/// Content-addressed disk cache in front of another resolver, keyed by the xxh3 hash of the path.
#[derive(Debug, Clone)]
pub struct CachedResolver<R> {
    inner: R,
    dir: PathBuf,
}

impl<R: ResourceResolver> CachedResolver<R> {
    pub fn new(inner: R, dir: impl AsRef<Path>) -> Self {
        Self {
            inner,
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn key(path: &str) -> String {
        format!("{:016x}", xxh3_64(path.as_bytes()))
    }

    pub fn data_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.data"))
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.cache.json"))
    }

    fn read_cached(&self, key: &str) -> Option<Fetched> {
        let record = std::fs::read(self.record_path(key)).ok()?;
        let record: CacheRecord = match serde_json::from_slice(&record) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cache record");
                return None;
            }
        };
        let bytes = std::fs::read(self.data_path(key)).ok()?;
        Some(Fetched {
            bytes,
            filename: record.name,
            mime: record.mime,
        })
    }

    /// Write failures are logged; the fetched bytes are returned regardless.
    fn store(&self, key: &str, fetched: &Fetched) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create cache directory");
            return;
        }
        if let Err(e) = std::fs::write(self.data_path(key), &fetched.bytes) {
            tracing::warn!(key, error = %e, "cannot write cache data");
            return;
        }
        let record = CacheRecord {
            name: fetched.filename.clone(),
            mime: fetched.mime.clone(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let written = serde_json::to_vec_pretty(&record)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(self.record_path(key), json));
        if let Err(e) = written {
            tracing::warn!(key, error = %e, "cannot write cache record");
        }
    }
}

impl<R: ResourceResolver> ResourceResolver for CachedResolver<R> {
    fn fetch(&self, path: &str) -> RenderResult<Fetched> {
        let key = Self::key(path);
        if let Some(hit) = self.read_cached(&key) {
            tracing::debug!(path, key = %key, "resource cache hit");
            return Ok(hit);
        }
        let fetched = self.inner.fetch(path)?;
        self.store(&key, &fetched);
        tracing::debug!(path, key = %key, bytes = fetched.bytes.len(), "resource cached");
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RenderError;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ResourceResolver for Counting {
        fn fetch(&self, path: &str) -> RenderResult<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::resource(format!("offline: {path}")));
            }
            Ok(Fetched {
                bytes: b"payload".to_vec(),
                filename: "logo.png".to_owned(),
                mime: "image/png".to_owned(),
            })
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framewright_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn second_fetch_is_served_from_disk() {
        let dir = temp_dir("cache_hit");
        let cache = CachedResolver::new(
            Counting {
                calls: AtomicUsize::new(0),
                fail: false,
            },
            &dir,
        );
        let url = "https://example.com/logo.png";
        let first = cache.fetch(url).unwrap();
        let second = cache.fetch(url).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);

        let key = CachedResolver::<Counting>::key(url);
        assert!(cache.data_path(&key).exists());
        let record: CacheRecord =
            serde_json::from_slice(&std::fs::read(cache.record_path(&key)).unwrap()).unwrap();
        assert_eq!(record.mime, "image/png");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn fetch_failure_is_not_cached() {
        let dir = temp_dir("cache_miss");
        let cache = CachedResolver::new(
            Counting {
                calls: AtomicUsize::new(0),
                fail: true,
            },
            &dir,
        );
        assert!(cache.fetch("https://example.com/x").is_err());
        assert!(cache.fetch("https://example.com/x").is_err());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keys_are_stable_hex() {
        let k = CachedResolver::<Counting>::key("a");
        assert_eq!(k.len(), 16);
        assert_eq!(k, CachedResolver::<Counting>::key("a"));
        assert_ne!(k, CachedResolver::<Counting>::key("b"));
    }
}
