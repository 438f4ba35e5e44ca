//! Content-addressed cache for rendered diagrams.
//!
//! Rendered bytes are keyed by a SHA-256 of everything that affects the
//! output, so a cache hit never needs further validation. Cache failures
//! are never fatal: a failed read is a miss and a failed write is dropped.

use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// Diagram parameters for cache key computation.
#[derive(Debug)]
pub struct DiagramKey<'a> {
    /// Diagram source code (trimmed).
    pub source: &'a str,
    /// Kroki endpoint (e.g., "mermaid", "nomnoml").
    pub endpoint: &'a str,
    /// Output format ("svg" or "png").
    pub format: &'a str,
}

impl DiagramKey<'_> {
    /// Compute a content hash for this diagram key.
    ///
    /// SHA-256 of `"{endpoint}:{format}:{source}"`, hex-encoded.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!("{}:{}:{}", self.endpoint, self.format, self.source);
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Key-value store for rendered diagram bytes.
pub trait CacheBucket: Send + Sync {
    /// Retrieve cached bytes, or `None` on miss.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store bytes, overwriting any existing entry.
    fn set(&self, key: &str, value: &[u8]);
}

/// No-op [`CacheBucket`] used when caching is disabled.
pub struct NullCache;

impl CacheBucket for NullCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) {}
}

/// File-based [`CacheBucket`]: one file per key under a root directory.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CacheBucket for FileCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(key)).ok()
    }

    fn set(&self, key: &str, value: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.root) {
            tracing::debug!(path = %self.root.display(), error = %e, "Cannot create diagram cache");
            return;
        }
        if let Err(e) = fs::write(self.root.join(key), value) {
            tracing::debug!(key, error = %e, "Cannot write diagram cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_key<'a>(source: &'a str, endpoint: &'a str, format: &'a str) -> DiagramKey<'a> {
        DiagramKey {
            source,
            endpoint,
            format,
        }
    }

    #[test]
    fn test_diagram_key_hash() {
        let key1 = make_key("[A] -> [B]", "nomnoml", "png");
        let key2 = make_key("[A] -> [B]", "nomnoml", "png");
        let key3 = make_key("[C] -> [D]", "nomnoml", "png");

        assert_eq!(key1.compute_hash(), key2.compute_hash());
        assert_ne!(key1.compute_hash(), key3.compute_hash());
        assert_eq!(key1.compute_hash().len(), 64);
    }

    #[test]
    fn test_diagram_key_hash_format_matters() {
        let key_svg = make_key("source", "mermaid", "svg");
        let key_png = DiagramKey {
            format: "png",
            ..key_svg
        };

        assert_ne!(key_svg.compute_hash(), key_png.compute_hash());
    }

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullCache;
        cache.set("key", b"hello");
        assert_eq!(cache.get("key"), None);
    }

    #[test]
    fn test_file_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested/cache"));

        assert_eq!(cache.get("abc"), None);
        cache.set("abc", b"<svg/>");
        assert_eq!(cache.get("abc"), Some(b"<svg/>".to_vec()));
    }
}
