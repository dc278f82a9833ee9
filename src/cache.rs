//! Image variant caching.
//!
//! AVIF encoding is the bottleneck of a build: one image at three widths can
//! take several seconds through rav1e. Two layers keep that work from being
//! repeated.
//!
//! ## On disk: content-addressed file names
//!
//! Variant files are named `{id}-{width}.{ext}`. The `id` is derived from:
//!
//! - **source hash**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//! - **params hash**: SHA-256 of the encoding parameters (quality and an
//!   encoder revision). Width and format are already part of the file name.
//!
//! A file that exists under its derived name is therefore fresh: editing the
//! source or changing the quality produces a new `id` and new files. Stale
//! files from earlier ids are left in place.
//!
//! ## In process: one generation per request
//!
//! [`VariantCache`] maps a request key (source, widths, formats, output
//! directory) to a shared cell. The first caller for a key runs the
//! generation; concurrent callers with the same key wait on the same cell;
//! later callers get the stored result. Distinct keys never wait on each
//! other.

use crate::imaging::{OutputFormat, Quality, VariantSet};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Bump to give every variant a new `id` when encoder output changes.
const ENCODER_REVISION: u32 = 1;

/// Hex characters of the combined hash kept in file names.
const ID_LENGTH: usize = 10;

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the encoding parameters shared by all variants of a source.
pub fn hash_encoding_params(quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(ENCODER_REVISION.to_le_bytes());
    hasher.update(quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short identifier used as the file name stem of every variant.
pub fn variant_id(source_hash: &str, params_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_hash.as_bytes());
    hasher.update(b":");
    hasher.update(params_hash.as_bytes());
    let mut id = format!("{:x}", hasher.finalize());
    id.truncate(ID_LENGTH);
    id
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Variants found on disk.
    pub hits: u32,
    /// Variants encoded.
    pub misses: u32,
}

impl CacheStats {
    pub fn record(&mut self, hits: u32, misses: u32) {
        self.hits += hits;
        self.misses += misses;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Identity of a variant request within one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub source: PathBuf,
    pub widths: Vec<u32>,
    pub formats: Vec<OutputFormat>,
    pub output_dir: PathBuf,
}

impl VariantKey {
    /// Widths and formats are normalized so equivalent requests share a key.
    pub fn new(source: &Path, widths: &[u32], formats: &[OutputFormat], output_dir: &Path) -> Self {
        let mut widths = widths.to_vec();
        widths.sort_unstable();
        widths.dedup();
        let mut formats = formats.to_vec();
        formats.sort();
        formats.dedup();
        Self {
            source: source.to_path_buf(),
            widths,
            formats,
            output_dir: output_dir.to_path_buf(),
        }
    }
}

type Slot = Arc<OnceCell<Arc<VariantSet>>>;

/// Keyed, single-flight store of generated variant sets.
#[derive(Default)]
pub struct VariantCache {
    slots: Mutex<HashMap<VariantKey, Slot>>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the set for `key`, running `init` if no caller has produced it.
    ///
    /// At most one `init` runs per key at a time. If it fails, the error goes
    /// to that caller and the next caller for the key tries again.
    pub async fn get_or_try_init<E, F, Fut>(&self, key: VariantKey, init: F) -> Result<Arc<VariantSet>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VariantSet, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key).or_default())
        };
        let set = slot
            .get_or_try_init(|| async move { init().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(set))
    }

    /// Number of keys with a completed generation.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn key(source: &str) -> VariantKey {
        VariantKey::new(
            Path::new(source),
            &[655, 1310],
            &[OutputFormat::Jpeg],
            Path::new("out"),
        )
    }

    fn empty_set(source: &str) -> VariantSet {
        VariantSet {
            source: source.into(),
            variants: Vec::new(),
        }
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn hash_file_is_content_based() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());

        fs::write(&b, b"different").unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn hash_file_missing_errors() {
        assert!(hash_file(Path::new("/nonexistent/file.jpg")).is_err());
    }

    #[test]
    fn params_hash_changes_with_quality() {
        assert_eq!(
            hash_encoding_params(Quality::new(90)),
            hash_encoding_params(Quality::new(90))
        );
        assert_ne!(
            hash_encoding_params(Quality::new(90)),
            hash_encoding_params(Quality::new(80))
        );
    }

    #[test]
    fn variant_id_is_short_and_stable() {
        let id = variant_id("src", "params");
        assert_eq!(id.len(), ID_LENGTH);
        assert_eq!(id, variant_id("src", "params"));
        assert_ne!(id, variant_id("src2", "params"));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn stats_display_all_encoded() {
        let stats = CacheStats { hits: 0, misses: 9 };
        assert_eq!(stats.to_string(), "9 encoded");
    }

    #[test]
    fn stats_display_mixed() {
        let mut stats = CacheStats::default();
        stats.record(6, 3);
        stats.record(1, 1);
        assert_eq!(stats.to_string(), "7 cached, 4 encoded (11 total)");
    }

    // =========================================================================
    // VariantKey / VariantCache
    // =========================================================================

    #[test]
    fn key_normalizes_order_and_duplicates() {
        let a = VariantKey::new(
            Path::new("a.jpg"),
            &[1310, 655, 655],
            &[OutputFormat::Jpeg, OutputFormat::Avif],
            Path::new("out"),
        );
        let b = VariantKey::new(
            Path::new("a.jpg"),
            &[655, 1310],
            &[OutputFormat::Avif, OutputFormat::Jpeg, OutputFormat::Avif],
            Path::new("out"),
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn cache_runs_init_once_per_key() {
        let cache = VariantCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_try_init(key("a.jpg"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, io::Error>(empty_set("a.jpg"))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn cache_distinct_keys_run_separately() {
        let cache = VariantCache::new();
        let calls = AtomicUsize::new(0);
        for source in ["a.jpg", "b.jpg"] {
            cache
                .get_or_try_init(key(source), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, io::Error>(empty_set(source))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_generation() {
        let cache = Arc::new(VariantCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_try_init(key("a.jpg"), || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok::<_, io::Error>(empty_set("a.jpg"))
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_init_is_retried() {
        let cache = VariantCache::new();
        let first = cache
            .get_or_try_init(key("a.jpg"), || async {
                Err::<VariantSet, _>(io::Error::other("boom"))
            })
            .await;
        assert!(first.is_err());
        assert!(cache.is_empty());

        let second = cache
            .get_or_try_init(key("a.jpg"), || async { Ok::<_, io::Error>(empty_set("a.jpg")) })
            .await;
        assert!(second.is_ok());
        assert_eq!(cache.len(), 1);
    }
}
