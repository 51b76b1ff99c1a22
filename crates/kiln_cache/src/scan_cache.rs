//! Per-invocation cache of raw include lists and content-derived tags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kiln_common::FileTime;
use parking_lot::RwLock;

use crate::types::{ScanResult, ScannerId};

#[derive(Clone, Debug)]
struct CacheEntry<T> {
    value: T,
    scanned_at: FileTime,
}

impl<T: Clone> CacheEntry<T> {
    fn fresh(&self, file_time: FileTime) -> Option<T> {
        (self.scanned_at >= file_time).then(|| self.value.clone())
    }
}

/// Tag-mode results depend on the tags the scanner was shown.
type TagKey = (ScannerId, PathBuf, Vec<String>);

fn tag_key(scanner: &ScannerId, path: &Path, tags: &[&str]) -> TagKey {
    let mut shown: Vec<String> = tags.iter().map(|t| (*t).to_string()).collect();
    shown.sort();
    shown.dedup();
    (scanner.clone(), path.to_path_buf(), shown)
}

/// Per-scanner, per-file cache of dependency scan results, plus the tags a
/// scanner derived for a file under a given set of input tags.
///
/// Pure key-value semantics: nothing is evicted except by
/// [`invalidate`](Self::invalidate) or [`clear`](Self::clear), and the whole
/// cache is dropped at the end of a build invocation. Readers never observe a
/// half-written entry; the last writer for a key wins.
#[derive(Default)]
pub struct ScanResultCache {
    entries: RwLock<HashMap<(ScannerId, PathBuf), CacheEntry<ScanResult>>>,
    tags: RwLock<HashMap<TagKey, CacheEntry<Vec<String>>>>,
}

impl ScanResultCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result, or an invalid empty result if absent.
    pub fn lookup(&self, scanner: &ScannerId, path: &Path) -> ScanResult {
        self.entries
            .read()
            .get(&(scanner.clone(), path.to_path_buf()))
            .map(|e| e.value.clone())
            .unwrap_or_default()
    }

    /// Like [`lookup`](Self::lookup), but treats an entry recorded before
    /// `file_time` as absent.
    pub fn lookup_fresh(&self, scanner: &ScannerId, path: &Path, file_time: FileTime) -> ScanResult {
        self.entries
            .read()
            .get(&(scanner.clone(), path.to_path_buf()))
            .and_then(|e| e.fresh(file_time))
            .unwrap_or_default()
    }

    /// Records a result scanned at `scanned_at`.
    pub fn store(&self, scanner: &ScannerId, path: &Path, result: ScanResult, scanned_at: FileTime) {
        self.entries
            .write()
            .insert(
                (scanner.clone(), path.to_path_buf()),
                CacheEntry {
                    value: result,
                    scanned_at,
                },
            );
    }

    /// Tags `scanner` derived for `path` when shown `shown_tags`, unless the
    /// entry was recorded before `file_time`.
    pub fn lookup_tags(
        &self,
        scanner: &ScannerId,
        path: &Path,
        shown_tags: &[&str],
        file_time: FileTime,
    ) -> Option<Vec<String>> {
        self.tags
            .read()
            .get(&tag_key(scanner, path, shown_tags))
            .and_then(|e| e.fresh(file_time))
    }

    /// Records the tags derived for `path` under `shown_tags`.
    pub fn store_tags(
        &self,
        scanner: &ScannerId,
        path: &Path,
        shown_tags: &[&str],
        derived: Vec<String>,
        scanned_at: FileTime,
    ) {
        self.tags.write().insert(
            tag_key(scanner, path, shown_tags),
            CacheEntry {
                value: derived,
                scanned_at,
            },
        );
    }

    /// Drops every scanner's dependency and tag entries for `path`. Returns
    /// how many were dropped.
    pub fn invalidate(&self, path: &Path) -> usize {
        let mut entries = self.entries.write();
        let mut tags = self.tags.write();
        let before = entries.len() + tags.len();
        entries.retain(|(_, p), _| p != path);
        tags.retain(|(_, p, _), _| p != path);
        before - entries.len() - tags.len()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.tags.write().clear();
    }

    /// Number of cached entries of either kind.
    pub fn len(&self) -> usize {
        self.entries.read().len() + self.tags.read().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
