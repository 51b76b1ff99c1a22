//! Project-wide store of raw scan results.
//!
//! Entries are keyed by (file path, scanner id, compatible property set).
//! The store is shared by every product of a project so that one physical
//! file compiled under compatible configurations is scanned once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_common::{FileTime, PropertyMap};
use parking_lot::{Mutex, RwLock};

use crate::types::{RawScanResult, ScannerId};

/// The scanner side of a store key.
///
/// Compatibility is scanner-defined: a scanner whose output cannot depend on
/// properties may declare every pair of maps compatible.
pub trait ScannerIdentity: Send + Sync {
    /// Stable id, distinct for every scanner whose results differ.
    fn id(&self) -> ScannerId;

    /// Whether results computed under `cached` may be reused under `current`.
    fn are_properties_compatible(&self, cached: &PropertyMap, current: &PropertyMap) -> bool {
        cached.fingerprint() == current.fingerprint()
    }
}

/// A cached scan plus the time it was taken.
#[derive(Clone, Debug, Default)]
pub struct ScanData {
    /// When the facts were last recomputed; [`FileTime::OLDEST`] if never.
    pub last_scan_time: FileTime,
    /// The cached facts.
    pub raw: RawScanResult,
}

impl ScanData {
    /// Returns `true` if the facts must be recomputed for a file last
    /// modified at `timestamp`.
    pub fn is_stale(&self, timestamp: FileTime) -> bool {
        !self.last_scan_time.is_valid() || self.last_scan_time < timestamp
    }
}

/// Shared handle to one store entry.
///
/// Holders that recompute take the write lock for the duration of the scan,
/// so a concurrent reader either waits for the new value or sees the old one.
pub type ScanDataHandle = Arc<RwLock<ScanData>>;

#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) properties: PropertyMap,
    pub(crate) data: ScanDataHandle,
}

/// Project-wide table of scan data.
#[derive(Default)]
pub struct RawScanResults {
    entries: Mutex<HashMap<(PathBuf, ScannerId), Vec<Slot>>>,
}

impl RawScanResults {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `path` and `scanner` whose properties are
    /// compatible with `properties`, creating an empty one if none is.
    ///
    /// At most one entry exists per key: concurrent callers asking for the
    /// same key receive the same handle.
    pub fn find_scan_data(
        &self,
        path: &Path,
        scanner: &dyn ScannerIdentity,
        properties: &PropertyMap,
    ) -> ScanDataHandle {
        let mut entries = self.entries.lock();
        let slots = entries
            .entry((path.to_path_buf(), scanner.id()))
            .or_default();
        if let Some(slot) = slots
            .iter()
            .find(|s| scanner.are_properties_compatible(&s.properties, properties))
        {
            return Arc::clone(&slot.data);
        }
        let data = Arc::new(RwLock::new(ScanData::default()));
        slots.push(Slot {
            properties: properties.clone(),
            data: Arc::clone(&data),
        });
        data
    }

    /// Drops every entry for `path`. Returns how many were dropped.
    pub fn remove_file(&self, path: &Path) -> usize {
        let mut entries = self.entries.lock();
        let mut removed = 0;
        entries.retain(|(p, _), slots| {
            if p == path {
                removed += slots.len();
                false
            } else {
                true
            }
        });
        removed
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out every entry as `(path, scanner, properties, data)`.
    pub(crate) fn snapshot(&self) -> Vec<(PathBuf, ScannerId, PropertyMap, ScanData)> {
        let entries = self.entries.lock();
        let mut out = Vec::new();
        for ((path, scanner), slots) in entries.iter() {
            for slot in slots {
                out.push((
                    path.clone(),
                    scanner.clone(),
                    slot.properties.clone(),
                    slot.data.read().clone(),
                ));
            }
        }
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }

    /// Rebuilds a store from snapshot entries.
    pub(crate) fn from_entries(
        items: impl IntoIterator<Item = (PathBuf, ScannerId, PropertyMap, ScanData)>,
    ) -> Self {
        let mut entries: HashMap<(PathBuf, ScannerId), Vec<Slot>> = HashMap::new();
        for (path, scanner, properties, data) in items {
            entries.entry((path, scanner)).or_default().push(Slot {
                properties,
                data: Arc::new(RwLock::new(data)),
            });
        }
        Self {
            entries: Mutex::new(entries),
        }
    }
}
