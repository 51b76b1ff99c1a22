//! On-disk persistence of the raw scan-result store.
//!
//! The store is written as a single binary file: a 4-byte little-endian
//! header length, a bincode header (magic, format version, tool version,
//! payload checksum), then the bincode payload.

use std::path::{Path, PathBuf};

use kiln_common::{ContentHash, FileTime, PropertyMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;
use crate::raw_scan_results::{RawScanResults, ScanData};
use crate::types::{RawScanResult, ScannerId};

/// Name of the store file within the cache directory.
pub const STORE_FILE: &str = "scan-results.bin";

const STORE_MAGIC: [u8; 4] = *b"KILN";

/// Increment on breaking changes to the header or payload layout.
const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreHeader {
    magic: [u8; 4],
    format_version: u32,
    kiln_version: String,
    checksum: ContentHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    path: PathBuf,
    scanner: ScannerId,
    properties: PropertyMap,
    last_scan_time: FileTime,
    raw: RawScanResult,
}

fn serialization_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::Serialization {
        reason: e.to_string(),
    }
}

impl RawScanResults {
    /// Writes the store to `<cache_dir>/scan-results.bin`, creating the
    /// directory if needed.
    pub fn save(&self, cache_dir: &Path, kiln_version: &str) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;

        let entries: Vec<PersistedEntry> = self
            .snapshot()
            .into_iter()
            .map(|(path, scanner, properties, data)| PersistedEntry {
                path,
                scanner,
                properties,
                last_scan_time: data.last_scan_time,
                raw: data.raw,
            })
            .collect();
        let payload = bincode::serde::encode_to_vec(&entries, bincode::config::standard())
            .map_err(serialization_error)?;

        let header = StoreHeader {
            magic: STORE_MAGIC,
            format_version: STORE_FORMAT_VERSION,
            kiln_version: kiln_version.to_string(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(serialization_error)?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let path = cache_dir.join(STORE_FILE);
        std::fs::write(&path, &output).map_err(|e| CacheError::Io { path, source: e })?;
        debug!(entries = entries.len(), dir = %cache_dir.display(), "saved scan results");
        Ok(())
    }

    /// Loads the store from `cache_dir`, or returns an empty store if the
    /// file is missing, corrupt, or written by another version.
    pub fn load(cache_dir: &Path, kiln_version: &str) -> Self {
        match read_store(&cache_dir.join(STORE_FILE), kiln_version) {
            Ok(entries) => {
                debug!(entries = entries.len(), "loaded scan results");
                Self::from_entries(entries.into_iter().map(|e| {
                    (
                        e.path,
                        e.scanner,
                        e.properties,
                        ScanData {
                            last_scan_time: e.last_scan_time,
                            raw: e.raw,
                        },
                    )
                }))
            }
            Err(e) => {
                debug!(error = %e, "starting with an empty scan store");
                Self::new()
            }
        }
    }
}

fn read_store(path: &Path, kiln_version: &str) -> Result<Vec<PersistedEntry>, CacheError> {
    let raw = std::fs::read(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("file too short"));
    }
    let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (StoreHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != STORE_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if header.format_version != STORE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: STORE_FORMAT_VERSION.to_string(),
            actual: header.format_version.to_string(),
        });
    }
    if header.kiln_version != kiln_version {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: kiln_version.to_string(),
            actual: header.kiln_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (entries, _): (Vec<PersistedEntry>, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(serialization_error)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_scan_results::ScannerIdentity;
    use crate::types::ModuleFacts;

    struct Modules;
    impl ScannerIdentity for Modules {
        fn id(&self) -> ScannerId {
            ScannerId::new("cxx20modulescpp")
        }
    }

    fn populated_store() -> RawScanResults {
        let store = RawScanResults::new();
        let handle = store.find_scan_data(Path::new("/src/foo.cppm"), &Modules, &PropertyMap::new());
        {
            let mut data = handle.write();
            data.last_scan_time = FileTime::from_nanos(1234);
            data.raw.module_facts = ModuleFacts {
                exports_module: Some("foo".to_string()),
                ..ModuleFacts::default()
            };
        }
        store
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        populated_store().save(dir.path(), "0.1.0").unwrap();

        let loaded = RawScanResults::load(dir.path(), "0.1.0");
        assert_eq!(loaded.len(), 1);
        let handle = loaded.find_scan_data(Path::new("/src/foo.cppm"), &Modules, &PropertyMap::new());
        let data = handle.read();
        assert_eq!(data.last_scan_time, FileTime::from_nanos(1234));
        assert_eq!(data.raw.module_facts.exports_module.as_deref(), Some("foo"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RawScanResults::load(dir.path(), "0.1.0").is_empty());
    }

    #[test]
    fn version_mismatch_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        populated_store().save(dir.path(), "0.1.0").unwrap();
        assert!(RawScanResults::load(dir.path(), "0.2.0").is_empty());
    }

    #[test]
    fn corrupt_payload_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        populated_store().save(dir.path(), "0.1.0").unwrap();
        let path = dir.path().join(STORE_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_store(&path, "0.1.0"),
            Err(CacheError::ChecksumMismatch { .. })
        ));
        assert!(RawScanResults::load(dir.path(), "0.1.0").is_empty());
    }

    #[test]
    fn garbage_file_is_invalid_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        std::fs::write(&path, b"ab").unwrap();
        assert!(matches!(
            read_store(&path, "0.1.0"),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("build").join(".kiln-cache");
        RawScanResults::new().save(&nested, "0.1.0").unwrap();
        assert!(nested.join(STORE_FILE).exists());
    }
}
