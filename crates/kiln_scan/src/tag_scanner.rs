//! Tag and dependency scanning for the automoc pass.

use std::path::Path;
use std::sync::Arc;

use kiln_cache::{ScanDependency, ScanResult, ScanResultCache, ScannerId};
use kiln_common::FileTime;
use tracing::trace;

use crate::error::ScanError;
use crate::plugin::{ScanFlags, ScannerPlugin};
use crate::registry::ScannerRegistry;

/// What one [`TagScanner::scan`] call discovered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagScanOutput {
    /// Tags derived from content, in discovery order.
    pub tags: Vec<String>,
    /// Raw dependencies from every scanner, in discovery order.
    pub deps: Vec<ScanDependency>,
}

/// Runs every scanner registered for one primary tag over a file.
///
/// Each scanner is asked twice: once in tag mode with the file's current
/// tags, once in dependency mode with no tags. Both results go through the
/// shared [`ScanResultCache`] so an unchanged file is opened at most once per
/// mode and input tag set per invocation.
pub struct TagScanner {
    scanners: Vec<Arc<dyn ScannerPlugin>>,
    cache: Arc<ScanResultCache>,
}

impl TagScanner {
    /// Resolves the scanners for `primary_tag`.
    ///
    /// Fails with [`ScanError::NoScanner`] if none is registered.
    pub fn new(
        registry: &ScannerRegistry,
        primary_tag: &str,
        artifact_type: &str,
        cache: Arc<ScanResultCache>,
    ) -> Result<Self, ScanError> {
        let scanners = registry.scanners_for_tag(primary_tag).to_vec();
        if scanners.is_empty() {
            return Err(ScanError::NoScanner {
                tag: primary_tag.to_string(),
                artifact_type: artifact_type.to_string(),
            });
        }
        Ok(Self { scanners, cache })
    }

    /// Scans `path`, which currently carries `tags` and was last modified at
    /// `timestamp`. Fresh dependency results are recorded at `now`.
    ///
    /// A scanner that cannot open the file contributes nothing.
    pub fn scan(&self, path: &Path, tags: &[&str], timestamp: FileTime, now: FileTime) -> TagScanOutput {
        trace!(path = %path.display(), "checks");
        let mut output = TagScanOutput::default();

        for scanner in &self.scanners {
            let id = ScannerId::new(scanner.id());
            let derived = match self.cache.lookup_tags(&id, path, tags, timestamp) {
                Some(derived) => derived,
                None => {
                    let Some(session) = scanner.open(path, tags, ScanFlags::FILE_TAGS) else {
                        continue;
                    };
                    let derived = session.additional_file_tags();
                    self.cache.store_tags(&id, path, tags, derived.clone(), now);
                    derived
                }
            };
            for tag in derived {
                if !output.tags.contains(&tag) {
                    output.tags.push(tag);
                }
            }

            let mut result = self.cache.lookup_fresh(&id, path, timestamp);
            if !result.valid {
                let Some(mut session) = scanner.open(path, &[], ScanFlags::DEPENDENCIES) else {
                    continue;
                };
                result = ScanResult::empty_valid();
                while let Some(dep) = session.next_dependency() {
                    if !dep.file_path.is_empty() {
                        result.add_dependency(dep);
                    }
                }
                self.cache.store(&id, path, result.clone(), now);
            }

            for dep in result.deps {
                if !output.deps.contains(&dep) {
                    output.deps.push(dep);
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingScanner;

    fn scanner_with(counting: &Arc<CountingScanner>) -> TagScanner {
        let mut registry = ScannerRegistry::new();
        registry.register(Arc::clone(counting) as Arc<dyn ScannerPlugin>);
        TagScanner::new(&registry, "hpp", "header", Arc::new(ScanResultCache::new())).unwrap()
    }

    #[test]
    fn no_scanner_is_an_error() {
        let registry = ScannerRegistry::new();
        let err = TagScanner::new(&registry, "hpp", "header", Arc::new(ScanResultCache::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ScanError::NoScanner { ref tag, .. } if tag == "hpp"));
    }

    #[test]
    fn tags_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.hpp");
        std::fs::write(&path, "#include <QObject>\nclass W { Q_OBJECT };\n").unwrap();

        let counting = Arc::new(CountingScanner::new());
        let scanner = scanner_with(&counting);
        let out = scanner.scan(&path, &["hpp"], FileTime::from_nanos(1), FileTime::from_nanos(2));
        assert_eq!(out.tags, vec!["moc_hpp"]);
        assert_eq!(out.deps, vec![ScanDependency::new("QObject", false)]);
    }

    #[test]
    fn idempotent_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.hpp");
        std::fs::write(&path, "#include \"moc_widget.cpp\"\nclass W { Q_OBJECT };\n").unwrap();

        let counting = Arc::new(CountingScanner::new());
        let scanner = scanner_with(&counting);
        let first = scanner.scan(&path, &["hpp"], FileTime::from_nanos(1), FileTime::from_nanos(2));
        let second = scanner.scan(&path, &["hpp"], FileTime::from_nanos(1), FileTime::from_nanos(3));
        assert_eq!(first, second);
        assert_eq!(counting.tag_opens(), 1);
        assert_eq!(counting.dependency_opens(), 1);
    }

    #[test]
    fn newer_file_is_rescanned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.hpp");
        std::fs::write(&path, "#include \"a.h\"\n").unwrap();

        let counting = Arc::new(CountingScanner::new());
        let scanner = scanner_with(&counting);
        scanner.scan(&path, &["hpp"], FileTime::from_nanos(1), FileTime::from_nanos(2));

        std::fs::write(&path, "#include \"b.h\"\n").unwrap();
        let out = scanner.scan(&path, &["hpp"], FileTime::from_nanos(5), FileTime::from_nanos(6));
        assert_eq!(counting.tag_opens(), 2);
        assert_eq!(counting.dependency_opens(), 2);
        assert_eq!(out.deps, vec![ScanDependency::new("b.h", true)]);
    }

    #[test]
    fn different_input_tags_are_scanned_separately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.cpp");
        std::fs::write(&path, "class W { Q_OBJECT };\n").unwrap();

        let counting = Arc::new(CountingScanner::new());
        let mut registry = ScannerRegistry::new();
        registry.register(Arc::clone(&counting) as Arc<dyn ScannerPlugin>);
        let scanner = TagScanner::new(&registry, "cpp", "source", Arc::new(ScanResultCache::new())).unwrap();

        let as_unit = scanner.scan(&path, &["cpp"], FileTime::from_nanos(1), FileTime::from_nanos(2));
        let as_header = scanner.scan(&path, &["hpp"], FileTime::from_nanos(1), FileTime::from_nanos(3));
        assert_eq!(as_unit.tags, vec!["moc_cpp"]);
        assert_eq!(as_header.tags, vec!["moc_hpp"]);
        assert_eq!(counting.tag_opens(), 2);
        assert_eq!(counting.dependency_opens(), 1);
    }

    #[test]
    fn unreadable_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let counting = Arc::new(CountingScanner::new());
        let scanner = scanner_with(&counting);
        let out = scanner.scan(
            &dir.path().join("gone.hpp"),
            &["hpp"],
            FileTime::from_nanos(1),
            FileTime::from_nanos(2),
        );
        assert_eq!(out, TagScanOutput::default());
    }
}
