use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cpp::CppScanner;
use crate::plugin::{ScanFlags, ScanSession, ScannerPlugin};

/// Wraps the built-in scanner and counts sessions by mode.
pub(crate) struct CountingScanner {
    inner: CppScanner,
    tag_opens: AtomicUsize,
    dependency_opens: AtomicUsize,
}

impl CountingScanner {
    pub(crate) fn new() -> Self {
        Self {
            inner: CppScanner::new(),
            tag_opens: AtomicUsize::new(0),
            dependency_opens: AtomicUsize::new(0),
        }
    }

    pub(crate) fn tag_opens(&self) -> usize {
        self.tag_opens.load(Ordering::SeqCst)
    }

    pub(crate) fn dependency_opens(&self) -> usize {
        self.dependency_opens.load(Ordering::SeqCst)
    }
}

impl ScannerPlugin for CountingScanner {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn file_tags(&self) -> &[&str] {
        self.inner.file_tags()
    }

    fn open(&self, path: &Path, tags: &[&str], flags: ScanFlags) -> Option<Box<dyn ScanSession>> {
        if flags.contains(ScanFlags::FILE_TAGS) {
            self.tag_opens.fetch_add(1, Ordering::SeqCst);
        } else {
            self.dependency_opens.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.open(path, tags, flags)
    }
}
