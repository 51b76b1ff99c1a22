//! The scanner plugin interface.

use std::path::Path;

use bitflags::bitflags;
use kiln_cache::{ModuleFacts, ScanDependency};

bitflags! {
    /// What a scan session is asked to produce.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ScanFlags: u32 {
        /// Report include dependencies.
        const DEPENDENCIES = 1 << 0;
        /// Report file tags derived from content.
        const FILE_TAGS = 1 << 1;
    }
}

/// A content scanner for one family of file tags.
///
/// Implementations are shared across threads and must not keep per-file
/// state outside of the sessions they open.
pub trait ScannerPlugin: Send + Sync {
    /// Stable identifier, used in cache keys.
    fn id(&self) -> &str;

    /// The file tags this scanner handles.
    fn file_tags(&self) -> &[&str];

    /// Opens a session on `path`.
    ///
    /// `tags` is empty in dependency mode. Returns `None` if the file cannot
    /// be scanned; callers treat that as "no facts".
    fn open(&self, path: &Path, tags: &[&str], flags: ScanFlags) -> Option<Box<dyn ScanSession>>;
}

/// One open scan of one file. Dropping the session closes it.
pub trait ScanSession {
    /// Tags derived from content. Empty in dependency mode.
    fn additional_file_tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Yields the next raw dependency, or `None` when exhausted.
    fn next_dependency(&mut self) -> Option<ScanDependency>;

    /// Module facts, for scanners that understand modules.
    fn module_information(&self) -> Option<ModuleFacts> {
        None
    }
}
