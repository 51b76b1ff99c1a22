//! Classification of artifacts and companion naming.

use kiln_common::{FileTag, FileTags};
use kiln_config::AutomocConfig;

use crate::tags::AutomocTags;

/// The role of a source artifact in the automoc pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    /// Tagged `hpp`; its companion is a generated source.
    Header,
    /// Tagged `cpp`; its companion is a generated file the unit includes.
    Source,
}

impl FileType {
    /// Classifies by tags. A file tagged both `hpp` and `cpp` is a header.
    pub fn classify(file_tags: &FileTags, tags: &AutomocTags) -> Option<Self> {
        if file_tags.contains(&tags.hpp) {
            Some(Self::Header)
        } else if file_tags.contains(&tags.cpp) {
            Some(Self::Source)
        } else {
            None
        }
    }

    /// The tag marking an existing companion, if the artifact carries one.
    pub fn companion_marker(self, file_tags: &FileTags, tags: &AutomocTags) -> Option<FileTag> {
        let candidates: &[FileTag] = match self {
            Self::Header => &[tags.moc_hpp, tags.moc_hpp_inc, tags.moc_plugin_hpp],
            Self::Source => &[tags.moc_cpp],
        };
        candidates.iter().copied().find(|t| file_tags.contains(t))
    }

    /// File name of the companion generated for an artifact with `base_name`.
    pub fn companion_name(self, base_name: &str, config: &AutomocConfig) -> String {
        match self {
            Self::Header => format!(
                "{}{}.{}",
                config.header_prefix, base_name, config.header_extension
            ),
            Self::Source => format!("{}.{}", base_name, config.source_extension),
        }
    }
}
