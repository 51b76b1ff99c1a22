//! File tags the automoc pass reads and writes.

use kiln_common::{FileTag, TagInterner};

/// Interned tags used by the pass, resolved against one graph's interner.
#[derive(Clone, Copy, Debug)]
pub struct AutomocTags {
    /// Header files.
    pub hpp: FileTag,
    /// Compiled units.
    pub cpp: FileTag,
    /// Header needing a compiled companion.
    pub moc_hpp: FileTag,
    /// Header whose companion is textually included by some unit.
    pub moc_hpp_inc: FileTag,
    /// Header declaring plugin metadata.
    pub moc_plugin_hpp: FileTag,
    /// Unit needing an included companion.
    pub moc_cpp: FileTag,
    /// Precompiled header.
    pub pch: FileTag,
    /// Plugin metadata file.
    pub plugin_metadata: FileTag,
    /// Object file.
    pub obj: FileTag,
    /// Position-independent object file.
    pub fpicobj: FileTag,
}

impl AutomocTags {
    /// Interns every tag.
    pub fn new(interner: &TagInterner) -> Self {
        Self {
            hpp: interner.intern("hpp"),
            cpp: interner.intern("cpp"),
            moc_hpp: interner.intern("moc_hpp"),
            moc_hpp_inc: interner.intern("moc_hpp_inc"),
            moc_plugin_hpp: interner.intern("moc_plugin_hpp"),
            moc_cpp: interner.intern("moc_cpp"),
            pch: interner.intern("c++_pch"),
            plugin_metadata: interner.intern("qt_plugin_metadata"),
            obj: interner.intern("obj"),
            fpicobj: interner.intern("fpicobj"),
        }
    }

    /// Returns `true` for tags that mark an artifact as having a companion.
    pub fn is_companion_marker(&self, tag: FileTag) -> bool {
        tag == self.moc_hpp
            || tag == self.moc_hpp_inc
            || tag == self.moc_plugin_hpp
            || tag == self.moc_cpp
    }
}
