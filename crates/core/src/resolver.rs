//! Resolves the full tag set of a document path: folder-derived tags followed
//! by the tags of every covering directory mapping, deduplicated.

use crate::deriver::{self, FormattingPolicy};
use crate::mappings::DirectoryMappingStore;
use crate::path;
use crate::settings::TagSettings;

/// Ordered, duplicate-free tag set computed for one path. Never persisted;
/// recompute it whenever settings change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTagSet(Vec<String>);

impl ResolvedTagSet {
    pub fn from_parts<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut tags: Vec<String> = Vec::new();
        for tag in parts {
            let tag = tag.into();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self(tags)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedTagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Borrowing view over a settings snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TagResolver<'a> {
    policy: FormattingPolicy<'a>,
    mappings: &'a DirectoryMappingStore,
}

impl<'a> TagResolver<'a> {
    pub fn new(settings: &'a TagSettings) -> Self {
        Self {
            policy: settings.policy(),
            mappings: &settings.directory_tag_mappings,
        }
    }

    pub fn resolve(&self, doc_path: &str) -> ResolvedTagSet {
        self.resolve_excluding(doc_path, None)
    }

    /// Resolution as if the mapping at `skip` did not exist.
    pub fn resolve_excluding(&self, doc_path: &str, skip: Option<usize>) -> ResolvedTagSet {
        let doc_path = path::normalize(doc_path);
        let folder = deriver::derive_tags(&doc_path, &self.policy);
        let custom = self
            .mappings
            .lookup_excluding(path::directory_of(&doc_path), skip);
        ResolvedTagSet::from_parts(folder.into_iter().chain(custom))
    }
}
