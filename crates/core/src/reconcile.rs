//! Reconciliation of a document's tag list against computed tag sets.
//!
//! Only tags named by an edit are touched; everything else in the document's
//! list (user tags, tags written by other tools) keeps its place.

use crate::resolver::ResolvedTagSet;
use serde_yaml::Mapping;
use storage::frontmatter;

/// Tags to strip from and tags to ensure on a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEdit {
    pub remove: Vec<String>,
    pub add: Vec<String>,
}

impl TagEdit {
    pub fn new(remove: Vec<String>, add: Vec<String>) -> Self {
        Self { remove, add }
    }

    /// Newly created document: add its resolution.
    pub fn create(resolved: &ResolvedTagSet) -> Self {
        Self::new(Vec::new(), resolved.as_slice().to_vec())
    }

    /// Moved document: swap the old location's tags for the new location's.
    pub fn moved(old: &ResolvedTagSet, new: &ResolvedTagSet) -> Self {
        Self::new(old.as_slice().to_vec(), new.as_slice().to_vec())
    }

    /// Reapply after a settings change. `stale` are tags previously applied
    /// under other settings that should go too.
    pub fn rerun(resolved: &ResolvedTagSet, stale: &[String]) -> Self {
        Self::new(with_stale(resolved, stale), resolved.as_slice().to_vec())
    }

    /// Strip everything the current resolution produces, plus `stale`.
    pub fn strip(resolved: &ResolvedTagSet, stale: &[String]) -> Self {
        Self::new(with_stale(resolved, stale), Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }

    pub fn apply(&self, current: &[String]) -> Vec<String> {
        reconcile(current, &self.remove, &self.add)
    }

    /// Applies the edit to a metadata block. Returns whether the tag list
    /// changed; the block is left untouched otherwise.
    pub fn apply_to_metadata(&self, metadata: &mut Mapping) -> bool {
        let current = frontmatter::read_tags(metadata);
        let next = self.apply(&current);
        if next == current {
            return false;
        }
        frontmatter::write_tags(metadata, &next);
        true
    }
}

fn with_stale(resolved: &ResolvedTagSet, stale: &[String]) -> Vec<String> {
    let mut tags = resolved.as_slice().to_vec();
    for tag in stale {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Removes `remove` from `current` and appends the members of `add` not yet
/// present, in `add` order. A tag named in both lists is left where it is.
/// An empty result means the tags field should be absent.
pub fn reconcile(current: &[String], remove: &[String], add: &[String]) -> Vec<String> {
    let mut next: Vec<String> = current
        .iter()
        .filter(|tag| !remove.contains(tag) || add.contains(tag))
        .cloned()
        .collect();
    for tag in add {
        if !next.contains(tag) {
            next.push(tag.clone());
        }
    }
    next
}
