//! User-defined directory → tags overrides.
//!
//! A mapping applies to its directory and every directory below it. Mappings
//! are kept in insertion order; that order decides lookup order and which
//! ancestor a new subdirectory inherits from. Mapping identity is its index.

use crate::path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("no directory mapping at index {0}")]
    NoSuchMapping(usize),
    #[error("directory must not be empty")]
    EmptyDirectory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryMapping {
    pub directory: String,
    pub tags: Vec<String>,
}

impl DirectoryMapping {
    /// Normalizes the directory and collapses duplicate or blank tags.
    pub fn new(directory: &str, tags: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            directory: path::normalize(directory),
            tags: clean_tags(tags),
        }
    }

    /// Whether documents in `dir` receive this mapping's tags.
    pub fn covers(&self, dir: &str) -> bool {
        path::is_same_or_descendant(dir, &self.directory)
    }
}

/// Parses user input such as `"work, #urgent  ,"` into a clean tag list.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    clean_tags(input.split(','))
}

fn clean_tags(tags: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().trim_start_matches('#').trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DirectoryMapping>", into = "Vec<DirectoryMapping>")]
pub struct DirectoryMappingStore {
    mappings: Vec<DirectoryMapping>,
}

impl From<Vec<DirectoryMapping>> for DirectoryMappingStore {
    fn from(raw: Vec<DirectoryMapping>) -> Self {
        let mut store = Self::default();
        for mapping in raw {
            let mapping = DirectoryMapping::new(&mapping.directory, &mapping.tags);
            // Later duplicates of a directory replace earlier ones in place.
            match store.position(&mapping.directory) {
                Some(i) => store.mappings[i].tags = mapping.tags,
                None => store.mappings.push(mapping),
            }
        }
        store
    }
}

impl From<DirectoryMappingStore> for Vec<DirectoryMapping> {
    fn from(store: DirectoryMappingStore) -> Self {
        store.mappings
    }
}

impl DirectoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryMapping> {
        self.mappings.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DirectoryMapping> {
        self.mappings.get(index)
    }

    fn position(&self, dir: &str) -> Option<usize> {
        self.mappings.iter().position(|m| m.directory == dir)
    }

    /// Union of the tags of every mapping covering `dir`, in store order.
    pub fn lookup(&self, dir: &str) -> Vec<String> {
        self.lookup_excluding(dir, None)
    }

    /// Like [`lookup`](Self::lookup) but ignores the mapping at `skip`.
    pub fn lookup_excluding(&self, dir: &str, skip: Option<usize>) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for (i, mapping) in self.mappings.iter().enumerate() {
            if Some(i) == skip || !mapping.covers(dir) {
                continue;
            }
            for tag in &mapping.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        tags
    }

    pub fn has_exact_mapping(&self, dir: &str) -> bool {
        !dir.is_empty() && self.position(dir).is_some()
    }

    /// First mapping, in store order, that is a strict ancestor of `dir` and
    /// carries at least one tag.
    pub fn find_nearest_ancestor_mapping(&self, dir: &str) -> Option<&DirectoryMapping> {
        self.mappings
            .iter()
            .find(|m| !m.tags.is_empty() && path::is_strict_descendant(dir, &m.directory))
    }

    /// Rewrites every mapping at or below `old_dir` to sit at the same place
    /// under `new_dir`. Returns whether anything changed.
    pub fn rename_propagate(&mut self, old_dir: &str, new_dir: &str) -> bool {
        let old_dir = path::normalize(old_dir);
        let new_dir = path::normalize(new_dir);
        if old_dir == new_dir || old_dir.is_empty() {
            return false;
        }
        let mut changed = false;
        for mapping in &mut self.mappings {
            if let Some(rebased) = path::rebase(&mapping.directory, &old_dir, &new_dir) {
                mapping.directory = rebased;
                changed = true;
            }
        }
        if changed {
            self.merge_duplicates();
        }
        changed
    }

    /// Copies the tags of the first tagged ancestor mapping onto `dir` when
    /// `dir` has no mapping of its own. Returns the created mapping.
    pub fn inherit_for_new_directory(&mut self, dir: &str) -> Option<&DirectoryMapping> {
        let dir = path::normalize(dir);
        if dir.is_empty() || self.has_exact_mapping(&dir) {
            return None;
        }
        let tags = self.find_nearest_ancestor_mapping(&dir)?.tags.clone();
        self.mappings.push(DirectoryMapping {
            directory: dir,
            tags,
        });
        self.mappings.last()
    }

    /// Adds a mapping, or replaces the tags of the existing mapping for the
    /// same directory. Returns its index.
    pub fn upsert(&mut self, mapping: DirectoryMapping) -> Result<usize, MappingError> {
        if mapping.directory.is_empty() {
            return Err(MappingError::EmptyDirectory);
        }
        match self.position(&mapping.directory) {
            Some(i) => {
                self.mappings[i].tags = mapping.tags;
                Ok(i)
            }
            None => {
                self.mappings.push(mapping);
                Ok(self.mappings.len() - 1)
            }
        }
    }

    /// Replaces the mapping at `index`, returning the previous value. If the
    /// new directory already belongs to another mapping, that mapping is
    /// folded into this one.
    pub fn replace(
        &mut self,
        index: usize,
        mapping: DirectoryMapping,
    ) -> Result<DirectoryMapping, MappingError> {
        if mapping.directory.is_empty() {
            return Err(MappingError::EmptyDirectory);
        }
        let slot = self
            .mappings
            .get_mut(index)
            .ok_or(MappingError::NoSuchMapping(index))?;
        let previous = std::mem::replace(slot, mapping);
        let directory = self.mappings[index].directory.clone();
        if let Some(other) = self
            .mappings
            .iter()
            .enumerate()
            .position(|(i, m)| i != index && m.directory == directory)
        {
            self.mappings.remove(other);
        }
        Ok(previous)
    }

    pub fn remove(&mut self, index: usize) -> Result<DirectoryMapping, MappingError> {
        if index >= self.mappings.len() {
            return Err(MappingError::NoSuchMapping(index));
        }
        Ok(self.mappings.remove(index))
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }

    /// Folds mappings that ended up on the same directory into the first one.
    fn merge_duplicates(&mut self) {
        let mut merged: Vec<DirectoryMapping> = Vec::with_capacity(self.mappings.len());
        for mapping in self.mappings.drain(..) {
            match merged.iter_mut().find(|m| m.directory == mapping.directory) {
                Some(existing) => {
                    for tag in mapping.tags {
                        if !existing.tags.contains(&tag) {
                            existing.tags.push(tag);
                        }
                    }
                }
                None => merged.push(mapping),
            }
        }
        self.mappings = merged;
    }
}
