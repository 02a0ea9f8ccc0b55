//! In-memory document store, used by tests and by embedders that keep notes
//! outside the filesystem.

use crate::frontmatter;
use crate::store::{DocumentStore, MetadataOutcome, StoreError};
use async_trait::async_trait;
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Entry {
    Metadata(Mapping),
    /// Metadata block that is not a mapping.
    Malformed,
    /// Every transaction on this document fails with the given message.
    Failing(String),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, path: &str, metadata: Mapping) {
        self.docs().insert(path.to_string(), Entry::Metadata(metadata));
    }

    pub fn insert_with_tags(&self, path: &str, tags: &[&str]) {
        let mut metadata = Mapping::new();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        frontmatter::write_tags(&mut metadata, &tags);
        self.insert(path, metadata);
    }

    pub fn insert_malformed(&self, path: &str) {
        self.docs().insert(path.to_string(), Entry::Malformed);
    }

    pub fn insert_failing(&self, path: &str, message: &str) {
        self.docs()
            .insert(path.to_string(), Entry::Failing(message.to_string()));
    }

    /// Moves a document, as the host does before emitting a rename event.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut docs = self.docs();
        match docs.remove(from) {
            Some(entry) => {
                docs.insert(to.to_string(), entry);
                true
            }
            None => false,
        }
    }

    /// Moves every document under `from_dir` to the same place under `to_dir`.
    pub fn rename_directory(&self, from_dir: &str, to_dir: &str) -> usize {
        let mut docs = self.docs();
        let prefix = format!("{from_dir}/");
        let moved: Vec<String> = docs
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        for old in &moved {
            if let Some(entry) = docs.remove(old) {
                let new = format!("{to_dir}/{}", &old[prefix.len()..]);
                docs.insert(new, entry);
            }
        }
        moved.len()
    }

    pub fn metadata(&self, path: &str) -> Option<Mapping> {
        match self.docs().get(path) {
            Some(Entry::Metadata(m)) => Some(m.clone()),
            _ => None,
        }
    }

    /// `None` when the document is missing or its block has no `tags` field.
    pub fn tags(&self, path: &str) -> Option<Vec<String>> {
        self.metadata(path)
            .filter(|m| m.get(frontmatter::TAGS_KEY).is_some())
            .map(|m| frontmatter::read_tags(&m))
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.docs().keys().cloned().collect())
    }

    async fn update_metadata(
        &self,
        path: &str,
        edit: &mut (dyn for<'m> FnMut(&'m mut Mapping) -> bool + Send),
    ) -> Result<MetadataOutcome, StoreError> {
        let mut docs = self.docs();
        let entry = docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        match entry {
            Entry::Metadata(stored) => {
                let mut working = stored.clone();
                if !edit(&mut working) {
                    return Ok(MetadataOutcome::Unchanged);
                }
                *stored = working;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(MetadataOutcome::Written)
            }
            Entry::Malformed => Ok(MetadataOutcome::Skipped(
                "metadata block is not a mapping".to_string(),
            )),
            Entry::Failing(message) => Err(StoreError::Unavailable(format!("{path}: {message}"))),
        }
    }
}
