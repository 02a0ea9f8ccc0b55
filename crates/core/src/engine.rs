//! The tagging engine: owns the settings and drives tag reconciliation
//! against the document store for document events and for the settings
//! surface (policy editors, directory mapping CRUD).

use crate::bulk::BulkReport;
use crate::mappings::{DirectoryMapping, MappingError};
use crate::path;
use crate::reconcile::TagEdit;
use crate::resolver::{ResolvedTagSet, TagResolver};
use crate::settings::{Settings, TagSettings};
use std::collections::HashSet;
use storage::{DocumentStore, Ledger, LedgerError, MetadataOutcome, SettingsError, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// The tag list changed (or would have, in a dry run).
    Modified,
    Unchanged,
    /// The metadata block could not be edited and was left alone.
    Skipped(String),
}

impl DocumentChange {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DocumentChange::Skipped(_))
    }
}

/// Result of adding or editing a directory mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingChange {
    pub index: usize,
    /// The mapping as it was before, when one was replaced.
    pub previous: Option<DirectoryMapping>,
}

pub struct TagEngine<S> {
    store: S,
    settings: Settings,
    ledger: Option<Ledger>,
    seen_dirs: HashSet<String>,
}

impl<S: DocumentStore> TagEngine<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        Self {
            store,
            settings,
            ledger: None,
            seen_dirs: HashSet::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &TagSettings {
        self.settings.get()
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn resolver(&self) -> TagResolver<'_> {
        TagResolver::new(self.settings.get())
    }

    pub fn resolve(&self, doc_path: &str) -> ResolvedTagSet {
        self.resolver().resolve(doc_path)
    }

    /// Mutates and persists the settings. Nothing is re-tagged; run a bulk
    /// reapply for documents to pick the change up.
    pub fn update_settings<R>(
        &mut self,
        change: impl FnOnce(&mut TagSettings) -> R,
    ) -> Result<R, EngineError> {
        Ok(self.settings.update(change)?)
    }

    pub(crate) fn clear_seen_directories(&mut self) {
        self.seen_dirs.clear();
    }

    /// Reconciles one document's metadata block. In a dry run the change is
    /// computed but nothing is written.
    pub(crate) async fn apply_edit(
        &self,
        doc_path: &str,
        edit: &TagEdit,
        dry_run: bool,
    ) -> Result<DocumentChange, StoreError> {
        let mut would_change = false;
        let outcome = self
            .store
            .update_metadata(doc_path, &mut |metadata| {
                if dry_run {
                    let mut scratch = metadata.clone();
                    would_change = edit.apply_to_metadata(&mut scratch);
                    false
                } else {
                    edit.apply_to_metadata(metadata)
                }
            })
            .await?;
        Ok(match outcome {
            MetadataOutcome::Written => DocumentChange::Modified,
            MetadataOutcome::Unchanged if would_change => DocumentChange::Modified,
            MetadataOutcome::Unchanged => DocumentChange::Unchanged,
            MetadataOutcome::Skipped(reason) => DocumentChange::Skipped(reason),
        })
    }

    /// Tags recorded for `doc_path` under settings that are no longer current.
    pub(crate) async fn stale_tags(&self, doc_path: &str) -> Vec<String> {
        let Some(ledger) = &self.ledger else {
            return Vec::new();
        };
        match ledger.get(doc_path).await {
            Ok(Some(entry)) if entry.fingerprint != self.settings.get().fingerprint() => {
                entry.tags
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(path = doc_path, error = %e, "ledger lookup failed");
                Vec::new()
            }
        }
    }

    pub(crate) async fn ledger_record(&self, doc_path: &str, tags: &[String]) {
        if let Some(ledger) = &self.ledger {
            let fingerprint = self.settings.get().fingerprint();
            if let Err(e) = ledger.record(doc_path, tags, &fingerprint).await {
                warn!(path = doc_path, error = %e, "ledger record failed");
            }
        }
    }

    pub(crate) async fn ledger_forget(&self, doc_path: &str) {
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.forget(doc_path).await {
                warn!(path = doc_path, error = %e, "ledger forget failed");
            }
        }
    }

    /// Inherits ancestor mapping tags onto a directory the first time it is
    /// seen. Returns whether a mapping was created.
    pub fn observe_directory(&mut self, dir: &str) -> Result<bool, EngineError> {
        let dir = path::normalize(dir);
        if dir.is_empty() || self.seen_dirs.contains(&dir) {
            return Ok(false);
        }
        // Only mark the directory seen once the inherited mapping is saved.
        let inherited = self.settings.update(|s| {
            s.directory_tag_mappings
                .inherit_for_new_directory(&dir)
                .map(|m| m.tags.clone())
        })?;
        self.seen_dirs.insert(dir.clone());
        match inherited {
            Some(tags) => {
                info!(directory = %dir, ?tags, "directory inherited mapping tags");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// A document appeared: tag it with its resolution.
    pub async fn document_created(&mut self, doc_path: &str) -> Result<DocumentChange, EngineError> {
        let doc_path = path::normalize(doc_path);
        self.observe_directory(path::directory_of(&doc_path))?;

        let resolved = self.resolve(&doc_path);
        let change = self
            .apply_edit(&doc_path, &TagEdit::create(&resolved), false)
            .await?;
        if !change.is_skipped() {
            self.ledger_record(&doc_path, resolved.as_slice()).await;
        }
        debug!(path = %doc_path, tags = ?resolved.as_slice(), ?change, "created");
        Ok(change)
    }

    /// A document moved from `from` to `to`; the store already holds it at `to`.
    pub async fn document_renamed(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<DocumentChange, EngineError> {
        let from = path::normalize(from);
        let to = path::normalize(to);
        if path::directory_of(&from) != path::directory_of(&to) {
            self.observe_directory(path::directory_of(&to))?;
        }
        self.move_document(&from, &to).await
    }

    pub(crate) async fn move_document(
        &self,
        from: &str,
        to: &str,
    ) -> Result<DocumentChange, EngineError> {
        let resolver = self.resolver();
        let old = resolver.resolve(from);
        let new = resolver.resolve(to);
        let change = self
            .apply_edit(to, &TagEdit::moved(&old, &new), false)
            .await?;
        if !change.is_skipped() {
            if let Some(ledger) = &self.ledger {
                if let Err(e) = ledger.rename(from, to).await {
                    warn!(from, to, error = %e, "ledger rename failed");
                }
            }
            self.ledger_record(to, new.as_slice()).await;
        }
        debug!(from, to, ?change, "moved");
        Ok(change)
    }

    /// A directory was renamed: carry its mappings (and those below it) to
    /// the new location, then re-tag the documents that moved with it.
    pub async fn directory_renamed(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<BulkReport, EngineError> {
        let from = path::normalize(from);
        let to = path::normalize(to);
        let mut report = BulkReport::default();
        if from == to || from.is_empty() || to.is_empty() {
            return Ok(report);
        }

        let propagated = self
            .settings
            .update(|s| s.directory_tag_mappings.rename_propagate(&from, &to))?;
        if propagated {
            info!(%from, %to, "directory mappings follow rename");
        }
        self.seen_dirs = self
            .seen_dirs
            .drain()
            .map(|d| path::rebase(&d, &from, &to).unwrap_or(d))
            .collect();

        for doc in self.store.list_documents().await? {
            let Some(old) = path::rebase(&doc, &to, &from) else {
                continue;
            };
            let result = self.move_document(&old, &doc).await;
            report.record(&doc, result);
        }
        Ok(report)
    }

    /// Adds a directory mapping, replacing the tags of an existing mapping
    /// for the same directory.
    pub fn add_mapping(&mut self, mapping: DirectoryMapping) -> Result<MappingChange, EngineError> {
        let change = self.settings.update(|s| {
            let previous = s
                .directory_tag_mappings
                .iter()
                .find(|m| m.directory == mapping.directory)
                .cloned();
            s.directory_tag_mappings
                .upsert(mapping)
                .map(|index| MappingChange { index, previous })
        })??;
        Ok(change)
    }

    pub fn edit_mapping(
        &mut self,
        index: usize,
        mapping: DirectoryMapping,
    ) -> Result<MappingChange, EngineError> {
        let directory = mapping.directory.clone();
        let previous = self
            .settings
            .update(|s| s.directory_tag_mappings.replace(index, mapping))??;
        // Folding in a same-directory mapping may have shifted the slot.
        let index = self
            .settings
            .get()
            .directory_tag_mappings
            .iter()
            .position(|m| m.directory == directory)
            .unwrap_or(index);
        Ok(MappingChange {
            index,
            previous: Some(previous),
        })
    }

    pub fn remove_mapping(&mut self, index: usize) -> Result<DirectoryMapping, EngineError> {
        let removed = self
            .settings
            .update(|s| s.directory_tag_mappings.remove(index))??;
        Ok(removed)
    }

    /// Adds the mapping's tags to every document in its directory tree.
    pub async fn apply_tags_for_mapping(
        &self,
        index: usize,
        dry_run: bool,
    ) -> Result<BulkReport, EngineError> {
        let mapping = self
            .settings
            .get()
            .directory_tag_mappings
            .get(index)
            .cloned()
            .ok_or(MappingError::NoSuchMapping(index))?;
        self.run_scoped(dry_run, |doc| {
            mapping
                .covers(path::directory_of(doc))
                .then(|| TagEdit::new(Vec::new(), mapping.tags.clone()))
        })
        .await
    }

    /// Strips a removed mapping's tags from its directory tree, except tags
    /// a document still resolves from its folders or other mappings.
    pub async fn remove_tags_for_mapping(
        &self,
        removed: &DirectoryMapping,
        dry_run: bool,
    ) -> Result<BulkReport, EngineError> {
        let resolver = self.resolver();
        self.run_scoped(dry_run, |doc| {
            if !removed.covers(path::directory_of(doc)) {
                return None;
            }
            let still = resolver.resolve(doc);
            let remove = removed
                .tags
                .iter()
                .filter(|t| !still.contains(t))
                .cloned()
                .collect();
            Some(TagEdit::new(remove, Vec::new()))
        })
        .await
    }

    /// After an edit: previous tags leave the previous directory tree, the
    /// current tags join the current one.
    pub async fn update_tags_for_mapping(
        &self,
        change: &MappingChange,
        dry_run: bool,
    ) -> Result<BulkReport, EngineError> {
        let current = self
            .settings
            .get()
            .directory_tag_mappings
            .get(change.index)
            .cloned()
            .ok_or(MappingError::NoSuchMapping(change.index))?;
        let Some(previous) = &change.previous else {
            return self.apply_tags_for_mapping(change.index, dry_run).await;
        };
        let resolver = self.resolver();
        self.run_scoped(dry_run, |doc| {
            let dir = path::directory_of(doc);
            let in_old = previous.covers(dir);
            let in_new = current.covers(dir);
            if !in_old && !in_new {
                return None;
            }
            let mut remove = Vec::new();
            if in_old {
                let still = resolver.resolve(doc);
                remove = previous
                    .tags
                    .iter()
                    .filter(|t| !still.contains(t))
                    .cloned()
                    .collect();
            }
            let add = if in_new {
                current.tags.clone()
            } else {
                Vec::new()
            };
            Some(TagEdit::new(remove, add))
        })
        .await
    }

    async fn run_scoped<F>(&self, dry_run: bool, mut plan: F) -> Result<BulkReport, EngineError>
    where
        F: FnMut(&str) -> Option<TagEdit> + Send,
    {
        let mut report = BulkReport::default();
        for doc in self.store.list_documents().await? {
            let Some(edit) = plan(&doc) else {
                continue;
            };
            let result = self
                .apply_edit(&doc, &edit, dry_run)
                .await
                .map_err(EngineError::from);
            report.record(&doc, result);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deriver::FolderDepth;
    use std::sync::Arc;
    use storage::MemoryStore;

    fn engine(depth: FolderDepth, mappings: Vec<DirectoryMapping>) -> TagEngine<Arc<MemoryStore>> {
        let settings = TagSettings {
            folder_depth: depth,
            directory_tag_mappings: mappings.into(),
            ..TagSettings::default()
        };
        TagEngine::new(Arc::new(MemoryStore::new()), Settings::in_memory(settings))
    }

    #[test]
    fn failed_save_does_not_mark_directory_seen() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("cfg");
        let settings = Settings::load(storage::JsonFile::new(dir.join("settings.json"))).unwrap();
        let mut engine = TagEngine::new(Arc::new(MemoryStore::new()), settings);
        engine
            .add_mapping(DirectoryMapping::new("projects", ["work"]))
            .unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();
        assert!(engine.observe_directory("projects/new").is_err());
        assert_eq!(engine.settings().directory_tag_mappings.len(), 1);

        std::fs::remove_file(&dir).unwrap();
        assert!(engine.observe_directory("projects/new").unwrap());
        assert_eq!(engine.settings().directory_tag_mappings.len(), 2);
        assert!(!engine.observe_directory("projects/new").unwrap());
    }

    #[tokio::test]
    async fn create_adds_resolution_and_keeps_user_tags() {
        let mut engine = engine(
            FolderDepth::Last1,
            vec![DirectoryMapping::new("a", ["custom"])],
        );
        engine.store().insert_with_tags("a/b/n.md", &["mine"]);
        let change = engine.document_created("a/b/n.md").await.unwrap();
        assert_eq!(change, DocumentChange::Modified);
        assert_eq!(
            engine.store().tags("a/b/n.md").unwrap(),
            vec!["mine", "b", "custom"]
        );

        let again = engine.document_created("a/b/n.md").await.unwrap();
        assert_eq!(again, DocumentChange::Unchanged);
        assert_eq!(engine.store().writes(), 1);
    }

    #[tokio::test]
    async fn create_inherits_ancestor_mapping_once() {
        let mut engine = engine(
            FolderDepth::Last1,
            vec![DirectoryMapping::new("projects", ["work"])],
        );
        engine.store().insert_with_tags("projects/new/n.md", &[]);
        engine.document_created("projects/new/n.md").await.unwrap();
        let mappings = &engine.settings().directory_tag_mappings;
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings.get(1).unwrap(), &DirectoryMapping::new("projects/new", ["work"]));
        assert_eq!(
            engine.store().tags("projects/new/n.md").unwrap(),
            vec!["new", "work"]
        );

        engine.store().insert_with_tags("projects/new/m.md", &[]);
        engine.document_created("projects/new/m.md").await.unwrap();
        assert_eq!(engine.settings().directory_tag_mappings.len(), 2);
    }

    #[tokio::test]
    async fn move_swaps_folder_tags() {
        let mut engine = engine(FolderDepth::Last1, Vec::new());
        engine.store().insert_with_tags("a/c/note.md", &["b", "x"]);
        let change = engine
            .document_renamed("a/b/note.md", "a/c/note.md")
            .await
            .unwrap();
        assert_eq!(change, DocumentChange::Modified);
        assert_eq!(engine.store().tags("a/c/note.md").unwrap(), vec!["x", "c"]);
    }

    #[tokio::test]
    async fn directory_rename_moves_mappings_and_retags_children() {
        let mut engine = engine(
            FolderDepth::Last1,
            vec![
                DirectoryMapping::new("a/old", ["t"]),
                DirectoryMapping::new("a/old/child", ["c"]),
            ],
        );
        engine.store().insert_with_tags("a/old/n.md", &["old", "t", "u"]);
        engine.store().insert_with_tags("a/old/child/m.md", &["child", "t", "c"]);
        engine.store().insert_with_tags("z/other.md", &["z"]);
        engine.store().rename_directory("a/old", "a/new");

        let report = engine.directory_renamed("a/old", "a/new").await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.modified, 1);

        let dirs: Vec<_> = engine
            .settings()
            .directory_tag_mappings
            .iter()
            .map(|m| m.directory.clone())
            .collect();
        assert_eq!(dirs, vec!["a/new", "a/new/child"]);
        assert_eq!(engine.store().tags("a/new/n.md").unwrap(), vec!["t", "u", "new"]);
        assert_eq!(
            engine.store().tags("a/new/child/m.md").unwrap(),
            vec!["child", "t", "c"]
        );
    }

    #[tokio::test]
    async fn mapping_lifecycle_touches_only_its_own_tags() {
        let mut engine = engine(
            FolderDepth::Last1,
            vec![DirectoryMapping::new("p", ["shared"])],
        );
        engine.store().insert_with_tags("p/q/n.md", &["q", "shared", "user"]);
        engine.store().insert_with_tags("r/n.md", &["r"]);

        let added = engine
            .add_mapping(DirectoryMapping::new("p/q", ["shared", "q", "extra"]))
            .unwrap();
        assert_eq!(added.previous, None);
        let report = engine.update_tags_for_mapping(&added, false).await.unwrap();
        assert_eq!(report.modified, 1);
        assert_eq!(
            engine.store().tags("p/q/n.md").unwrap(),
            vec!["q", "shared", "user", "extra"]
        );

        let removed = engine.remove_mapping(added.index).unwrap();
        engine.remove_tags_for_mapping(&removed, false).await.unwrap();
        // `q` is folder-derived and `shared` comes from the `p` mapping.
        assert_eq!(
            engine.store().tags("p/q/n.md").unwrap(),
            vec!["q", "shared", "user"]
        );
        assert_eq!(engine.store().tags("r/n.md").unwrap(), vec!["r"]);
    }

    #[tokio::test]
    async fn editing_a_mapping_moves_its_tags() {
        let mut engine = engine(
            FolderDepth::Last1,
            vec![DirectoryMapping::new("a", ["ta"])],
        );
        engine.store().insert_with_tags("a/n.md", &["a", "ta"]);
        engine.store().insert_with_tags("b/n.md", &["b"]);

        let change = engine
            .edit_mapping(0, DirectoryMapping::new("b", ["tb"]))
            .unwrap();
        assert_eq!(change.previous.as_ref().unwrap().directory, "a");
        let report = engine.update_tags_for_mapping(&change, false).await.unwrap();
        assert_eq!(report.modified, 2);
        assert_eq!(engine.store().tags("a/n.md").unwrap(), vec!["a"]);
        assert_eq!(engine.store().tags("b/n.md").unwrap(), vec!["b", "tb"]);
    }

    #[tokio::test]
    async fn dry_run_counts_without_writing() {
        let engine = engine(
            FolderDepth::Last1,
            vec![DirectoryMapping::new("a", ["x"])],
        );
        engine.store().insert_with_tags("a/n.md", &[]);
        let report = engine.apply_tags_for_mapping(0, true).await.unwrap();
        assert_eq!(report.modified, 1);
        assert_eq!(engine.store().writes(), 0);
        assert_eq!(engine.store().tags("a/n.md"), None);
    }

    #[tokio::test]
    async fn bad_mapping_index_is_an_error() {
        let mut engine = engine(FolderDepth::Last1, Vec::new());
        assert!(matches!(
            engine.remove_mapping(4),
            Err(EngineError::Mapping(MappingError::NoSuchMapping(4)))
        ));
        assert!(engine.apply_tags_for_mapping(0, false).await.is_err());
    }
}
