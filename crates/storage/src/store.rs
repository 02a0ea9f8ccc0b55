//! The host document store contract.

use async_trait::async_trait;
use serde_yaml::Mapping;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("path is outside the vault: {0}")]
    OutsideVault(String),
    #[error("document unavailable: {0}")]
    Unavailable(String),
    #[error("invalid exclude pattern: {0}")]
    Glob(#[from] globset::Error),
}

/// Result of one metadata read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// The edit reported no change; nothing was written.
    Unchanged,
    Written,
    /// The metadata block could not be edited (e.g. it is not a mapping).
    Skipped(String),
}

impl MetadataOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, MetadataOutcome::Written)
    }
}

/// Documents are addressed by vault-relative, `/`-separated paths.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError>;

    /// Exclusive read-modify-write of a document's metadata block.
    ///
    /// `edit` receives the latest stored mapping and returns whether it
    /// changed anything. The store persists the mapping only when it did.
    async fn update_metadata(
        &self,
        path: &str,
        edit: &mut (dyn for<'m> FnMut(&'m mut Mapping) -> bool + Send),
    ) -> Result<MetadataOutcome, StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_documents().await
    }

    async fn update_metadata(
        &self,
        path: &str,
        edit: &mut (dyn for<'m> FnMut(&'m mut Mapping) -> bool + Send),
    ) -> Result<MetadataOutcome, StoreError> {
        (**self).update_metadata(path, edit).await
    }
}
