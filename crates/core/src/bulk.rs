//! Vault-wide maintenance runs: reapply, remove derived tags, full reset.

use crate::engine::{DocumentChange, EngineError, TagEngine};
use crate::reconcile::TagEdit;
use serde::Serialize;
use storage::DocumentStore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Recompute every document's tags under the current settings.
    Reapply,
    /// Strip derived tags, keep settings.
    RemoveDerived,
    /// Strip derived tags, then drop every directory mapping.
    CompleteReset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub path: String,
    pub error: String,
}

/// `processed` counts documents handled without error, skipped ones included;
/// failed documents are only listed in `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub processed: usize,
    pub modified: usize,
    pub skipped: usize,
    pub failed: Vec<FailedDocument>,
}

impl BulkReport {
    pub fn record(&mut self, doc_path: &str, result: Result<DocumentChange, EngineError>) {
        if result.is_ok() {
            self.processed += 1;
        }
        match result {
            Ok(DocumentChange::Modified) => self.modified += 1,
            Ok(DocumentChange::Unchanged) => {}
            Ok(DocumentChange::Skipped(reason)) => {
                debug!(path = doc_path, %reason, "skipped");
                self.skipped += 1;
            }
            Err(e) => {
                warn!(path = doc_path, error = %e, "document failed");
                self.failed.push(FailedDocument {
                    path: doc_path.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<S: DocumentStore> TagEngine<S> {
    /// Runs `action` over every document. A failing document is recorded and
    /// the run carries on.
    pub async fn run_bulk(
        &mut self,
        action: BulkAction,
        dry_run: bool,
    ) -> Result<BulkReport, EngineError> {
        let documents = self.store().list_documents().await?;
        let mut report = BulkReport::default();

        for doc in &documents {
            let resolved = self.resolve(doc);
            let stale = self.stale_tags(doc).await;
            let edit = match action {
                BulkAction::Reapply => TagEdit::rerun(&resolved, &stale),
                BulkAction::RemoveDerived | BulkAction::CompleteReset => {
                    TagEdit::strip(&resolved, &stale)
                }
            };
            let result = self.apply_edit(doc, &edit, dry_run).await;
            if !dry_run && matches!(result, Ok(ref change) if !change.is_skipped()) {
                match action {
                    BulkAction::Reapply => self.ledger_record(doc, resolved.as_slice()).await,
                    _ => self.ledger_forget(doc).await,
                }
            }
            report.record(doc, result.map_err(EngineError::from));
        }

        if action == BulkAction::CompleteReset && !dry_run {
            self.update_settings(|s| s.directory_tag_mappings.clear())?;
            if let Some(ledger) = self.ledger() {
                if let Err(e) = ledger.clear().await {
                    warn!(error = %e, "ledger clear failed");
                }
            }
            self.clear_seen_directories();
        }

        info!(
            ?action,
            dry_run,
            processed = report.processed,
            modified = report.modified,
            skipped = report.skipped,
            failed = report.failed.len(),
            "bulk run finished"
        );
        Ok(report)
    }
}
