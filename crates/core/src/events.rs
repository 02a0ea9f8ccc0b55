//! Host events and the sequential loop that feeds them to the engine.

use crate::engine::{EngineError, TagEngine};
use storage::DocumentStore;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Something the host observed in the vault. Paths are vault-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Created { path: String },
    Renamed { from: String, to: String },
    DirectoryCreated { path: String },
    DirectoryRenamed { from: String, to: String },
}

impl<S: DocumentStore> TagEngine<S> {
    pub async fn handle_event(&mut self, event: &VaultEvent) -> Result<(), EngineError> {
        match event {
            VaultEvent::Created { path } => {
                self.document_created(path).await?;
            }
            VaultEvent::Renamed { from, to } => {
                self.document_renamed(from, to).await?;
            }
            VaultEvent::DirectoryCreated { path } => {
                self.observe_directory(path)?;
            }
            VaultEvent::DirectoryRenamed { from, to } => {
                let report = self.directory_renamed(from, to).await?;
                debug!(%from, %to, processed = report.processed, "directory rename handled");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<VaultEvent>);

impl EventSender {
    /// Queues an event. Returns `false` once the loop has stopped.
    pub fn send(&self, event: VaultEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Applies events one at a time, in arrival order.
pub struct EventLoop<S> {
    engine: TagEngine<S>,
    rx: mpsc::UnboundedReceiver<VaultEvent>,
}

pub fn event_loop<S: DocumentStore>(engine: TagEngine<S>) -> (EventSender, EventLoop<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), EventLoop { engine, rx })
}

impl<S: DocumentStore> EventLoop<S> {
    /// Runs until every sender is dropped, then hands the engine back.
    pub async fn run(mut self) -> TagEngine<S> {
        let mut handled = 0usize;
        while let Some(event) = self.rx.recv().await {
            if let Err(e) = self.engine.handle_event(&event).await {
                warn!(?event, error = %e, "event failed");
            }
            handled += 1;
        }
        info!(handled, "event loop stopped");
        self.engine
    }
}
