use crate::app::VaultEngine;
use anyhow::Result;
use foldertag_core::{event_loop, EventSender, VaultEvent};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use storage::FsVault;
use tracing::{debug, info, warn};

/// Translates a filesystem notification into vault events. Paths outside the
/// vault, excluded paths and non-documents are dropped.
pub fn classify(vault: &FsVault, event: &Event) -> Vec<VaultEvent> {
    let mut out = Vec::new();
    match event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                let Some(rel) = vault.relative(path) else {
                    continue;
                };
                if rel.is_empty() || vault.is_excluded(&rel) {
                    continue;
                }
                let is_dir = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    _ => path.is_dir(),
                };
                if is_dir {
                    out.push(VaultEvent::DirectoryCreated { path: rel });
                } else if vault.is_document(&rel) {
                    out.push(VaultEvent::Created { path: rel });
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            if let Some(ev) = classify_rename(vault, &event.paths[0], &event.paths[1]) {
                out.push(ev);
            }
        }
        // Moved in from somewhere we do not watch.
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                let Some(rel) = vault.relative(path) else {
                    continue;
                };
                if path.is_dir() {
                    if !rel.is_empty() && !vault.is_excluded(&rel) {
                        out.push(VaultEvent::DirectoryCreated { path: rel });
                    }
                } else if vault.is_document(&rel) {
                    out.push(VaultEvent::Created { path: rel });
                }
            }
        }
        _ => {}
    }
    out
}

fn classify_rename(vault: &FsVault, from: &Path, to: &Path) -> Option<VaultEvent> {
    let to_rel = vault.relative(to)?;
    if to.is_dir() {
        let from_rel = vault.relative(from)?;
        if from_rel.is_empty() || to_rel.is_empty() || vault.is_excluded(&to_rel) {
            return None;
        }
        return Some(VaultEvent::DirectoryRenamed {
            from: from_rel,
            to: to_rel,
        });
    }
    if !vault.is_document(&to_rel) {
        return None;
    }
    match vault.relative(from).filter(|rel| vault.is_document(rel)) {
        Some(from_rel) => Some(VaultEvent::Renamed {
            from: from_rel,
            to: to_rel,
        }),
        // Became a document by extension change or moved out of an excluded folder.
        None => Some(VaultEvent::Created { path: to_rel }),
    }
}

fn forward(vault: &FsVault, sender: &EventSender, result: notify::Result<Event>) {
    match result {
        Ok(event) => {
            for ev in classify(vault, &event) {
                debug!(?ev, "queued");
                if !sender.send(ev) {
                    warn!("event loop is gone, dropping event");
                }
            }
        }
        Err(e) => warn!(error = %e, "watch error"),
    }
}

/// Watches the vault and feeds events to the engine until Ctrl-C.
pub async fn watch_vault(engine: VaultEngine) -> Result<()> {
    let vault = engine.store().clone();
    let root = vault.root().to_path_buf();
    let (sender, events) = event_loop(engine);
    let worker = tokio::spawn(events.run());

    let handler_vault = vault.clone();
    let handler_sender = sender.clone();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(
        move |res: notify::Result<Event>| forward(&handler_vault, &handler_sender, res),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), "watching vault");
    println!("Watching {} (Ctrl-C to stop)...", root.display());
    tokio::signal::ctrl_c().await?;

    drop(watcher);
    drop(sender);
    let engine = worker.await?;
    info!(
        mappings = engine.settings().directory_tag_mappings.len(),
        "watch stopped"
    );
    Ok(())
}
