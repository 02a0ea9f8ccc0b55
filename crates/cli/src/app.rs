//! Wiring from configuration to a ready engine, plus output helpers shared by
//! the subcommands.

use anyhow::{Context, Result};
use foldertag_core::config::AppConfig;
use foldertag_core::{BulkReport, DirectoryMappingStore, Settings, TagEngine, TagSettings};
use serde::Serialize;
use storage::{FsVault, JsonFile, Ledger};
use tracing::{debug, info};

pub type VaultEngine = TagEngine<FsVault>;

pub fn open_vault(cfg: &AppConfig) -> Result<FsVault> {
    let root = cfg.vault_root();
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("vault root {} is not accessible", root.display()))?;
    let vault = FsVault::open(root, &cfg.vault.extension, &cfg.vault.exclude)
        .context("invalid vault exclude pattern")?;
    Ok(vault)
}

/// Opens the vault, loads settings and, when enabled, the applied-tags ledger.
pub async fn open_engine(cfg: &AppConfig) -> Result<VaultEngine> {
    let vault = open_vault(cfg)?;
    let settings_path = cfg.settings_path();
    let settings = Settings::load(JsonFile::<TagSettings>::new(&settings_path))
        .with_context(|| format!("load settings from {}", settings_path.display()))?;
    let mut engine = TagEngine::new(vault, settings);

    if cfg.ledger.enabled {
        let db = cfg.ledger_path();
        let ledger = Ledger::open(&db.to_string_lossy())
            .await
            .with_context(|| format!("open ledger {}", db.display()))?;
        debug!(path = %db.display(), "ledger ready");
        engine = engine.with_ledger(ledger);
    }
    info!(
        root = %engine.store().root().display(),
        depth = %engine.settings().folder_depth,
        mappings = engine.settings().directory_tag_mappings.len(),
        "engine ready"
    );
    Ok(engine)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(label: &str, report: &BulkReport, dry_run: bool, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(report)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("action".into(), label.into());
            obj.insert("dry_run".into(), dry_run.into());
        }
        return print_json(&value);
    }
    let verb = if dry_run { "would modify" } else { "modified" };
    println!(
        "{label}: processed {}, {verb} {}, skipped {}, failed {}",
        report.processed,
        report.modified,
        report.skipped,
        report.failed.len()
    );
    for failed in &report.failed {
        println!("  failed {}: {}", failed.path, failed.error);
    }
    Ok(())
}

pub fn print_mappings(mappings: &DirectoryMappingStore, json: bool) -> Result<()> {
    if json {
        return print_json(mappings);
    }
    if mappings.is_empty() {
        println!("no directory mappings");
    }
    for (i, mapping) in mappings.iter().enumerate() {
        println!("{i:>3}  {}  ->  {}", mapping.directory, mapping.tags.join(", "));
    }
    Ok(())
}

pub fn print_settings(settings: &TagSettings, json: bool) -> Result<()> {
    if json {
        return print_json(settings);
    }
    println!("folder depth: {}", settings.folder_depth);
    println!("tag prefix:   {:?}", settings.tag_prefix);
    println!("tag suffix:   {:?}", settings.tag_suffix);
    println!("mappings:     {}", settings.directory_tag_mappings.len());
    Ok(())
}
