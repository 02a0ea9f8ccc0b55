use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cli::app::{self, VaultEngine};
use cli::watch;
use foldertag_core::config::{self, AppConfig};
use foldertag_core::{parse_tag_list, BulkAction, DirectoryMapping, FolderDepth, VaultEvent};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    init_logging(&cfg, cli.verbose);

    let json = cli.json;
    match cli.command {
        Commands::Resolve { path } => run_resolve(&cfg, &path, json).await,
        Commands::Apply { dry_run } => run_bulk(&cfg, BulkAction::Reapply, dry_run, json).await,
        Commands::RemoveDerived { dry_run } => {
            run_bulk(&cfg, BulkAction::RemoveDerived, dry_run, json).await
        }
        Commands::Reset { dry_run, yes } => {
            if !dry_run && !yes {
                bail!("reset strips derived tags and deletes every directory mapping; pass --yes to confirm");
            }
            run_bulk(&cfg, BulkAction::CompleteReset, dry_run, json).await
        }
        Commands::Mapping { action } => run_mapping(&cfg, action, json).await,
        Commands::Settings { action } => run_settings(&cfg, action, json).await,
        Commands::Event { event } => run_event(&cfg, event).await,
        Commands::Watch => watch::watch_vault(app::open_engine(&cfg).await?).await,
    }
}

/// RUST_LOG always wins; otherwise the configured level, or DEBUG with -v.
fn init_logging(cfg: &AppConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level))
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[derive(Parser)]
#[command(name = "folder-tags")]
#[command(about = "Tag notes from the folders they live in", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tags a document path resolves to
    Resolve { path: String },
    /// Recompute tags for every document under the current settings
    Apply {
        #[arg(long)]
        dry_run: bool,
    },
    /// Strip derived tags from every document, keeping settings
    RemoveDerived {
        #[arg(long)]
        dry_run: bool,
    },
    /// Strip derived tags and delete all directory mappings
    Reset {
        #[arg(long)]
        dry_run: bool,
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Manage directory -> tags mappings
    Mapping {
        #[command(subcommand)]
        action: MappingCommand,
    },
    /// Show or change the tag formatting settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Report a change made to the vault while nothing was watching
    Event {
        #[command(subcommand)]
        event: EventCommand,
    },
    /// Watch the vault and tag documents as they are created or moved
    Watch,
}

#[derive(Subcommand)]
enum MappingCommand {
    List,
    /// Add a mapping, or replace the tags of the directory's existing one
    Add {
        directory: String,
        /// Comma-separated tags
        tags: String,
        /// Also update documents under the directory
        #[arg(long)]
        apply: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Change the directory and/or tags of the mapping at INDEX
    Edit {
        index: usize,
        #[arg(long)]
        directory: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        apply: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete the mapping at INDEX
    Remove {
        index: usize,
        /// Also strip its tags from documents under the directory
        #[arg(long)]
        apply: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// last1 | last2Split | last2Joined | fullPath | allSplit
    Depth { value: FolderDepth },
    Prefix { value: String },
    Suffix { value: String },
}

#[derive(Subcommand)]
enum EventCommand {
    Created { path: String },
    Renamed { from: String, to: String },
    DirCreated { path: String },
    DirRenamed { from: String, to: String },
}

async fn run_resolve(cfg: &AppConfig, path: &str, json: bool) -> Result<()> {
    let engine = app::open_engine(cfg).await?;
    let resolved = engine.resolve(path);
    if json {
        return app::print_json(&serde_json::json!({
            "path": path,
            "tags": resolved.as_slice(),
        }));
    }
    if resolved.is_empty() {
        println!("{path}: no tags");
    } else {
        println!("{path}: {}", resolved.as_slice().join(", "));
    }
    Ok(())
}

async fn run_bulk(cfg: &AppConfig, action: BulkAction, dry_run: bool, json: bool) -> Result<()> {
    let mut engine = app::open_engine(cfg).await?;
    let report = engine.run_bulk(action, dry_run).await?;
    let label = match action {
        BulkAction::Reapply => "apply",
        BulkAction::RemoveDerived => "remove-derived",
        BulkAction::CompleteReset => "reset",
    };
    app::print_report(label, &report, dry_run, json)?;
    if !report.is_clean() {
        bail!("{} document(s) failed", report.failed.len());
    }
    Ok(())
}

async fn run_mapping(cfg: &AppConfig, action: MappingCommand, json: bool) -> Result<()> {
    let mut engine = app::open_engine(cfg).await?;
    match action {
        MappingCommand::List => app::print_mappings(&engine.settings().directory_tag_mappings, json),
        MappingCommand::Add {
            directory,
            tags,
            apply,
            dry_run,
        } => {
            let change = engine.add_mapping(DirectoryMapping::new(&directory, parse_tag_list(&tags)))?;
            if !json {
                println!("mapping {} saved", change.index);
            }
            sync_mapping(&engine, &change, apply, dry_run, json).await
        }
        MappingCommand::Edit {
            index,
            directory,
            tags,
            apply,
            dry_run,
        } => {
            let Some(current) = engine.settings().directory_tag_mappings.get(index).cloned() else {
                bail!("no directory mapping at index {index}");
            };
            let directory = directory.unwrap_or(current.directory);
            let tags = tags.map(|t| parse_tag_list(&t)).unwrap_or(current.tags);
            let change = engine.edit_mapping(index, DirectoryMapping::new(&directory, tags))?;
            if !json {
                println!("mapping {} updated", change.index);
            }
            sync_mapping(&engine, &change, apply, dry_run, json).await
        }
        MappingCommand::Remove {
            index,
            apply,
            dry_run,
        } => {
            let removed = engine.remove_mapping(index)?;
            if !json {
                println!("removed mapping {} ({})", index, removed.directory);
            }
            if apply {
                let report = engine.remove_tags_for_mapping(&removed, dry_run).await?;
                app::print_report("mapping-remove", &report, dry_run, json)?;
            }
            Ok(())
        }
    }
}

async fn sync_mapping(
    engine: &VaultEngine,
    change: &foldertag_core::MappingChange,
    apply: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if !apply {
        return Ok(());
    }
    let report = engine.update_tags_for_mapping(change, dry_run).await?;
    app::print_report("mapping-apply", &report, dry_run, json)
}

async fn run_settings(cfg: &AppConfig, action: SettingsCommand, json: bool) -> Result<()> {
    let mut engine = app::open_engine(cfg).await?;
    match action {
        SettingsCommand::Show => return app::print_settings(engine.settings(), json),
        SettingsCommand::Depth { value } => engine.update_settings(|s| s.folder_depth = value)?,
        SettingsCommand::Prefix { value } => engine.update_settings(|s| s.tag_prefix = value)?,
        SettingsCommand::Suffix { value } => engine.update_settings(|s| s.tag_suffix = value)?,
    }
    app::print_settings(engine.settings(), json)?;
    if !json {
        println!("run `folder-tags apply` to retag existing documents");
    }
    Ok(())
}

async fn run_event(cfg: &AppConfig, event: EventCommand) -> Result<()> {
    let mut engine = app::open_engine(cfg).await?;
    let event = match event {
        EventCommand::Created { path } => VaultEvent::Created { path },
        EventCommand::Renamed { from, to } => VaultEvent::Renamed { from, to },
        EventCommand::DirCreated { path } => VaultEvent::DirectoryCreated { path },
        EventCommand::DirRenamed { from, to } => VaultEvent::DirectoryRenamed { from, to },
    };
    engine.handle_event(&event).await?;
    Ok(())
}
