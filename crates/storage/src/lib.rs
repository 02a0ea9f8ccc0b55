//! Storage layer: the host collaborators the tagging engine talks to.
//!
//! Holds the document store abstraction and its markdown vault / in-memory
//! implementations, JSON settings persistence, and the SQLite ledger of
//! applied tags (pool setup and migration runner).

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod frontmatter;
pub mod ledger;
pub mod memory;
pub mod settings;
pub mod store;
pub mod vault;

pub use ledger::{AppliedTags, Ledger, LedgerError};
pub use memory::MemoryStore;
pub use settings::{JsonFile, SettingsError};
pub use store::{DocumentStore, MetadataOutcome, StoreError};
pub use vault::FsVault;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}", norm);
        }
    }
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        // An in-memory database lives exactly as long as its single connection.
        opts = opts
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect_with(options).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Embedded from crates/storage/migrations; already-applied ones are skipped.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
