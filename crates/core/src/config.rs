use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vault: VaultConfig,
    pub settings: SettingsConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub root: String,
    pub extension: String,
    pub exclude: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: ".".into(),
            extension: "md".into(),
            exclude: vec![
                ".obsidian/**".into(),
                ".trash/**".into(),
                ".git/**".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Relative paths are taken from the vault root.
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: ".folder-tags/settings.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,
    pub database: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database: ".folder-tags/ledger.db".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn vault_root(&self) -> PathBuf {
        PathBuf::from(&self.vault.root)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.under_root(&self.settings.path)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.under_root(&self.ledger.database)
    }

    fn under_root(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.vault_root().join(path)
        }
    }
}

/// Loads `path` (or `config/default.*` when present), then `FOLDER_TAGS__*`
/// environment overrides, e.g. `FOLDER_TAGS__VAULT__ROOT`.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("FOLDER_TAGS")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
