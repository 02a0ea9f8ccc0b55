//! The persisted tagging settings blob and its handle.
//!
//! Settings are loaded once, read through [`Settings::get`] and changed only
//! through [`Settings::update`], which persists every effective mutation.

use crate::deriver::{FolderDepth, FormattingPolicy};
use crate::mappings::DirectoryMappingStore;
use serde::{Deserialize, Deserializer, Serialize};
use storage::{JsonFile, SettingsError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TagSettings {
    #[serde(deserialize_with = "lenient_depth")]
    pub folder_depth: FolderDepth,
    pub tag_prefix: String,
    pub tag_suffix: String,
    pub directory_tag_mappings: DirectoryMappingStore,
}

impl TagSettings {
    pub fn policy(&self) -> FormattingPolicy<'_> {
        FormattingPolicy::with_affixes(self.folder_depth, &self.tag_prefix, &self.tag_suffix)
    }

    /// Digest of everything that influences tag resolution.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({
            "folderDepth": self.folder_depth,
            "tagPrefix": self.tag_prefix,
            "tagSuffix": self.tag_suffix,
            "directoryTagMappings": self.directory_tag_mappings,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

fn lenient_depth<'de, D>(deserializer: D) -> Result<FolderDepth, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let parsed = raw.as_str().and_then(|s| s.parse().ok());
    Ok(parsed.unwrap_or_else(|| {
        if !raw.is_null() {
            warn!(value = %raw, "unknown folderDepth, falling back to {}", FolderDepth::default());
        }
        FolderDepth::default()
    }))
}

#[derive(Debug, Clone)]
pub struct Settings {
    current: TagSettings,
    file: Option<JsonFile<TagSettings>>,
}

impl Settings {
    /// Settings that live only in memory.
    pub fn in_memory(current: TagSettings) -> Self {
        Self {
            current,
            file: None,
        }
    }

    pub fn load(file: JsonFile<TagSettings>) -> Result<Self, SettingsError> {
        let current = file.load()?;
        debug!(
            path = %file.path().display(),
            mappings = current.directory_tag_mappings.len(),
            "settings loaded"
        );
        Ok(Self {
            current,
            file: Some(file),
        })
    }

    pub fn get(&self) -> &TagSettings {
        &self.current
    }

    /// Applies `change` and persists the result if it differs from before.
    pub fn update<R>(
        &mut self,
        change: impl FnOnce(&mut TagSettings) -> R,
    ) -> Result<R, SettingsError> {
        let mut next = self.current.clone();
        let out = change(&mut next);
        if next != self.current {
            if let Some(file) = &self.file {
                file.save(&next)?;
            }
            self.current = next;
        }
        Ok(out)
    }
}
