//! Markdown vault on disk. Documents are files with the configured extension;
//! their metadata block is the YAML frontmatter.

use crate::frontmatter;
use crate::store::{DocumentStore, MetadataOutcome, StoreError};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yaml::Mapping;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    extension: String,
    excludes: GlobSet,
}

impl FsVault {
    pub fn open(
        root: impl Into<PathBuf>,
        extension: &str,
        exclude: &[String],
    ) -> Result<Self, StoreError> {
        Ok(Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
            excludes: build_globset(exclude)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Vault-relative, `/`-separated form of an absolute path under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }

    pub fn is_excluded(&self, rel: &str) -> bool {
        rel.split('/').any(|part| part.starts_with('.')) || self.excludes.is_match(rel)
    }

    pub fn is_document(&self, rel: &str) -> bool {
        !self.is_excluded(rel)
            && Path::new(rel)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(&self.extension))
                .unwrap_or(false)
    }

    fn absolute(&self, rel: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        for part in rel.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." {
                return Err(StoreError::OutsideVault(rel.to_string()));
            }
            path.push(part);
        }
        Ok(path)
    }
}

#[async_trait]
impl DocumentStore for FsVault {
    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut docs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || self
                        .relative(e.path())
                        .map(|rel| !self.is_excluded(&rel))
                        .unwrap_or(false)
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = self.relative(entry.path()) {
                if self.is_document(&rel) {
                    docs.push(rel);
                }
            }
        }
        docs.sort();
        Ok(docs)
    }

    async fn update_metadata(
        &self,
        path: &str,
        edit: &mut (dyn for<'m> FnMut(&'m mut Mapping) -> bool + Send),
    ) -> Result<MetadataOutcome, StoreError> {
        let abs = self.absolute(path)?;
        let content = fs::read_to_string(&abs).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(path.to_string())
            } else {
                StoreError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })?;

        let doc = frontmatter::split(&content);
        let parsed = match doc.yaml {
            Some(yaml) => frontmatter::parse(yaml).map_err(|source| StoreError::Yaml {
                path: path.to_string(),
                source,
            })?,
            None => Some(Mapping::new()),
        };
        let Some(mut mapping) = parsed else {
            return Ok(MetadataOutcome::Skipped(
                "frontmatter is not a mapping".to_string(),
            ));
        };

        if !edit(&mut mapping) {
            return Ok(MetadataOutcome::Unchanged);
        }

        let rendered = frontmatter::render(&mapping, doc.body, doc.newline, doc.yaml.is_some())
            .map_err(|source| StoreError::Yaml {
                path: path.to_string(),
                source,
            })?;
        write_atomic(&abs, rendered.as_bytes()).map_err(|source| StoreError::Io {
            path: path.to_string(),
            source,
        })?;
        debug!(path, "metadata written");
        Ok(MetadataOutcome::Written)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(dir: &Path) -> FsVault {
        FsVault::open(dir, "md", &["archive/**".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn lists_markdown_skipping_hidden_and_excluded() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join("archive")).unwrap();
        fs::write(root.join("top.md"), "x").unwrap();
        fs::write(root.join("a/b/note.md"), "x").unwrap();
        fs::write(root.join("a/b/image.png"), "x").unwrap();
        fs::write(root.join(".obsidian/conf.md"), "x").unwrap();
        fs::write(root.join("archive/old.md"), "x").unwrap();

        let docs = vault(root).list_documents().await.unwrap();
        assert_eq!(docs, vec!["a/b/note.md", "top.md"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_loop_does_not_abort_listing() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/good.md"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("a/loop")).unwrap();

        let docs = vault(root).list_documents().await.unwrap();
        assert_eq!(docs, vec!["a/good.md"]);
    }

    #[tokio::test]
    async fn edits_frontmatter_and_keeps_body() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("n.md"), "---\ntitle: T\n---\nbody text\n").unwrap();
        let v = vault(root);

        let outcome = v
            .update_metadata("n.md", &mut |m| {
                frontmatter::write_tags(m, &["a".to_string()]);
                true
            })
            .await
            .unwrap();
        assert!(outcome.is_written());
        let content = fs::read_to_string(root.join("n.md")).unwrap();
        assert_eq!(content, "---\ntitle: T\ntags:\n- a\n---\nbody text\n");
    }

    #[tokio::test]
    async fn unchanged_edit_leaves_file_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let original = "---\ntags: [a]   # odd spacing\n---\nbody\n";
        fs::write(root.join("n.md"), original).unwrap();
        let outcome = vault(root)
            .update_metadata("n.md", &mut |_m| false)
            .await
            .unwrap();
        assert_eq!(outcome, MetadataOutcome::Unchanged);
        assert_eq!(fs::read_to_string(root.join("n.md")).unwrap(), original);
    }

    #[tokio::test]
    async fn non_mapping_frontmatter_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("n.md"), "---\n- a\n- b\n---\nbody\n").unwrap();
        let outcome = vault(root)
            .update_metadata("n.md", &mut |_m| true)
            .await
            .unwrap();
        assert!(matches!(outcome, MetadataOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn rejects_parent_segments() {
        let temp = tempfile::tempdir().unwrap();
        let err = vault(temp.path())
            .update_metadata("../escape.md", &mut |_m| true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OutsideVault(_)));
    }
}
