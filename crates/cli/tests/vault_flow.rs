use cli::app;
use foldertag_core::config::AppConfig;
use foldertag_core::{BulkAction, DirectoryMapping, FolderDepth, VaultEvent};
use std::fs;
use std::path::Path;

fn config_for(root: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.vault.root = root.to_string_lossy().into_owned();
    cfg
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[tokio::test]
async fn created_note_gets_folder_and_mapping_tags() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let cfg = config_for(root);
    let mut engine = app::open_engine(&cfg).await.unwrap();
    engine
        .add_mapping(DirectoryMapping::new("main", ["custom"]))
        .unwrap();

    write(root, "main/sub/leaf/n.md", "---\ntitle: Note\ntags: [mine]\n---\nBody\n");
    engine
        .handle_event(&VaultEvent::Created {
            path: "main/sub/leaf/n.md".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        read(root, "main/sub/leaf/n.md"),
        "---\ntitle: Note\ntags:\n- mine\n- leaf\n- custom\n---\nBody\n"
    );

    // Settings survive a restart.
    drop(engine);
    let engine = app::open_engine(&cfg).await.unwrap();
    let dirs: Vec<_> = engine
        .settings()
        .directory_tag_mappings
        .iter()
        .map(|m| m.directory.clone())
        .collect();
    assert_eq!(dirs, vec!["main", "main/sub/leaf"]);
}

#[tokio::test]
async fn moved_note_swaps_folder_tag() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let mut engine = app::open_engine(&config_for(root)).await.unwrap();

    write(root, "a/c/note.md", "---\ntags:\n- b\n- x\n---\n");
    engine
        .handle_event(&VaultEvent::Renamed {
            from: "a/b/note.md".into(),
            to: "a/c/note.md".into(),
        })
        .await
        .unwrap();
    assert_eq!(read(root, "a/c/note.md"), "---\ntags:\n- x\n- c\n---\n");
}

#[tokio::test]
async fn note_without_frontmatter_gets_one() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let mut engine = app::open_engine(&config_for(root)).await.unwrap();
    write(root, "inbox/plain.md", "just text\n");
    engine.document_created("inbox/plain.md").await.unwrap();
    assert_eq!(read(root, "inbox/plain.md"), "---\ntags:\n- inbox\n---\njust text\n");
}

#[tokio::test]
async fn depth_change_then_reapply_and_reset() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let cfg = config_for(root);
    write(root, "p/q/one.md", "---\ntags: [user]\n---\n");
    write(root, "p/two.md", "body\n");
    write(root, ".obsidian/ignored.md", "---\ntags: [x]\n---\n");

    let mut engine = app::open_engine(&cfg).await.unwrap();
    let report = engine.run_bulk(BulkAction::Reapply, false).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.modified, 2);
    assert_eq!(read(root, "p/q/one.md"), "---\ntags:\n- user\n- q\n---\n");

    engine
        .update_settings(|s| s.folder_depth = FolderDepth::FullPath)
        .unwrap();
    engine.run_bulk(BulkAction::Reapply, false).await.unwrap();
    assert_eq!(read(root, "p/q/one.md"), "---\ntags:\n- user\n- p/q\n---\n");

    let dry = engine.run_bulk(BulkAction::CompleteReset, true).await.unwrap();
    assert_eq!(dry.modified, 2);
    assert_eq!(read(root, "p/two.md"), "---\ntags:\n- p\n---\nbody\n");

    engine.run_bulk(BulkAction::CompleteReset, false).await.unwrap();
    assert_eq!(read(root, "p/q/one.md"), "---\ntags:\n- user\n---\n");
    assert_eq!(read(root, "p/two.md"), "---\n---\nbody\n");
    assert_eq!(read(root, ".obsidian/ignored.md"), "---\ntags: [x]\n---\n");
}

#[tokio::test]
async fn ledger_can_be_disabled() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let mut cfg = config_for(root);
    cfg.ledger.enabled = false;
    let engine = app::open_engine(&cfg).await.unwrap();
    assert!(engine.ledger().is_none());
    assert!(!root.join(".folder-tags/ledger.db").exists());
}

#[tokio::test]
async fn directory_rename_carries_mappings() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let mut engine = app::open_engine(&config_for(root)).await.unwrap();
    engine
        .add_mapping(DirectoryMapping::new("clients/acme", ["acme", "billable"]))
        .unwrap();
    write(root, "clients/acme/n.md", "");
    engine.document_created("clients/acme/n.md").await.unwrap();
    assert_eq!(
        read(root, "clients/acme/n.md"),
        "---\ntags:\n- acme\n- billable\n---\n"
    );

    fs::rename(root.join("clients/acme"), root.join("clients/acme-corp")).unwrap();
    let report = engine
        .directory_renamed("clients/acme", "clients/acme-corp")
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(
        read(root, "clients/acme-corp/n.md"),
        "---\ntags:\n- acme\n- billable\n- acme-corp\n---\n"
    );
    assert_eq!(
        engine.settings().directory_tag_mappings.get(0).unwrap().directory,
        "clients/acme-corp"
    );
}
