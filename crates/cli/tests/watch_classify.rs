use cli::watch::classify;
use foldertag_core::VaultEvent;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::fs;
use storage::FsVault;

fn vault(root: &std::path::Path) -> FsVault {
    FsVault::open(root, "md", &["templates/**".to_string()]).unwrap()
}

#[test]
fn creates_are_split_into_documents_and_directories() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("notes/new")).unwrap();
    let v = vault(root);

    let event = Event::new(EventKind::Create(CreateKind::Any))
        .add_path(root.join("notes/new"))
        .add_path(root.join("notes/a.md"))
        .add_path(root.join("notes/a.png"))
        .add_path(root.join(".obsidian/workspace.md"))
        .add_path(root.join("templates/t.md"));
    assert_eq!(
        classify(&v, &event),
        vec![
            VaultEvent::DirectoryCreated {
                path: "notes/new".into()
            },
            VaultEvent::Created {
                path: "notes/a.md".into()
            },
        ]
    );
}

#[test]
fn renames_of_files_and_folders() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("b")).unwrap();
    let v = vault(root);

    let file = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(root.join("a/n.md"))
        .add_path(root.join("c/n.md"));
    assert_eq!(
        classify(&v, &file),
        vec![VaultEvent::Renamed {
            from: "a/n.md".into(),
            to: "c/n.md".into()
        }]
    );

    let dir = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(root.join("a"))
        .add_path(root.join("b"));
    assert_eq!(
        classify(&v, &dir),
        vec![VaultEvent::DirectoryRenamed {
            from: "a".into(),
            to: "b".into()
        }]
    );

    let became_note = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(root.join("c/n.txt"))
        .add_path(root.join("c/n.md"));
    assert_eq!(
        classify(&v, &became_note),
        vec![VaultEvent::Created {
            path: "c/n.md".into()
        }]
    );
}

#[test]
fn paths_outside_the_vault_are_ignored() {
    let temp = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let v = vault(temp.path());
    let event = Event::new(EventKind::Create(CreateKind::File))
        .add_path(elsewhere.path().join("n.md"));
    assert!(classify(&v, &event).is_empty());
}
