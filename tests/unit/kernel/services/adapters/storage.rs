use super::*;
use crate::kernel::services::ports::Template;
use std::future::Future;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn new_project(title: &str) -> NewProject {
    NewProject {
        title: title.to_string(),
        description: Some("demo".to_string()),
        template: Template::React,
        tree: VirtualFileTree::from_files("app", [("src/index.js", "a")]).unwrap(),
    }
}

#[test]
fn created_projects_load_back() {
    let store = InMemoryPlaygroundStore::new();

    let loaded = block_on(async {
        let meta = store.create_project(new_project("Todo")).await.unwrap();
        store.load_project(&meta.id).await.unwrap()
    })
    .unwrap();

    assert_eq!(loaded.metadata.title, "Todo");
    assert_eq!(loaded.metadata.template, Template::React);
    assert_eq!(
        loaded.tree.file(&NodePath::parse("src/index.js")).unwrap().content,
        "a"
    );
}

#[test]
fn missing_projects_load_as_none() {
    let store = InMemoryPlaygroundStore::new();

    assert!(block_on(store.load_project("pg-404")).unwrap().is_none());
}

#[test]
fn save_file_replaces_the_stored_content() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));
    let path = NodePath::parse("src/index.js");

    let record = block_on(async {
        store.save_file(&meta.id, &path, "b").await.unwrap();
        store.load_project(&meta.id).await.unwrap().unwrap()
    });

    assert_eq!(record.tree.file(&path).unwrap().content, "b");
    assert!(record.metadata.updated_at >= meta.updated_at);
}

#[test]
fn save_file_rejects_unknown_projects_and_paths() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));

    let unknown_project =
        block_on(store.save_file("pg-404", &NodePath::parse("src/index.js"), "x")).unwrap_err();
    let unknown_path =
        block_on(store.save_file(&meta.id, &NodePath::parse("src/missing.js"), "x")).unwrap_err();

    assert!(matches!(unknown_project, StorageError::NotFound(_)));
    assert!(matches!(unknown_path, StorageError::Write { .. }));
}

#[test]
fn update_only_touches_the_given_fields() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));

    let updated = block_on(store.update_project(
        &meta.id,
        ProjectUpdate {
            title: Some("Todo v2".to_string()),
            ..ProjectUpdate::default()
        },
    ))
    .unwrap();

    assert_eq!(updated.title, "Todo v2");
    assert_eq!(updated.description.as_deref(), Some("demo"));
}

#[test]
fn duplicate_copies_the_tree_under_a_new_id() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));

    let (copy, record) = block_on(async {
        let copy = store.duplicate_project(&meta.id).await.unwrap();
        let record = store.load_project(&copy.id).await.unwrap().unwrap();
        (copy, record)
    });

    assert_ne!(copy.id, meta.id);
    assert_eq!(copy.title, "Todo (Copy)");
    assert_eq!(copy.template, Template::React);
    assert!(record.tree.file(&NodePath::parse("src/index.js")).is_some());
    assert_eq!(store.len(), 2);
}

#[test]
fn delete_removes_and_reports_missing_ids() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));

    block_on(store.delete_project(&meta.id)).unwrap();

    assert!(store.is_empty());
    assert!(matches!(
        block_on(store.delete_project(&meta.id)),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn replace_tree_swaps_the_whole_snapshot() {
    let store = InMemoryPlaygroundStore::new();
    let meta = store.insert(new_project("Todo"));
    let tree = VirtualFileTree::from_files("app", [("main.js", "b")]).unwrap();

    store.replace_tree(&meta.id, tree.clone()).unwrap();

    let record = block_on(store.load_project(&meta.id)).unwrap().unwrap();
    assert_eq!(record.tree, tree);
    assert!(matches!(
        store.replace_tree("pg-404", tree),
        Err(StorageError::NotFound(_))
    ));
}
