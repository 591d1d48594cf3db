use super::*;
use tempfile::tempdir;

fn sample_tree() -> VirtualFileTree {
    VirtualFileTree::from_files(
        "app",
        [
            ("package.json", "{}"),
            ("src/index.js", "a"),
            ("src/lib/util.js", "export {}"),
            ("README.md", "# app"),
        ],
    )
    .unwrap()
}

#[test]
fn node_path_parse_drops_empty_segments() {
    let path = NodePath::parse("/src//index.js");
    assert_eq!(path.segments(), ["src", "index.js"]);
    assert_eq!(path.to_string(), "src/index.js");
    assert_eq!(path.file_name(), Some("index.js"));
    assert_eq!(path.parent(), Some(NodePath::parse("src")));
}

#[test]
fn file_node_splits_extension() {
    assert_eq!(FileNode::new("index.js", "").extension, "js");
    assert_eq!(FileNode::new("archive.tar.gz", "").extension, "gz");
    assert_eq!(FileNode::new(".gitignore", "").extension, "");
    assert_eq!(FileNode::new("Makefile", "").extension, "");
}

#[test]
fn from_files_creates_intermediate_folders() {
    let tree = sample_tree();
    let src = tree.node(&NodePath::parse("src")).unwrap();
    assert_eq!(src.kind(), NodeKind::Folder);
    assert_eq!(
        tree.file(&NodePath::parse("src/lib/util.js")).unwrap().content,
        "export {}"
    );
    assert!(tree.file(&NodePath::parse("src")).is_none());
}

#[test]
fn from_files_rejects_duplicate_paths() {
    let err = VirtualFileTree::from_files("app", [("a.js", "1"), ("a.js", "2")]).unwrap_err();
    assert!(matches!(err, TreeError::DuplicatePath(p) if p == "a.js"));
}

#[test]
fn from_files_rejects_paths_through_files() {
    let err = VirtualFileTree::from_files("app", [("a.js", "1"), ("a.js/b.js", "2")]).unwrap_err();
    assert!(matches!(err, TreeError::NotAFolder(p) if p == "a.js"));
}

#[test]
fn identity_is_deterministic_within_a_snapshot() {
    let tree = sample_tree();
    let path = NodePath::parse("src/index.js");
    let first = tree.identity(&path).unwrap();
    let second = tree.identity(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "src/index.js");
}

#[test]
fn identity_requires_an_existing_file() {
    let tree = sample_tree();
    assert!(tree.identity(&NodePath::parse("src")).is_none());
    assert!(tree.identity(&NodePath::parse("missing.js")).is_none());
}

#[test]
fn files_lists_depth_first_in_child_order() {
    let tree = sample_tree();
    let paths: Vec<String> = tree.files().iter().map(|(p, _)| p.to_string()).collect();
    assert_eq!(
        paths,
        vec!["package.json", "README.md", "src/index.js", "src/lib/util.js"]
    );
}

#[test]
fn with_file_content_leaves_the_original_snapshot_alone() {
    let tree = sample_tree();
    let path = NodePath::parse("src/index.js");
    let next = tree.with_file_content(&path, "ab").unwrap();

    assert_eq!(tree.file(&path).unwrap().content, "a");
    assert_eq!(next.file(&path).unwrap().content, "ab");
    assert!(tree.with_file_content(&NodePath::parse("src"), "x").is_none());
}

#[test]
fn serde_roundtrip_keeps_node_kinds() {
    let tree = sample_tree();
    let json = serde_json::to_string(&tree).unwrap();
    assert!(json.contains("\"kind\":\"folder\""));
    let back: VirtualFileTree = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);
}

#[test]
fn deserializing_rejects_sibling_duplicates() {
    let root = FolderNode::new("app").with_child(
        FolderNode::new("src")
            .with_child(FileNode::new("index.js", "1"))
            .with_child(FileNode::new("index.js", "2")),
    );
    let json = serde_json::to_string(&VirtualFileTree::new(root)).unwrap();

    let err = serde_json::from_str::<VirtualFileTree>(&json).unwrap_err();

    assert!(err.to_string().contains("src/index.js"));
}

#[test]
fn deserializing_rejects_names_that_alias_other_paths() {
    let root = FolderNode::new("app")
        .with_child(FileNode::new("src/index.js", "flat"))
        .with_child(FolderNode::new("src").with_child(FileNode::new("index.js", "nested")));
    let tree = VirtualFileTree::new(root);
    assert!(matches!(tree.validate(), Err(TreeError::InvalidName(name)) if name == "src/index.js"));

    let json = serde_json::to_string(&tree).unwrap();
    assert!(serde_json::from_str::<VirtualFileTree>(&json).is_err());
}

#[test]
fn well_formed_trees_validate() {
    assert!(sample_tree().validate().is_ok());
}

#[test]
fn from_dir_imports_files_and_skips_ignored_names() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    std::fs::write(root.join("src/index.js"), "console.log(1)").unwrap();
    std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
    std::fs::write(root.join("logo.png"), [0xffu8, 0xfe, 0x00]).unwrap();

    let tree = VirtualFileTree::from_dir(root).unwrap();

    assert_eq!(
        tree.file(&NodePath::parse("src/index.js")).unwrap().content,
        "console.log(1)"
    );
    assert!(tree.node(&NodePath::parse("node_modules")).is_none());
    assert!(tree.node(&NodePath::parse("logo.png")).is_none());
}
