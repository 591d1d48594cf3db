//! 虚拟文件树：项目的目录/文件快照（约定为不可变）

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Ordered name segments from the tree root down to a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses a `/`-separated path. Empty segments are dropped, so `"/src//a.js"` equals `"src/a.js"`.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub fn join(&self, name: impl Into<String>) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl From<&str> for NodePath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Stable key for an open tab, derived from a node's full path.
///
/// Identity is path-based only: reloading a tree where a file was renamed
/// yields a different id even if the content is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn for_path(path: &NodePath) -> Self {
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub extension: String,
    #[serde(default)]
    pub content: String,
}

impl FileNode {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let extension = split_extension(&name).to_string();
        Self {
            name,
            extension,
            content: content.into(),
        }
    }
}

fn split_extension(name: &str) -> &str {
    match name.rfind('.') {
        // `.gitignore` has no extension
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<VirtualFileNode>,
}

impl FolderNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<VirtualFileNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn child(&self, name: &str) -> Option<&VirtualFileNode> {
        self.children.iter().find(|c| c.name() == name)
    }

    fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name() == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VirtualFileNode {
    File(FileNode),
    Folder(FolderNode),
}

impl VirtualFileNode {
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Folder(folder) => &folder.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::File(_) => NodeKind::File,
            Self::Folder(_) => NodeKind::Folder,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(file) => Some(file),
            Self::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::File(_) => None,
        }
    }
}

impl From<FileNode> for VirtualFileNode {
    fn from(value: FileNode) -> Self {
        Self::File(value)
    }
}

impl From<FolderNode> for VirtualFileNode {
    fn from(value: FolderNode) -> Self {
        Self::Folder(value)
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("empty path")]
    EmptyPath,
    #[error("a node already exists at {0}")]
    DuplicatePath(String),
    #[error("{0} goes through a file")]
    NotAFolder(String),
    #[error("invalid node name {0:?}")]
    InvalidName(String),
    #[error("failed to import {path}: {message}")]
    Import { path: String, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TreeSnapshot")]
pub struct VirtualFileTree {
    root: FolderNode,
}

/// Unchecked wire form; converted through [`VirtualFileTree::validate`].
#[derive(Deserialize)]
struct TreeSnapshot {
    root: FolderNode,
}

impl TryFrom<TreeSnapshot> for VirtualFileTree {
    type Error = TreeError;

    fn try_from(value: TreeSnapshot) -> Result<Self, Self::Error> {
        let tree = Self { root: value.root };
        tree.validate()?;
        Ok(tree)
    }
}

impl VirtualFileTree {
    pub fn new(root: FolderNode) -> Self {
        Self { root }
    }

    pub fn empty(root_name: impl Into<String>) -> Self {
        Self::new(FolderNode::new(root_name))
    }

    /// Builds a tree from `(path, content)` pairs, creating intermediate folders.
    pub fn from_files<I, P, C>(root_name: impl Into<String>, files: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let mut tree = Self::empty(root_name);
        for (path, content) in files {
            tree.insert_file(&NodePath::parse(path.as_ref()), content.into())?;
        }
        Ok(tree)
    }

    /// Imports a directory from disk. Ignored names and gitignored entries are skipped,
    /// as are files that are not valid UTF-8.
    pub fn from_dir(root_path: &Path) -> Result<Self, TreeError> {
        let root_name = root_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.display().to_string());
        let mut tree = Self::empty(root_name);

        let walker = WalkBuilder::new(root_path)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .filter_entry(|entry| !should_ignore(&entry.file_name().to_string_lossy()))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| TreeError::Import {
                path: root_path.display().to_string(),
                message: e.to_string(),
            })?;
            let Ok(relative) = entry.path().strip_prefix(root_path) else {
                continue;
            };
            let path = NodePath::new(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string()),
            );
            if path.is_empty() {
                continue;
            }

            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir {
                tree.ensure_folder(&path)?;
                continue;
            }

            let bytes = std::fs::read(entry.path()).map_err(|e| TreeError::Import {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
            match String::from_utf8(bytes) {
                Ok(content) => tree.insert_file(&path, content)?,
                Err(_) => {
                    tracing::debug!(path = %path, "skipping non-utf8 file during import");
                }
            }
        }

        Ok(tree)
    }

    pub fn root(&self) -> &FolderNode {
        &self.root
    }

    pub fn node(&self, path: &NodePath) -> Option<&VirtualFileNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.root.child(first)?;
        for segment in rest {
            node = node.as_folder()?.child(segment)?;
        }
        Some(node)
    }

    pub fn file(&self, path: &NodePath) -> Option<&FileNode> {
        self.node(path).and_then(VirtualFileNode::as_file)
    }

    /// Identity of the file at `path` in this snapshot, or `None` if no file lives there.
    pub fn identity(&self, path: &NodePath) -> Option<FileId> {
        self.file(path).map(|_| FileId::for_path(path))
    }

    /// All files. Within a folder, its files come before the contents of its subfolders.
    pub fn files(&self) -> Vec<(NodePath, &FileNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodePath, &FolderNode)> = vec![(NodePath::default(), &self.root)];
        while let Some((prefix, folder)) = stack.pop() {
            let mut folders = Vec::new();
            for child in &folder.children {
                let path = prefix.join(child.name());
                match child {
                    VirtualFileNode::File(file) => out.push((path, file)),
                    VirtualFileNode::Folder(sub) => folders.push((path, sub)),
                }
            }
            // reversed so the first folder is visited first
            stack.extend(folders.into_iter().rev());
        }
        out
    }

    /// Returns a new snapshot with the file at `path` holding `content`.
    pub fn with_file_content(&self, path: &NodePath, content: &str) -> Option<Self> {
        let mut next = self.clone();
        let (last, parents) = path.segments().split_last()?;
        let mut folder = &mut next.root;
        for segment in parents {
            let idx = folder.child_index(segment)?;
            folder = match &mut folder.children[idx] {
                VirtualFileNode::Folder(sub) => sub,
                VirtualFileNode::File(_) => return None,
            };
        }
        let idx = folder.child_index(last)?;
        match &mut folder.children[idx] {
            VirtualFileNode::File(file) => {
                file.content = content.to_string();
                Some(next)
            }
            VirtualFileNode::Folder(_) => None,
        }
    }

    /// Checks that every name is a single non-empty segment and that no two
    /// siblings share a name, i.e. each path addresses at most one node.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut stack = vec![(NodePath::default(), &self.root)];
        while let Some((path, folder)) = stack.pop() {
            let mut seen = rustc_hash::FxHashSet::default();
            for child in &folder.children {
                let name = child.name();
                if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                    return Err(TreeError::InvalidName(name.to_string()));
                }
                let child_path = path.join(name);
                if !seen.insert(name) {
                    return Err(TreeError::DuplicatePath(child_path.to_string()));
                }
                if let VirtualFileNode::Folder(sub) = child {
                    stack.push((child_path, sub));
                }
            }
        }
        Ok(())
    }

    fn ensure_folder(&mut self, path: &NodePath) -> Result<&mut FolderNode, TreeError> {
        let mut folder = &mut self.root;
        let mut walked = NodePath::default();
        for segment in path.segments() {
            walked = walked.join(segment.as_str());
            let idx = match folder.child_index(segment) {
                Some(idx) => idx,
                None => {
                    folder
                        .children
                        .push(VirtualFileNode::Folder(FolderNode::new(segment.as_str())));
                    folder.children.len() - 1
                }
            };
            folder = match &mut folder.children[idx] {
                VirtualFileNode::Folder(sub) => sub,
                VirtualFileNode::File(_) => return Err(TreeError::NotAFolder(walked.to_string())),
            };
        }
        Ok(folder)
    }

    fn insert_file(&mut self, path: &NodePath, content: String) -> Result<(), TreeError> {
        let parent = path.parent().ok_or(TreeError::EmptyPath)?;
        let name = path.file_name().ok_or(TreeError::EmptyPath)?.to_string();
        let folder = self.ensure_folder(&parent)?;
        if folder.child(&name).is_some() {
            return Err(TreeError::DuplicatePath(path.to_string()));
        }
        folder
            .children
            .push(VirtualFileNode::File(FileNode::new(name, content)));
        Ok(())
    }
}

pub fn should_ignore(name: &str) -> bool {
    matches!(
        name,
        ".DS_Store"
            | ".Spotlight-V100"
            | ".Trashes"
            | ".fseventsd"
            | ".TemporaryItems"
            | "Thumbs.db"
            | "desktop.ini"
            | ".git"
            | "node_modules"
    )
}

#[cfg(test)]
#[path = "../../tests/unit/models/file_tree.rs"]
mod tests;
