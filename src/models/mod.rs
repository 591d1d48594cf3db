//! 数据模型层

pub mod file_tree;

pub use file_tree::{
    should_ignore, FileId, FileNode, FolderNode, NodeKind, NodePath, TreeError, VirtualFileNode,
    VirtualFileTree,
};
