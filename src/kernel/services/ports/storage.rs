use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::runtime::BoxFuture;
use crate::models::{NodePath, VirtualFileTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Template {
    React,
    Nextjs,
    Express,
    Vue,
    Hono,
    Angular,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: Template,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub metadata: ProjectMetadata,
    pub tree: VirtualFileTree,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub template: Template,
    pub tree: VirtualFileTree,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("failed to save {path}: {message}")]
    Write { path: String, message: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Backing store for saved playgrounds. CRUD only.
pub trait PlaygroundStore: Send + Sync {
    fn load_project<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ProjectRecord>, StorageError>>;

    fn save_file<'a>(
        &'a self,
        project_id: &'a str,
        path: &'a NodePath,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    fn create_project(&self, project: NewProject)
        -> BoxFuture<'_, Result<ProjectMetadata, StorageError>>;

    fn update_project<'a>(
        &'a self,
        id: &'a str,
        update: ProjectUpdate,
    ) -> BoxFuture<'a, Result<ProjectMetadata, StorageError>>;

    fn delete_project<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), StorageError>>;

    fn duplicate_project<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ProjectMetadata, StorageError>>;
}
