//! In-process playground store.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::kernel::services::ports::{
    BoxFuture, NewProject, PlaygroundStore, ProjectMetadata, ProjectRecord, ProjectUpdate,
    StorageError,
};
use crate::models::{NodePath, VirtualFileTree};

#[derive(Default)]
pub struct InMemoryPlaygroundStore {
    projects: Mutex<FxHashMap<String, ProjectRecord>>,
    next_id: AtomicU64,
}

impl InMemoryPlaygroundStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Synchronous variant of [`PlaygroundStore::create_project`], for seeding.
    pub fn insert(&self, project: NewProject) -> ProjectMetadata {
        let now = chrono::Utc::now();
        let metadata = ProjectMetadata {
            id: self.allocate_id(),
            title: project.title,
            description: project.description,
            template: project.template,
            created_at: now,
            updated_at: now,
        };
        let record = ProjectRecord {
            metadata: metadata.clone(),
            tree: project.tree,
        };
        self.lock().insert(metadata.id.clone(), record);
        tracing::debug!(id = %metadata.id, title = %metadata.title, "playground created");
        metadata
    }

    /// Swaps a project's whole tree, e.g. after re-importing it from disk.
    pub fn replace_tree(&self, id: &str, tree: VirtualFileTree) -> Result<(), StorageError> {
        let mut projects = self.lock();
        let record = projects
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.tree = tree;
        record.metadata.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("pg-{n:06}")
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, ProjectRecord>> {
        self.projects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlaygroundStore for InMemoryPlaygroundStore {
    fn load_project<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ProjectRecord>, StorageError>> {
        Box::pin(async move { Ok(self.lock().get(id).cloned()) })
    }

    fn save_file<'a>(
        &'a self,
        project_id: &'a str,
        path: &'a NodePath,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let mut projects = self.lock();
            let record = projects
                .get_mut(project_id)
                .ok_or_else(|| StorageError::NotFound(project_id.to_string()))?;
            let tree = record
                .tree
                .with_file_content(path, content)
                .ok_or_else(|| StorageError::Write {
                    path: path.to_string(),
                    message: "no such file in project".to_string(),
                })?;
            record.tree = tree;
            record.metadata.updated_at = chrono::Utc::now();
            tracing::debug!(project_id, path = %path, bytes = content.len(), "file saved");
            Ok(())
        })
    }

    fn create_project(
        &self,
        project: NewProject,
    ) -> BoxFuture<'_, Result<ProjectMetadata, StorageError>> {
        Box::pin(async move { Ok(self.insert(project)) })
    }

    fn update_project<'a>(
        &'a self,
        id: &'a str,
        update: ProjectUpdate,
    ) -> BoxFuture<'a, Result<ProjectMetadata, StorageError>> {
        Box::pin(async move {
            let mut projects = self.lock();
            let record = projects
                .get_mut(id)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            if let Some(title) = update.title {
                record.metadata.title = title;
            }
            if let Some(description) = update.description {
                record.metadata.description = Some(description);
            }
            record.metadata.updated_at = chrono::Utc::now();
            Ok(record.metadata.clone())
        })
    }

    fn delete_project<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            match self.lock().remove(id) {
                Some(_) => {
                    tracing::debug!(id, "playground deleted");
                    Ok(())
                }
                None => Err(StorageError::NotFound(id.to_string())),
            }
        })
    }

    fn duplicate_project<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ProjectMetadata, StorageError>> {
        Box::pin(async move {
            let original = self
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            Ok(self.insert(NewProject {
                title: format!("{} (Copy)", original.metadata.title),
                description: original.metadata.description,
                template: original.metadata.template,
                tree: original.tree,
            }))
        })
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/storage.rs"]
mod tests;
