//! One open playground: the project tree, its editor tabs, the suggestion engine,
//! and this session's view of the shared sandbox runtime.

use std::sync::Arc;
use thiserror::Error;

use crate::kernel::services::adapters::{SandboxHandle, SandboxRuntimeManager, SuggestionRunner};
use crate::kernel::services::ports::{
    PlaygroundStore, ProjectMetadata, RuntimeError, StorageError,
};
use crate::kernel::sessions::OpenFileSessionStore;
use crate::kernel::suggestion::{
    CursorPosition, MarkerId, SuggestionDispatch, SuggestionEffect, SuggestionEvent,
    SuggestionKind, SuggestionState, SuggestionTarget,
};
use crate::models::{FileId, NodePath, VirtualFileTree};

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error(transparent)]
    Persistence(#[from] StorageError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("no file is open")]
    NoActiveFile,
    #[error("{0} is not open")]
    NotOpen(FileId),
}

/// Collaborators shared by every session of the process.
#[derive(Clone)]
pub struct SessionServices {
    pub store: Arc<dyn PlaygroundStore>,
    pub runtime: Arc<SandboxRuntimeManager>,
    pub suggestions: SuggestionRunner,
}

/// This session's view of the shared runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub attached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub file_id: FileId,
    pub path: NodePath,
    /// Whether the content also reached the running sandbox.
    pub mirrored: bool,
}

pub struct PlaygroundSession {
    project: ProjectMetadata,
    tree: VirtualFileTree,
    files: OpenFileSessionStore,
    suggestion: SuggestionState,
    runtime_status: RuntimeStatus,
    services: SessionServices,
}

impl PlaygroundSession {
    pub async fn load(services: SessionServices, project_id: &str) -> Result<Self, PlaygroundError> {
        let record = services
            .store
            .load_project(project_id)
            .await?
            .ok_or_else(|| PlaygroundError::ProjectNotFound(project_id.to_string()))?;
        tracing::info!(
            project_id,
            title = %record.metadata.title,
            files = record.tree.files().len(),
            "playground loaded"
        );
        Ok(Self {
            project: record.metadata,
            tree: record.tree,
            files: OpenFileSessionStore::new(),
            suggestion: SuggestionState::default(),
            runtime_status: RuntimeStatus::default(),
            services,
        })
    }

    /// Replaces the tree wholesale from storage. Tabs whose path still holds a
    /// file keep their buffers; the rest are closed and returned.
    pub async fn reload(&mut self) -> Result<Vec<FileId>, PlaygroundError> {
        let id = self.project.id.clone();
        let record = self
            .services
            .store
            .load_project(&id)
            .await?
            .ok_or(PlaygroundError::ProjectNotFound(id))?;
        self.project = record.metadata;
        self.tree = record.tree;

        let removed: Vec<FileId> = self
            .files
            .sessions()
            .iter()
            .filter(|session| self.tree.identity(session.path()).is_none())
            .map(|session| session.id().clone())
            .collect();
        for id in &removed {
            self.files.close(id);
        }
        tracing::info!(
            project_id = %self.project.id,
            closed_tabs = removed.len(),
            "playground reloaded"
        );
        Ok(removed)
    }

    pub fn project_id(&self) -> &str {
        &self.project.id
    }

    pub fn project(&self) -> &ProjectMetadata {
        &self.project
    }

    pub fn tree(&self) -> &VirtualFileTree {
        &self.tree
    }

    pub fn files(&self) -> &OpenFileSessionStore {
        &self.files
    }

    pub fn suggestion(&self) -> &SuggestionState {
        &self.suggestion
    }

    pub fn runtime_status(&self) -> &RuntimeStatus {
        &self.runtime_status
    }

    pub fn suggestion_runner(&self) -> SuggestionRunner {
        self.services.suggestions.clone()
    }

    pub fn editor_content(&self) -> &str {
        self.files.editor_content()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.files.has_unsaved_changes()
    }

    // ---------------- tabs ----------------

    pub fn select_file(&mut self, path: &NodePath) -> Option<FileId> {
        self.files.open(&self.tree, path)
    }

    pub fn set_active(&mut self, id: &FileId) -> bool {
        self.files.set_active(id)
    }

    pub fn edit(&mut self, id: &FileId, text: impl Into<String>) -> bool {
        self.files.edit(id, text)
    }

    pub fn edit_active(&mut self, text: impl Into<String>) -> bool {
        match self.files.active_id().cloned() {
            Some(id) => self.files.edit(&id, text),
            None => false,
        }
    }

    pub fn close_file(&mut self, id: &FileId) -> bool {
        self.files.close(id)
    }

    pub fn close_all(&mut self) {
        self.files.close_all();
    }

    // ---------------- saving ----------------

    pub async fn save_active_file(&mut self) -> Result<SaveReport, PlaygroundError> {
        let id = self
            .files
            .active_id()
            .cloned()
            .ok_or(PlaygroundError::NoActiveFile)?;
        self.save_file(&id).await
    }

    /// Saves every tab with unsaved changes, in tab order.
    pub async fn save_all(&mut self) -> Vec<(FileId, Result<SaveReport, PlaygroundError>)> {
        let mut reports = Vec::new();
        for id in self.files.dirty_ids() {
            let result = self.save_file(&id).await;
            reports.push((id, result));
        }
        reports
    }

    pub async fn save_file(&mut self, id: &FileId) -> Result<SaveReport, PlaygroundError> {
        let ticket = self
            .files
            .save(id)
            .ok_or_else(|| PlaygroundError::NotOpen(id.clone()))?;
        self.services
            .store
            .save_file(&self.project.id, &ticket.path, &ticket.content)
            .await?;
        self.files.commit(&ticket);
        match self.tree.with_file_content(&ticket.path, &ticket.content) {
            Some(tree) => self.tree = tree,
            None => tracing::warn!(path = %ticket.path, "saved file is missing from the tree"),
        }

        let mut mirrored = false;
        if self.services.runtime.is_ready() {
            let path = ticket.path.to_string();
            match self.services.runtime.write_file(&path, &ticket.content).await {
                Ok(()) => mirrored = true,
                Err(err) => tracing::warn!(path = %path, error = %err, "failed to mirror saved file"),
            }
        }

        tracing::info!(path = %ticket.path, mirrored, "file saved");
        Ok(SaveReport {
            file_id: ticket.id,
            path: ticket.path,
            mirrored,
        })
    }

    // ---------------- runtime ----------------

    /// Attaches to the shared runtime (booting it if needed) and mirrors the tree.
    pub async fn start_runtime(&mut self) -> Result<SandboxHandle, PlaygroundError> {
        self.runtime_status.loading = true;
        self.runtime_status.error = None;

        let result = match self.services.runtime.acquire().await {
            Ok(handle) => self
                .services
                .runtime
                .mirror_tree(&self.tree)
                .await
                .map(|_| handle),
            Err(err) => Err(err),
        };

        self.runtime_status.loading = false;
        match result {
            Ok(handle) => {
                self.runtime_status.attached = true;
                Ok(handle)
            }
            Err(err) => {
                tracing::warn!(error = %err, "sandbox runtime unavailable");
                self.runtime_status.attached = self.services.runtime.is_ready();
                self.runtime_status.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    // ---------------- suggestions ----------------

    pub fn set_suggestions_enabled(&mut self, enabled: bool) {
        if self.suggestion.is_enabled() != enabled {
            self.suggestion.dispatch(SuggestionEvent::ToggleEnabled);
        }
    }

    /// Starts a fetch for the active buffer. The returned effects hold the request
    /// to run; its outcome goes back through [`Self::apply_suggestion_event`].
    pub fn begin_suggestion(
        &mut self,
        kind: SuggestionKind,
        cursor: CursorPosition,
    ) -> SuggestionDispatch {
        let Some(active) = self.files.active() else {
            return SuggestionDispatch::default();
        };
        let event = SuggestionEvent::Fetch {
            kind,
            file_id: active.id().clone(),
            buffer: active.buffer().to_string(),
            cursor,
        };
        self.suggestion.dispatch(event)
    }

    pub fn apply_suggestion_event(&mut self, event: SuggestionEvent) -> SuggestionDispatch {
        self.suggestion.dispatch(event)
    }

    /// Fetches and applies a suggestion in one go. Returns the effects left for
    /// the renderer.
    pub async fn request_suggestion(
        &mut self,
        kind: SuggestionKind,
        cursor: CursorPosition,
    ) -> Vec<SuggestionEffect> {
        let dispatch = self.begin_suggestion(kind, cursor);
        let mut remaining = Vec::new();
        for effect in dispatch.effects {
            match effect {
                SuggestionEffect::Request(request) => {
                    let event = self.services.suggestions.run(request).await;
                    remaining.extend(self.suggestion.dispatch(event).effects);
                }
                other => remaining.push(other),
            }
        }
        remaining
    }

    /// Inserts the ready suggestion into the tab it was requested for.
    pub fn accept_suggestion(&mut self) -> SuggestionDispatch {
        let target = self
            .suggestion
            .pending()
            .map(|pending| pending.file_id.clone())
            .and_then(|id| self.files.get_mut(&id));
        self.suggestion
            .accept(target.map(|session| session as &mut dyn SuggestionTarget))
    }

    pub fn reject_suggestion(&mut self) -> SuggestionDispatch {
        self.suggestion.dispatch(SuggestionEvent::Reject)
    }

    pub fn clear_suggestion(&mut self) -> SuggestionDispatch {
        self.suggestion.dispatch(SuggestionEvent::Clear)
    }

    pub fn toggle_suggestions(&mut self) -> SuggestionDispatch {
        self.suggestion.dispatch(SuggestionEvent::ToggleEnabled)
    }

    pub fn show_markers(&mut self, markers: Vec<MarkerId>) -> SuggestionDispatch {
        self.suggestion.dispatch(SuggestionEvent::MarkersShown(markers))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/playground.rs"]
mod tests;
