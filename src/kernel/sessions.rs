//! Open editor tabs: per-file buffers with dirty tracking.

use ropey::Rope;

use crate::kernel::language::LanguageId;
use crate::kernel::suggestion::{CursorPosition, SuggestionTarget};
use crate::models::{FileId, NodePath, VirtualFileTree};

#[derive(Debug, Clone)]
pub struct OpenFileSession {
    id: FileId,
    path: NodePath,
    name: String,
    language: Option<LanguageId>,
    buffer: String,
    baseline: String,
    edit_version: u64,
}

impl OpenFileSession {
    fn new(id: FileId, path: NodePath, name: &str, extension: &str, content: &str) -> Self {
        Self {
            id,
            path,
            name: name.to_string(),
            language: LanguageId::from_extension(extension),
            buffer: content.to_string(),
            baseline: content.to_string(),
            edit_version: 0,
        }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> Option<LanguageId> {
        self.language
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn edit_version(&self) -> u64 {
        self.edit_version
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer != self.baseline
    }

    pub fn display_title(&self) -> String {
        if self.has_unsaved_changes() {
            format!("\u{25cf} {}", self.name)
        } else {
            self.name.clone()
        }
    }

    fn set_buffer(&mut self, text: String) -> bool {
        if self.buffer == text {
            return false;
        }
        self.buffer = text;
        self.edit_version = self.edit_version.saturating_add(1);
        true
    }
}

impl SuggestionTarget for OpenFileSession {
    fn insert_text(&mut self, at: CursorPosition, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let mut rope = Rope::from_str(&self.buffer);
        let char_idx = char_index_at(&rope, at);
        rope.insert(char_idx, text);
        self.set_buffer(rope.to_string())
    }
}

/// Char offset for a zero-based (line, column), clamped to the end of the line
/// (before its line break) and to the end of the text.
fn char_index_at(rope: &Rope, at: CursorPosition) -> usize {
    if at.line >= rope.len_lines() {
        return rope.len_chars();
    }
    let start = rope.line_to_char(at.line);
    let line = rope.line(at.line);
    let mut len = line.len_chars();
    while len > 0 && matches!(line.char(len - 1), '\n' | '\r') {
        len -= 1;
    }
    start + at.column.min(len)
}

/// Buffer content captured by [`OpenFileSessionStore::save`], handed back to
/// [`OpenFileSessionStore::commit`] once persistence succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub id: FileId,
    pub path: NodePath,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct OpenFileSessionStore {
    sessions: Vec<OpenFileSession>,
    active: Option<FileId>,
}

impl OpenFileSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or re-activates) the file at `path`. Re-opening keeps the existing
    /// buffer, unsaved edits included. Returns `None` if `path` is not a file.
    pub fn open(&mut self, tree: &VirtualFileTree, path: &NodePath) -> Option<FileId> {
        let id = tree.identity(path)?;
        if self.index_of(&id).is_some() {
            self.active = Some(id.clone());
            return Some(id);
        }

        let file = tree.file(path)?;
        self.sessions.push(OpenFileSession::new(
            id.clone(),
            path.clone(),
            &file.name,
            &file.extension,
            &file.content,
        ));
        self.active = Some(id.clone());
        Some(id)
    }

    pub fn edit(&mut self, id: &FileId, text: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(session) => session.set_buffer(text.into()),
            None => false,
        }
    }

    pub fn save(&self, id: &FileId) -> Option<SaveTicket> {
        let session = self.get(id)?;
        Some(SaveTicket {
            id: session.id.clone(),
            path: session.path.clone(),
            content: session.buffer.clone(),
        })
    }

    pub fn commit(&mut self, ticket: &SaveTicket) -> bool {
        match self.get_mut(&ticket.id) {
            Some(session) => {
                session.baseline = ticket.content.clone();
                true
            }
            None => false,
        }
    }

    /// Closes a tab. Closing the active tab activates the last remaining one.
    pub fn close(&mut self, id: &FileId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.sessions.remove(index);
        if self.active.as_ref() == Some(id) {
            self.active = self.sessions.last().map(|s| s.id.clone());
        }
        true
    }

    /// Drops every tab, unsaved edits included. Confirmation is the caller's job.
    pub fn close_all(&mut self) {
        self.sessions.clear();
        self.active = None;
    }

    pub fn set_active(&mut self, id: &FileId) -> bool {
        if self.index_of(id).is_none() || self.active.as_ref() == Some(id) {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    pub fn active_id(&self) -> Option<&FileId> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&OpenFileSession> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    pub fn editor_content(&self) -> &str {
        self.active().map(|s| s.buffer()).unwrap_or("")
    }

    pub fn get(&self, id: &FileId) -> Option<&OpenFileSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &FileId) -> Option<&mut OpenFileSession> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    pub fn sessions(&self) -> &[OpenFileSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.sessions.iter().any(OpenFileSession::has_unsaved_changes)
    }

    pub fn dirty_ids(&self) -> Vec<FileId> {
        self.sessions
            .iter()
            .filter(|s| s.has_unsaved_changes())
            .map(|s| s.id.clone())
            .collect()
    }

    fn index_of(&self, id: &FileId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/sessions.rs"]
mod tests;
