//! AI suggestion state machine.
//!
//! Transitions are pure: [`SuggestionState::dispatch`] takes an event and returns
//! the effects to run. The request itself is executed elsewhere and its outcome
//! comes back as [`SuggestionEvent::Resolved`], tagged with the request id it
//! answers. Only the latest dispatched request may move the state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::FileId;

/// Zero-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// The user asked for a completion.
    Explicit,
    /// Triggered while typing.
    Passive,
}

impl SuggestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Passive => "passive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Buffer a suggestion can be inserted into.
pub trait SuggestionTarget {
    fn insert_text(&mut self, at: CursorPosition, text: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub request_id: u64,
    pub kind: SuggestionKind,
    pub file_id: FileId,
    pub file_content: String,
    pub cursor: CursorPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome {
    Text(String),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggestion {
    pub request_id: u64,
    pub kind: SuggestionKind,
    pub file_id: FileId,
    pub text: String,
    pub position: CursorPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionPhase {
    Idle,
    Loading {
        request_id: u64,
        file_id: FileId,
        kind: SuggestionKind,
        cursor: CursorPosition,
    },
    Ready(PendingSuggestion),
}

#[derive(Debug, Clone)]
pub enum SuggestionEvent {
    Fetch {
        kind: SuggestionKind,
        file_id: FileId,
        buffer: String,
        cursor: CursorPosition,
    },
    Resolved {
        request_id: u64,
        outcome: SuggestionOutcome,
    },
    MarkersShown(Vec<MarkerId>),
    Reject,
    Clear,
    ToggleEnabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionEffect {
    Request(SuggestionRequest),
    ClearMarkers(Vec<MarkerId>),
}

#[derive(Debug, Default)]
pub struct SuggestionDispatch {
    pub effects: Vec<SuggestionEffect>,
    pub state_changed: bool,
}

impl SuggestionDispatch {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed(effects: Vec<SuggestionEffect>) -> Self {
        Self {
            effects,
            state_changed: true,
        }
    }
}

#[derive(Debug)]
pub struct SuggestionState {
    enabled: bool,
    phase: SuggestionPhase,
    latest_request_id: u64,
    markers: Vec<MarkerId>,
}

impl Default for SuggestionState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SuggestionState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            phase: SuggestionPhase::Idle,
            latest_request_id: 0,
            markers: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> &SuggestionPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SuggestionPhase::Loading { .. })
    }

    pub fn pending(&self) -> Option<&PendingSuggestion> {
        match &self.phase {
            SuggestionPhase::Ready(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn latest_request_id(&self) -> u64 {
        self.latest_request_id
    }

    pub fn markers(&self) -> &[MarkerId] {
        &self.markers
    }

    pub fn dispatch(&mut self, event: SuggestionEvent) -> SuggestionDispatch {
        match event {
            SuggestionEvent::Fetch {
                kind,
                file_id,
                buffer,
                cursor,
            } => self.fetch(kind, file_id, buffer, cursor),
            SuggestionEvent::Resolved {
                request_id,
                outcome,
            } => self.resolve(request_id, outcome),
            SuggestionEvent::MarkersShown(markers) => {
                if self.pending().is_none() {
                    // nothing to decorate; the renderer should drop them again
                    return SuggestionDispatch::changed(vec![SuggestionEffect::ClearMarkers(
                        markers,
                    )]);
                }
                self.markers.extend(markers);
                SuggestionDispatch::changed(Vec::new())
            }
            SuggestionEvent::Reject | SuggestionEvent::Clear => self.discard(),
            SuggestionEvent::ToggleEnabled => {
                self.enabled = !self.enabled;
                tracing::debug!(enabled = self.enabled, "ai suggestions toggled");
                SuggestionDispatch::changed(Vec::new())
            }
        }
    }

    /// Inserts the ready suggestion into `target`. No-op unless Ready and a target exists.
    pub fn accept(&mut self, target: Option<&mut dyn SuggestionTarget>) -> SuggestionDispatch {
        let Some(target) = target else {
            return SuggestionDispatch::unchanged();
        };
        let SuggestionPhase::Ready(pending) = &self.phase else {
            return SuggestionDispatch::unchanged();
        };

        let cleaned = strip_line_numbers(&pending.text);
        target.insert_text(pending.position, &cleaned);
        tracing::debug!(
            request_id = pending.request_id,
            chars = cleaned.chars().count(),
            "ai suggestion accepted"
        );

        self.phase = SuggestionPhase::Idle;
        SuggestionDispatch::changed(self.take_marker_effects())
    }

    fn fetch(
        &mut self,
        kind: SuggestionKind,
        file_id: FileId,
        buffer: String,
        cursor: CursorPosition,
    ) -> SuggestionDispatch {
        if !self.enabled {
            tracing::debug!("ai suggestions disabled");
            return SuggestionDispatch::unchanged();
        }

        self.latest_request_id = self.latest_request_id.saturating_add(1);
        let request_id = self.latest_request_id;
        let mut effects = self.take_marker_effects();
        self.phase = SuggestionPhase::Loading {
            request_id,
            file_id: file_id.clone(),
            kind,
            cursor,
        };
        effects.push(SuggestionEffect::Request(SuggestionRequest {
            request_id,
            kind,
            file_id,
            file_content: buffer,
            cursor,
        }));
        SuggestionDispatch::changed(effects)
    }

    fn resolve(&mut self, request_id: u64, outcome: SuggestionOutcome) -> SuggestionDispatch {
        if request_id != self.latest_request_id {
            tracing::debug!(
                request_id,
                latest = self.latest_request_id,
                "discarding superseded ai suggestion"
            );
            return SuggestionDispatch::unchanged();
        }
        let SuggestionPhase::Loading {
            file_id,
            kind,
            cursor,
            ..
        } = &self.phase
        else {
            // rejected or cleared while the request was in flight
            return SuggestionDispatch::unchanged();
        };

        self.phase = match outcome {
            SuggestionOutcome::Text(text) if !text.trim().is_empty() => {
                SuggestionPhase::Ready(PendingSuggestion {
                    request_id,
                    kind: *kind,
                    file_id: file_id.clone(),
                    text: text.trim().to_string(),
                    position: *cursor,
                })
            }
            SuggestionOutcome::Text(_) | SuggestionOutcome::Empty => {
                tracing::debug!(request_id, "no ai suggestion received");
                SuggestionPhase::Idle
            }
            SuggestionOutcome::Failed(error) => {
                tracing::warn!(request_id, error = %error, "ai suggestion failed");
                SuggestionPhase::Idle
            }
        };
        SuggestionDispatch::changed(Vec::new())
    }

    fn discard(&mut self) -> SuggestionDispatch {
        let was_idle = matches!(self.phase, SuggestionPhase::Idle);
        self.phase = SuggestionPhase::Idle;
        let effects = self.take_marker_effects();
        if was_idle && effects.is_empty() {
            return SuggestionDispatch::unchanged();
        }
        SuggestionDispatch::changed(effects)
    }

    fn take_marker_effects(&mut self) -> Vec<SuggestionEffect> {
        if self.markers.is_empty() {
            return Vec::new();
        }
        vec![SuggestionEffect::ClearMarkers(std::mem::take(
            &mut self.markers,
        ))]
    }
}

/// Removes `<digits>:` prefixes the model sometimes echoes back from numbered prompts.
pub fn strip_line_numbers(text: &str) -> String {
    static LINE_NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = LINE_NUMBER
        .get_or_init(|| Regex::new(r"(?m)^\d+:[ \t]*").ok())
        .as_ref()
    else {
        return text.to_string();
    };
    re.replace_all(text, "").into_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/suggestion.rs"]
mod tests;
