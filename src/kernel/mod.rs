//! Headless playground core.

pub mod language;
pub mod playground;
pub mod services;
pub mod sessions;
pub mod suggestion;

pub use language::LanguageId;
pub use playground::{
    PlaygroundError, PlaygroundSession, RuntimeStatus, SaveReport, SessionServices,
};
pub use sessions::{OpenFileSession, OpenFileSessionStore, SaveTicket};
pub use suggestion::{
    strip_line_numbers, CursorPosition, MarkerId, PendingSuggestion, SuggestionDispatch,
    SuggestionEffect, SuggestionEvent, SuggestionKind, SuggestionOutcome, SuggestionPhase,
    SuggestionRequest, SuggestionState, SuggestionTarget,
};
