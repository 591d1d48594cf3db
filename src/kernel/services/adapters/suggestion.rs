//! Executes suggestion requests against a [`CompletionClient`].

use std::sync::Arc;

use crate::kernel::services::ports::{CompletionClient, CompletionRequest};
use crate::kernel::suggestion::{SuggestionEvent, SuggestionOutcome, SuggestionRequest};

#[derive(Clone)]
pub struct SuggestionRunner {
    client: Arc<dyn CompletionClient>,
}

impl SuggestionRunner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Runs one request. The returned event carries the request id so the
    /// state machine can drop it if a newer request was dispatched meanwhile.
    pub async fn run(&self, request: SuggestionRequest) -> SuggestionEvent {
        let SuggestionRequest {
            request_id,
            kind,
            file_content,
            cursor,
            ..
        } = request;
        tracing::debug!(
            request_id,
            kind = kind.as_str(),
            bytes = file_content.len(),
            line = cursor.line,
            column = cursor.column,
            "requesting ai suggestion"
        );

        let outcome = match self
            .client
            .complete(CompletionRequest {
                file_content,
                cursor_line: cursor.line,
                cursor_column: cursor.column,
                suggestion_type: kind.as_str().to_string(),
            })
            .await
        {
            Ok(response) => match response.suggestion {
                Some(text) if !text.trim().is_empty() => SuggestionOutcome::Text(text),
                _ => SuggestionOutcome::Empty,
            },
            Err(err) => SuggestionOutcome::Failed(err.to_string()),
        };

        SuggestionEvent::Resolved {
            request_id,
            outcome,
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/suggestion.rs"]
mod tests;
