use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::runtime::BoxFuture;

/// Body posted to the code-completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub file_content: String,
    pub cursor_line: usize,
    pub cursor_column: usize,
    pub suggestion_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: String },
    #[error("unexpected upstream response: {0}")]
    Malformed(String),
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("API key not configured")]
    MissingApiKey,
}

pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<CompletionResponse, UpstreamError>>;
}
