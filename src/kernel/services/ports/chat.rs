use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::completion::UpstreamError;
use super::runtime::BoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("Message is required and must be a string")]
    InvalidMessage,
}

/// A validated chat request. `history` only holds well-formed user/assistant turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Validates a raw body. A missing or non-string `message` is rejected; history
    /// entries without string `role`/`content`, or with a role other than
    /// `user`/`assistant`, are dropped.
    pub fn from_value(body: &Value) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::NotAnObject)?;
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::InvalidMessage)?
            .to_string();

        let history = object
            .get("history")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(history_entry).collect())
            .unwrap_or_default();

        Ok(Self { message, history })
    }

    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }
}

fn history_entry(entry: &Value) -> Option<ChatMessage> {
    let role = match entry.get("role")?.as_str()? {
        "user" => ChatRole::User,
        "assistant" => ChatRole::Assistant,
        _ => return None,
    };
    let content = entry.get("content")?.as_str()?;
    Some(ChatMessage::new(role, content))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponseBody {
    Reply {
        response: String,
        timestamp: String,
    },
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        timestamp: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHttpResponse {
    pub status: u16,
    pub body: ChatResponseBody,
}

/// Upstream chat-completion provider. `messages` already carries the system instruction.
pub trait ChatProvider: Send + Sync {
    fn complete(&self, messages: Vec<ChatMessage>) -> BoxFuture<'_, Result<String, UpstreamError>>;
}
