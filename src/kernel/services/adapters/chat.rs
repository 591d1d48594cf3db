//! Chat assistant: request handling and the OpenAI-compatible provider.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::kernel::services::ports::{
    BoxFuture, ChatHttpResponse, ChatMessage, ChatProvider, ChatRequest, ChatResponseBody,
    ChatRole, ChatSettings, UpstreamError, ValidationError,
};

pub const SYSTEM_PROMPT: &str = "You are a helpful AI coding assistant. You help developers with:
- Code explanations and debugging
- Best practices and architecture advice
- Writing clean, efficient code
- Troubleshooting errors
- Code reviews and optimizations

Always provide clear, practical answers. Use proper code formatting when showing examples.";

const GENERATION_FAILED: &str = "Failed to generate AI response";

pub struct ChatService {
    provider: Arc<dyn ChatProvider>,
    history_limit: usize,
}

impl ChatService {
    pub fn new(provider: Arc<dyn ChatProvider>, history_limit: usize) -> Self {
        Self {
            provider,
            history_limit,
        }
    }

    pub async fn handle_json(&self, body: &str) -> ChatHttpResponse {
        match ChatRequest::from_json(body) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => rejected(err),
        }
    }

    pub async fn handle(&self, body: &Value) -> ChatHttpResponse {
        match ChatRequest::from_value(body) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => rejected(err),
        }
    }

    async fn handle_request(&self, request: ChatRequest) -> ChatHttpResponse {
        let messages = self.build_messages(request);
        tracing::info!(messages = messages.len(), "generating chat response");

        match self.provider.complete(messages).await {
            Ok(response) => ChatHttpResponse {
                status: 200,
                body: ChatResponseBody::Reply {
                    response,
                    timestamp: timestamp(),
                },
            },
            Err(err) => {
                tracing::error!(error = %err, "chat generation failed");
                ChatHttpResponse {
                    status: 500,
                    body: ChatResponseBody::Failure {
                        error: GENERATION_FAILED.to_string(),
                        details: Some(err.to_string()),
                        timestamp: timestamp(),
                    },
                }
            }
        }
    }

    /// System instruction, the most recent `history_limit` turns, then the new message.
    pub fn build_messages(&self, request: ChatRequest) -> Vec<ChatMessage> {
        let ChatRequest { message, history } = request;
        let skip = history.len().saturating_sub(self.history_limit);

        let mut messages = Vec::with_capacity(history.len() - skip + 2);
        messages.push(ChatMessage::new(ChatRole::System, SYSTEM_PROMPT));
        messages.extend(history.into_iter().skip(skip));
        messages.push(ChatMessage::new(ChatRole::User, message));
        messages
    }
}

fn rejected(err: ValidationError) -> ChatHttpResponse {
    tracing::debug!(error = %err, "chat request rejected");
    ChatHttpResponse {
        status: 400,
        body: ChatResponseBody::Failure {
            error: err.to_string(),
            details: None,
            timestamp: timestamp(),
        },
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub struct OpenAiChatProvider {
    http_client: reqwest::Client,
    settings: ChatSettings,
}

impl OpenAiChatProvider {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            settings,
        }
    }
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatProvider for OpenAiChatProvider {
    fn complete(&self, messages: Vec<ChatMessage>) -> BoxFuture<'_, Result<String, UpstreamError>> {
        Box::pin(async move {
            let api_key = self.settings.api_key().ok_or(UpstreamError::MissingApiKey)?;
            let body = json!({
                "model": self.settings.model,
                "messages": messages,
                "temperature": self.settings.temperature,
                "max_tokens": self.settings.max_tokens,
                "stream": false,
            });

            let response = self
                .http_client
                .post(&self.settings.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| UpstreamError::Transport(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), body = %body, "chat provider error");
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let data = response
                .json::<CompletionBody>()
                .await
                .map_err(|err| UpstreamError::Malformed(err.to_string()))?;
            first_choice_content(data)
        })
    }
}

fn first_choice_content(data: CompletionBody) -> Result<String, UpstreamError> {
    data.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| UpstreamError::Malformed("missing choices[0].message.content".to_string()))
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/chat.rs"]
mod tests;
