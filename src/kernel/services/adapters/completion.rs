//! HTTP client for the code-completion endpoint.

use crate::kernel::services::ports::{
    BoxFuture, CompletionClient, CompletionRequest, CompletionResponse, CompletionSettings,
    UpstreamError,
};

pub struct HttpCompletionClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_settings(settings: &CompletionSettings) -> Self {
        Self::new(settings.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<CompletionResponse, UpstreamError>> {
        Box::pin(async move {
            let response = self
                .http_client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|err| UpstreamError::Transport(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), body = %body, "completion endpoint error");
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<CompletionResponse>()
                .await
                .map_err(|err| UpstreamError::Malformed(err.to_string()))
        })
    }
}
