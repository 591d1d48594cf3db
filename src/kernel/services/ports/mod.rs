//! Service ports: traits + data contracts.

pub mod chat;
pub mod completion;
pub mod runtime;
pub mod sandbox;
pub mod settings;
pub mod storage;

pub use chat::{
    ChatHttpResponse, ChatMessage, ChatProvider, ChatRequest, ChatResponseBody, ChatRole,
    ValidationError,
};
pub use completion::{CompletionClient, CompletionRequest, CompletionResponse, UpstreamError};
pub use runtime::BoxFuture;
pub use sandbox::{RuntimeError, RuntimeState, SandboxError, SandboxInstance, SandboxProvider};
pub use settings::{ChatSettings, CompletionSettings, SandboxSettings, Settings};
pub use storage::{
    NewProject, PlaygroundStore, ProjectMetadata, ProjectRecord, ProjectUpdate, StorageError,
    Template,
};
