use std::sync::Arc;
use thiserror::Error;

use super::runtime::BoxFuture;

/// Failure reported by the sandbox vendor itself.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SandboxError(pub String);

impl SandboxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for SandboxError {
    fn from(value: std::io::Error) -> Self {
        Self(value.to_string())
    }
}

/// Boots sandboxed execution runtimes.
pub trait SandboxProvider: Send + Sync {
    fn boot(&self) -> BoxFuture<'_, Result<Arc<dyn SandboxInstance>, SandboxError>>;
}

/// A booted runtime with its own filesystem. Paths are `/`-separated and relative to its root.
pub trait SandboxInstance: Send + Sync {
    fn mkdir<'a>(&'a self, path: &'a str, recursive: bool)
        -> BoxFuture<'a, Result<(), SandboxError>>;

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), SandboxError>>;

    fn teardown(&self) -> BoxFuture<'_, Result<(), SandboxError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Booting,
    Ready,
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("sandbox runtime unavailable: {0}")]
    Unavailable(String),
    #[error("sandbox runtime is not ready")]
    NotReady,
    #[error("invalid sandbox path: {0}")]
    InvalidPath(String),
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
    #[error("sandbox teardown failed: {0}")]
    Teardown(String),
}
