//! Sandbox runtime: the shared lifecycle manager and a local-directory provider.

mod local;
mod manager;

pub use local::{LocalSandbox, LocalSandboxProvider};
pub use manager::{SandboxHandle, SandboxRuntimeManager};
