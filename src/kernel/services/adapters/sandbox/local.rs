//! Directory-backed sandbox: each booted instance owns a fresh directory.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::kernel::services::ports::{BoxFuture, SandboxError, SandboxInstance, SandboxProvider};

pub struct LocalSandboxProvider {
    base_dir: PathBuf,
    next_instance: AtomicU64,
}

impl LocalSandboxProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            next_instance: AtomicU64::new(1),
        }
    }
}

impl SandboxProvider for LocalSandboxProvider {
    fn boot(&self) -> BoxFuture<'_, Result<Arc<dyn SandboxInstance>, SandboxError>> {
        Box::pin(async move {
            let n = self.next_instance.fetch_add(1, Ordering::Relaxed);
            let root = self
                .base_dir
                .join(format!("instance-{}-{n}", std::process::id()));
            tokio::fs::create_dir_all(&root).await?;
            tracing::debug!(root = %root.display(), "local sandbox booted");
            Ok(Arc::new(LocalSandbox { root }) as Arc<dyn SandboxInstance>)
        })
    }
}

pub struct LocalSandbox {
    root: PathBuf,
}

impl LocalSandbox {
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(SandboxError::new(format!("path escapes sandbox: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

impl SandboxInstance for LocalSandbox {
    fn mkdir<'a>(
        &'a self,
        path: &'a str,
        recursive: bool,
    ) -> BoxFuture<'a, Result<(), SandboxError>> {
        Box::pin(async move {
            let dir = self.resolve(path)?;
            if recursive {
                tokio::fs::create_dir_all(&dir).await?;
            } else {
                tokio::fs::create_dir(&dir).await?;
            }
            Ok(())
        })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), SandboxError>> {
        Box::pin(async move {
            let file = self.resolve(path)?;
            tokio::fs::write(&file, content).await?;
            Ok(())
        })
    }

    fn teardown(&self) -> BoxFuture<'_, Result<(), SandboxError>> {
        Box::pin(async move {
            match tokio::fs::remove_dir_all(&self.root).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/sandbox/local.rs"]
mod tests;
