//! The single shared sandbox runtime.
//!
//! Lifecycle: `Uninitialized -> Booting -> Ready -> TornDown`. A failed boot goes
//! back to `Uninitialized` so the next `acquire` retries. Concurrent acquirers
//! during `Booting` wait on the same boot and observe the same outcome. Only
//! `destroy` leaves `Ready`; dropping consumers never tears the runtime down.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::kernel::services::ports::{
    RuntimeError, RuntimeState, SandboxError, SandboxInstance, SandboxProvider,
};
use crate::models::{NodePath, VirtualFileTree};

/// A booted runtime. Clones share the same instance.
#[derive(Clone)]
pub struct SandboxHandle {
    instance: Arc<dyn SandboxInstance>,
    generation: u64,
}

impl SandboxHandle {
    pub fn instance(&self) -> &Arc<dyn SandboxInstance> {
        &self.instance
    }

    /// Boot counter value that produced this instance.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn same_instance(&self, other: &SandboxHandle) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl std::fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

type BootOutcome = Option<Result<SandboxHandle, String>>;

enum Slot {
    Uninitialized,
    Booting {
        generation: u64,
        outcome: watch::Receiver<BootOutcome>,
    },
    Ready(SandboxHandle),
    TornDown,
}

struct Inner {
    slot: Slot,
    generation: u64,
    boot_attempts: u64,
}

enum AcquirePlan {
    Ready(SandboxHandle),
    Wait(watch::Receiver<BootOutcome>),
    Boot {
        generation: u64,
        tx: watch::Sender<BootOutcome>,
    },
}

pub struct SandboxRuntimeManager {
    provider: Arc<dyn SandboxProvider>,
    inner: Mutex<Inner>,
    // serializes writes so same-path writes land in call order
    write_lock: tokio::sync::Mutex<()>,
}

impl SandboxRuntimeManager {
    pub fn new(provider: Arc<dyn SandboxProvider>) -> Self {
        Self {
            provider,
            inner: Mutex::new(Inner {
                slot: Slot::Uninitialized,
                generation: 0,
                boot_attempts: 0,
            }),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> RuntimeState {
        match self.lock().slot {
            Slot::Uninitialized => RuntimeState::Uninitialized,
            Slot::Booting { .. } => RuntimeState::Booting,
            Slot::Ready(_) => RuntimeState::Ready,
            Slot::TornDown => RuntimeState::TornDown,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == RuntimeState::Ready
    }

    /// Number of boots started so far.
    pub fn boot_attempts(&self) -> u64 {
        self.lock().boot_attempts
    }

    pub fn current(&self) -> Option<SandboxHandle> {
        match &self.lock().slot {
            Slot::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Returns the shared runtime, booting it if needed.
    pub async fn acquire(&self) -> Result<SandboxHandle, RuntimeError> {
        let plan = {
            let mut inner = self.lock();
            match &inner.slot {
                Slot::Ready(handle) => AcquirePlan::Ready(handle.clone()),
                Slot::Booting { outcome, .. } => AcquirePlan::Wait(outcome.clone()),
                Slot::Uninitialized | Slot::TornDown => {
                    inner.generation = inner.generation.saturating_add(1);
                    inner.boot_attempts = inner.boot_attempts.saturating_add(1);
                    let generation = inner.generation;
                    let (tx, rx) = watch::channel(None);
                    inner.slot = Slot::Booting {
                        generation,
                        outcome: rx,
                    };
                    AcquirePlan::Boot { generation, tx }
                }
            }
        };

        match plan {
            AcquirePlan::Ready(handle) => Ok(handle),
            AcquirePlan::Wait(rx) => wait_for_boot(rx).await,
            AcquirePlan::Boot { generation, tx } => self.boot(generation, tx).await,
        }
    }

    async fn boot(
        &self,
        generation: u64,
        tx: watch::Sender<BootOutcome>,
    ) -> Result<SandboxHandle, RuntimeError> {
        tracing::info!(generation, "booting sandbox runtime");
        let mut guard = BootGuard {
            manager: self,
            generation,
            armed: true,
        };
        let result = self.provider.boot().await;
        guard.armed = false;

        let (outcome, orphan) = {
            let mut inner = self.lock();
            let current = matches!(
                inner.slot,
                Slot::Booting { generation: g, .. } if g == generation
            );
            match result {
                Ok(instance) if current => {
                    let handle = SandboxHandle {
                        instance,
                        generation,
                    };
                    inner.slot = Slot::Ready(handle.clone());
                    (Ok(handle), None)
                }
                Ok(instance) => (
                    Err("runtime destroyed while booting".to_string()),
                    Some(instance),
                ),
                Err(err) => {
                    if current {
                        inner.slot = Slot::Uninitialized;
                    }
                    (Err(err.to_string()), None)
                }
            }
        };

        match &outcome {
            Ok(_) => tracing::info!(generation, "sandbox runtime ready"),
            Err(message) => tracing::warn!(generation, error = %message, "sandbox boot failed"),
        }
        if let Some(instance) = orphan {
            if let Err(err) = instance.teardown().await {
                tracing::warn!(generation, error = %err, "failed to tear down orphaned sandbox");
            }
        }

        tx.send_replace(Some(outcome.clone()));
        outcome.map_err(RuntimeError::Unavailable)
    }

    /// Writes `content` at `path`, creating parent directories first.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), RuntimeError> {
        let handle = self.current().ok_or(RuntimeError::NotReady)?;
        let path = sandbox_path(path)?;
        let _write = self.write_lock.lock().await;

        let parent = path.parent().filter(|p| !p.is_empty());
        if let Some(parent) = parent {
            let dir = parent.to_string();
            handle
                .instance
                .mkdir(&dir, true)
                .await
                .map_err(|e| write_error(&dir, e))?;
        }
        let file = path.to_string();
        handle
            .instance
            .write_file(&file, content)
            .await
            .map_err(|e| write_error(&file, e))?;
        tracing::debug!(path = %file, bytes = content.len(), "mirrored file into sandbox");
        Ok(())
    }

    /// Writes every file of `tree` into the runtime. Returns how many were written.
    pub async fn mirror_tree(&self, tree: &VirtualFileTree) -> Result<usize, RuntimeError> {
        let files = tree.files();
        for (path, file) in &files {
            self.write_file(&path.to_string(), &file.content).await?;
        }
        tracing::info!(files = files.len(), "mirrored project tree into sandbox");
        Ok(files.len())
    }

    /// Tears the runtime down. No-op when nothing was booted. A boot still in
    /// flight is abandoned and its instance is torn down once it arrives.
    pub async fn destroy(&self) -> Result<(), RuntimeError> {
        let handle = {
            let mut inner = self.lock();
            match std::mem::replace(&mut inner.slot, Slot::Uninitialized) {
                Slot::Ready(handle) => {
                    inner.slot = Slot::TornDown;
                    Some(handle)
                }
                Slot::Booting { generation, .. } => {
                    tracing::info!(generation, "abandoning in-flight sandbox boot");
                    None
                }
                Slot::Uninitialized => None,
                Slot::TornDown => {
                    inner.slot = Slot::TornDown;
                    None
                }
            }
        };

        let Some(handle) = handle else {
            return Ok(());
        };
        let _write = self.write_lock.lock().await;
        tracing::info!(generation = handle.generation, "tearing down sandbox runtime");
        handle
            .instance
            .teardown()
            .await
            .map_err(|e| RuntimeError::Teardown(e.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // state stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resets a boot whose future was dropped before it finished.
struct BootGuard<'a> {
    manager: &'a SandboxRuntimeManager,
    generation: u64,
    armed: bool,
}

impl Drop for BootGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.manager.lock();
        if matches!(inner.slot, Slot::Booting { generation: g, .. } if g == self.generation) {
            inner.slot = Slot::Uninitialized;
            tracing::warn!(generation = self.generation, "sandbox boot abandoned");
        }
    }
}

async fn wait_for_boot(
    mut rx: watch::Receiver<BootOutcome>,
) -> Result<SandboxHandle, RuntimeError> {
    let outcome = match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone(),
        Err(_) => None,
    };
    match outcome {
        Some(Ok(handle)) => Ok(handle),
        Some(Err(message)) => Err(RuntimeError::Unavailable(message)),
        None => Err(RuntimeError::Unavailable("sandbox boot abandoned".to_string())),
    }
}

fn sandbox_path(path: &str) -> Result<NodePath, RuntimeError> {
    let parsed = NodePath::parse(path);
    if parsed.is_empty() || parsed.segments().iter().any(|s| s == "." || s == "..") {
        return Err(RuntimeError::InvalidPath(path.to_string()));
    }
    Ok(parsed)
}

fn write_error(path: &str, err: SandboxError) -> RuntimeError {
    RuntimeError::Write {
        path: path.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/sandbox/manager.rs"]
mod tests;
