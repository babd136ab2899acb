//! Post-commit hooks
//!
//! Work that must only happen once the enclosing transaction is durably
//! committed (for example asking the provider to fetch a file whose record
//! has to be visible first) is queued on [`CommitHooks`] and run after the
//! commit. Failures are logged and swallowed: the commit already happened and
//! the caller has nothing left to roll back.

use std::future::Future;

use futures::future::BoxFuture;

use crate::error::{ErrorMetadata, LogLevel, TranscodeResult};

struct PendingHook {
    name: String,
    task: BoxFuture<'static, TranscodeResult<()>>,
}

/// Callbacks queued to run after a successful commit.
#[derive(Default)]
pub struct CommitHooks {
    pending: Vec<PendingHook>,
}

impl CommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run after the commit. Futures are lazy, so nothing
    /// runs until [`CommitHooks::run`].
    pub fn after_commit<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = TranscodeResult<()>> + Send + 'static,
    {
        self.pending.push(PendingHook {
            name: name.into(),
            task: Box::pin(task),
        });
    }

    /// Append hooks collected elsewhere, keeping their order.
    pub fn extend(&mut self, other: CommitHooks) {
        self.pending.extend(other.pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run all hooks in registration order. Returns the number that failed.
    pub async fn run(self) -> usize {
        let mut failures = 0;
        for hook in self.pending {
            match hook.task.await {
                Ok(()) => {
                    tracing::debug!(hook = %hook.name, "Post-commit hook completed");
                }
                Err(e) => {
                    failures += 1;
                    match e.log_level() {
                        LogLevel::Error => tracing::error!(
                            hook = %hook.name,
                            error = %e,
                            error_code = e.error_code(),
                            "Post-commit hook failed"
                        ),
                        LogLevel::Warn => tracing::warn!(
                            hook = %hook.name,
                            error = %e,
                            error_code = e.error_code(),
                            "Post-commit hook failed"
                        ),
                        LogLevel::Debug => tracing::debug!(
                            hook = %hook.name,
                            error = %e,
                            error_code = e.error_code(),
                            "Post-commit hook failed"
                        ),
                    }
                }
            }
        }
        failures
    }

    /// Drop queued hooks without running them (the transaction rolled back).
    pub fn discard(self) {
        if !self.pending.is_empty() {
            tracing::debug!(
                count = self.pending.len(),
                "Discarding post-commit hooks after rollback"
            );
        }
    }
}
