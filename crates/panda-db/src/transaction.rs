//! Database transaction utilities
//!
//! [`TransactionGuard`] wraps a Postgres transaction and owns the
//! [`CommitHooks`] registered while it is open, so work that must only
//! happen once the data is visible (submitting a file for transcoding) runs
//! after a successful commit and is dropped on rollback.

use anyhow::{Context, Result};
use panda_core::CommitHooks;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
    hooks: CommitHooks,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool) -> Result<Self> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
            hooks: CommitHooks::new(),
        })
    }

    /// Connection of the open transaction.
    pub fn connection(&mut self) -> Result<&mut PgConnection> {
        self.transaction
            .as_mut()
            .map(|tx| &mut **tx)
            .context("Transaction was already committed or rolled back")
    }

    /// Hooks run after a successful commit.
    pub fn hooks_mut(&mut self) -> &mut CommitHooks {
        &mut self.hooks
    }

    /// Commit, then run the registered hooks. Returns the number of hooks
    /// that failed; hook failures are logged, not returned.
    pub async fn commit(mut self) -> Result<usize> {
        let hooks = std::mem::take(&mut self.hooks);
        if let Some(tx) = self.transaction.take() {
            if let Err(e) = tx.commit().await {
                hooks.discard();
                return Err(e).context("Failed to commit database transaction");
            }
        }
        Ok(hooks.run().await)
    }

    /// Commit with additional hooks collected outside the guard.
    pub async fn commit_with_hooks(mut self, hooks: CommitHooks) -> Result<usize> {
        self.hooks.extend(hooks);
        self.commit().await
    }

    /// Rollback the transaction and drop the registered hooks.
    pub async fn rollback(mut self) -> Result<()> {
        std::mem::take(&mut self.hooks).discard();
        if let Some(tx) = self.transaction.take() {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
        }
        Ok(())
    }
}

impl<'a> Drop for TransactionGuard<'a> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                pending_hooks = self.hooks.len(),
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
