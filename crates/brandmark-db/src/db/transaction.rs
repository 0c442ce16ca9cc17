//! Transaction guard for settings writes.
//!
//! Settings writes lock the row, compare, and update inside one transaction. An
//! early `?` return drops the guard, and sqlx rolls the transaction back when the
//! connection returns to the pool.

use brandmark_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};
use std::time::Instant;

/// A labelled transaction that reports how it ended.
///
/// ```ignore
/// let mut tx = TransactionGuard::begin(pool, "apply_settings_changes").await?;
/// sqlx::query("SELECT 1").execute(&mut **tx).await?;
/// tx.commit().await?;
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
    operation: &'static str,
    started: Instant,
}

impl<'a> TransactionGuard<'a> {
    pub async fn begin(pool: &'a PgPool, operation: &'static str) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to begin transaction");
            AppError::Database(e)
        })?;

        Ok(Self {
            transaction: Some(transaction),
            operation,
            started: Instant::now(),
        })
    }

    pub async fn commit(mut self) -> Result<(), AppError> {
        let Some(tx) = self.transaction.take() else {
            return Ok(());
        };
        let operation = self.operation;
        tx.commit().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to commit transaction");
            AppError::Database(e)
        })?;
        tracing::trace!(
            operation,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "Transaction committed"
        );
        Ok(())
    }
}

impl<'a> Deref for TransactionGuard<'a> {
    type Target = Transaction<'a, Postgres>;

    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        self.transaction
            .as_ref()
            .expect("transaction used after commit")
    }
}

impl<'a> DerefMut for TransactionGuard<'a> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.transaction
            .as_mut()
            .expect("transaction used after commit")
    }
}

impl<'a> Drop for TransactionGuard<'a> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                operation = self.operation,
                "Transaction dropped before commit, rolling back"
            );
        }
    }
}
