//! Outcome types for [`Db::transactional`](crate::Db::transactional).
//!
//! The caller's own error type travels through untouched in [`TxError::Work`];
//! database failures around the transaction boundary are reported separately.

use std::fmt;

/// Database-level failure at the transaction boundary (begin, commit, rollback).
#[derive(Debug, Clone)]
pub struct InfraError {
    message: String,
}

impl InfraError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InfraError {}

impl From<sea_orm::DbErr> for InfraError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::new(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum TxError<E> {
    /// `work` failed; the transaction was rolled back.
    Work(E),
    /// `transactional` was entered while the same database already had a
    /// transaction open in this task. `work` did not run.
    Nested,
    /// Begin or commit failed.
    Infra(InfraError),
    /// `work` failed and the rollback failed too. Nothing can be assumed
    /// about the state of the rows `work` touched.
    RollbackFailed { error: E, rollback: InfraError },
}

impl<E> TxError<E> {
    /// Fold into the caller's error type.
    ///
    /// `Work` and `RollbackFailed` yield the original work error; `Nested` and
    /// `Infra` go through `map_infra`.
    pub fn into_work<F>(self, map_infra: F) -> E
    where
        F: FnOnce(InfraError) -> E,
    {
        match self {
            TxError::Work(e) | TxError::RollbackFailed { error: e, .. } => e,
            TxError::Nested => map_infra(InfraError::new("nested transactions are not supported")),
            TxError::Infra(infra) => map_infra(infra),
        }
    }

    #[must_use]
    pub fn work(&self) -> Option<&E> {
        match self {
            TxError::Work(e) | TxError::RollbackFailed { error: e, .. } => Some(e),
            TxError::Nested | TxError::Infra(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TxError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::Work(e) => write!(f, "{e}"),
            TxError::Nested => f.write_str("nested transactions are not supported"),
            TxError::Infra(e) => write!(f, "infrastructure error: {e}"),
            TxError::RollbackFailed { error, rollback } => {
                write!(f, "{error} (rollback failed: {rollback})")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TxError<E> {}
