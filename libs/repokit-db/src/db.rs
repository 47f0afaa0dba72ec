//! Database handle, runners and the transaction boundary.
//!
//! - [`Db`]: cheap-to-clone handle over one pool.
//! - [`DbConn`]: non-transactional runner borrowed from a `Db`.
//! - [`TaskRunner`]: whatever the current task should run on: the open
//!   transaction when inside [`Db::transactional`], the pool otherwise.
//!
//! The open transaction is published through a task-local for the duration of
//! the `work` future, so repository calls inside it pick the transaction up
//! without having it threaded through every signature.
//!
//! ```ignore
//! let outcome = db
//!     .transactional(|| async {
//!         customers.add(&first).await?;
//!         customers.remove(&2_i64).await?;
//!         Ok::<_, RepoError>(())
//!     })
//!     .await;
//! ```

use std::{future::Future, sync::Arc};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::config::RepositoryConfig;
use crate::runner::{DbRunnerInternal, SeaOrmRunner, Sealed};
use crate::tx_error::{InfraError, TxError};
use crate::{ConnectOpts, DbError, DbHandle};

#[derive(Clone)]
struct ActiveTx {
    owner: Arc<DbHandle>,
    tx: Arc<DatabaseTransaction>,
}

tokio::task_local! {
    static ACTIVE_TX: ActiveTx;
}

fn active_tx() -> Option<ActiveTx> {
    ACTIVE_TX.try_with(Clone::clone).ok()
}

#[derive(Clone)]
pub struct Db {
    handle: Arc<DbHandle>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("engine", &self.handle.engine())
            .finish_non_exhaustive()
    }
}

impl Db {
    #[must_use]
    pub fn new(handle: DbHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Connect with a DSN and pool options.
    ///
    /// # Errors
    /// Returns an error if the DSN is unknown or the pool cannot connect.
    pub async fn open(dsn: &str, opts: ConnectOpts) -> Result<Self, DbError> {
        Ok(Self::new(DbHandle::connect(dsn, opts).await?))
    }

    /// Connect using a loaded [`RepositoryConfig`].
    ///
    /// # Errors
    /// Returns an error if the DSN is unknown or the pool cannot connect.
    pub async fn connect(config: &RepositoryConfig) -> Result<Self, DbError> {
        Self::open(&config.dsn, config.connect_opts()).await
    }

    #[must_use]
    pub fn handle(&self) -> &DbHandle {
        &self.handle
    }

    /// Whether this database has a transaction open in the current task.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        active_tx().is_some_and(|active| Arc::ptr_eq(&active.owner, &self.handle))
    }

    /// Non-transactional runner.
    ///
    /// # Errors
    /// Returns `DbError::ConnRequestedInsideTx` when this database has a
    /// transaction open in the current task; writes through a plain
    /// connection would escape it.
    pub fn conn(&self) -> Result<DbConn<'_>, DbError> {
        if self.in_transaction() {
            return Err(DbError::ConnRequestedInsideTx);
        }
        Ok(DbConn {
            conn: self.handle.sea_ref(),
        })
    }

    /// The runner the current task should use for this database.
    #[must_use]
    pub fn runner(&self) -> TaskRunner {
        match active_tx() {
            Some(active) if Arc::ptr_eq(&active.owner, &self.handle) => {
                TaskRunner(RunnerKind::Tx(active.tx))
            }
            _ => TaskRunner(RunnerKind::Conn(self.handle.sea_ref().clone())),
        }
    }

    /// Run `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`; rolls back and returns
    /// [`TxError::Work`] when it returns `Err`. Every [`Db::runner`] taken
    /// inside `work` for this database resolves to the transaction.
    ///
    /// # Errors
    /// - [`TxError::Nested`] if this database already has a transaction open
    ///   in the current task (`work` is not run)
    /// - [`TxError::Infra`] if begin or commit fails
    /// - [`TxError::Work`] with the error returned by `work`
    /// - [`TxError::RollbackFailed`] if `work` failed and the rollback failed as well
    pub async fn transactional<F, Fut, T, E>(&self, work: F) -> Result<T, TxError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.in_transaction() {
            return Err(TxError::Nested);
        }

        let txn = Arc::new(
            self.handle
                .sea_ref()
                .begin()
                .await
                .map_err(|e| TxError::Infra(e.into()))?,
        );
        tracing::debug!("transaction started");

        let active = ActiveTx {
            owner: Arc::clone(&self.handle),
            tx: Arc::clone(&txn),
        };
        let res = ACTIVE_TX.scope(active, work()).await;

        // A runner kept alive past `work` pins the transaction; dropping the
        // last reference rolls it back.
        let txn = Arc::try_unwrap(txn).map_err(|_| {
            TxError::Infra(InfraError::new(
                "transaction runner outlived the transactional block",
            ))
        })?;

        match res {
            Ok(value) => {
                txn.commit().await.map_err(|e| TxError::Infra(e.into()))?;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(error) => match txn.rollback().await {
                Ok(()) => {
                    tracing::debug!("transaction rolled back");
                    Err(TxError::Work(error))
                }
                Err(rollback) => {
                    tracing::error!(error = %rollback, "transaction rollback failed");
                    Err(TxError::RollbackFailed {
                        error,
                        rollback: rollback.into(),
                    })
                }
            },
        }
    }
}

/// Borrowed, non-transactional runner.
pub struct DbConn<'a> {
    conn: &'a DatabaseConnection,
}

impl std::fmt::Debug for DbConn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConn").finish_non_exhaustive()
    }
}

impl Sealed for DbConn<'_> {}

impl DbRunnerInternal for DbConn<'_> {
    fn as_seaorm(&self) -> SeaOrmRunner<'_> {
        SeaOrmRunner::Conn(self.conn)
    }
}

/// Owned runner resolved by [`Db::runner`].
#[derive(Clone)]
pub struct TaskRunner(RunnerKind);

#[derive(Clone)]
enum RunnerKind {
    Conn(DatabaseConnection),
    Tx(Arc<DatabaseTransaction>),
}

impl TaskRunner {
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        matches!(self.0, RunnerKind::Tx(_))
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("transactional", &self.is_transactional())
            .finish_non_exhaustive()
    }
}

impl Sealed for TaskRunner {}

impl DbRunnerInternal for TaskRunner {
    fn as_seaorm(&self) -> SeaOrmRunner<'_> {
        match &self.0 {
            RunnerKind::Conn(c) => SeaOrmRunner::Conn(c),
            RunnerKind::Tx(t) => SeaOrmRunner::Tx(t),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    async fn memory_db() -> anyhow::Result<Db> {
        let opts = ConnectOpts {
            max_conns: Some(1),
            ..Default::default()
        };
        Ok(Db::open("sqlite::memory:", opts).await?)
    }

    #[tokio::test]
    async fn runner_follows_the_open_transaction() -> anyhow::Result<()> {
        let db = memory_db().await?;
        assert!(!db.runner().is_transactional());
        assert!(db.conn().is_ok());

        let seen = db
            .transactional(|| async {
                let inside = db.runner().is_transactional();
                let conn_refused = matches!(db.conn(), Err(DbError::ConnRequestedInsideTx));
                Ok::<_, DbError>((inside, conn_refused))
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        assert_eq!(seen, (true, true));
        assert!(!db.in_transaction());
        Ok(())
    }

    #[tokio::test]
    async fn nested_transaction_fails_fast() -> anyhow::Result<()> {
        let db = memory_db().await?;

        let outcome = db
            .transactional(|| async {
                let inner = db
                    .transactional(|| async { Ok::<_, DbError>("never runs") })
                    .await;
                Ok::<_, DbError>(matches!(inner, Err(TxError::Nested)))
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        assert!(outcome);
        Ok(())
    }

    #[tokio::test]
    async fn work_error_is_returned_after_rollback() -> anyhow::Result<()> {
        let db = memory_db().await?;
        let res: Result<(), TxError<String>> =
            db.transactional(|| async { Err("nope".to_owned()) }).await;
        assert!(matches!(res, Err(TxError::Work(ref e)) if e == "nope"));
        Ok(())
    }

    #[tokio::test]
    async fn transactions_on_other_databases_do_not_leak() -> anyhow::Result<()> {
        let first = memory_db().await?;
        let second = memory_db().await?;

        let leaked = first
            .transactional(|| async {
                Ok::<_, DbError>(second.runner().is_transactional() || second.in_transaction())
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        assert!(!leaked);
        Ok(())
    }
}
