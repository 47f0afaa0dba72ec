//! Sealed database runner capability.
//!
//! Repositories execute against a [`DbRunner`], which is either a plain pool
//! connection or the transaction active in the current task. The trait is
//! sealed so no caller can hand a repository an executor that sidesteps an
//! open transaction.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, ExecResult,
    QueryResult, Statement,
};

mod sealed {
    pub trait Sealed {}
}

/// Crate-only bridge to `SeaORM`'s executor types.
#[doc(hidden)]
pub enum SeaOrmRunner<'a> {
    Conn(&'a DatabaseConnection),
    Tx(&'a DatabaseTransaction),
}

#[doc(hidden)]
pub trait DbRunnerInternal: sealed::Sealed + Send + Sync {
    fn as_seaorm(&self) -> SeaOrmRunner<'_>;
}

/// Executor handed to repositories. Obtained from [`Db::conn`](crate::Db::conn)
/// or [`Db::runner`](crate::Db::runner); cannot be implemented outside this crate.
pub trait DbRunner: DbRunnerInternal {}

impl<T: DbRunnerInternal> DbRunner for T {}

impl SeaOrmRunner<'_> {
    pub fn backend(&self) -> DbBackend {
        match self {
            SeaOrmRunner::Conn(c) => c.get_database_backend(),
            SeaOrmRunner::Tx(t) => t.get_database_backend(),
        }
    }

    pub fn supports_returning(&self) -> bool {
        match self {
            SeaOrmRunner::Conn(c) => c.support_returning(),
            SeaOrmRunner::Tx(t) => t.support_returning(),
        }
    }

    pub async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        match self {
            SeaOrmRunner::Conn(c) => c.query_all(stmt).await,
            SeaOrmRunner::Tx(t) => t.query_all(stmt).await,
        }
    }

    pub async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        match self {
            SeaOrmRunner::Conn(c) => c.query_one(stmt).await,
            SeaOrmRunner::Tx(t) => t.query_one(stmt).await,
        }
    }

    pub async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        match self {
            SeaOrmRunner::Conn(c) => c.execute(stmt).await,
            SeaOrmRunner::Tx(t) => t.execute(stmt).await,
        }
    }
}

pub use sealed::Sealed;
