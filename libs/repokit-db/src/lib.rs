#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! SQL repositories driven by declarative criteria.
//!
//! This crate compiles [`repokit_criteria`] filters, sorts and projections into
//! `sea-query` statements and runs them through a uniform repository surface:
//! find/exists/count, upserting writes, pagination and transactions.
//!
//! # Features
//! - `sqlite` (default), `pg`, `mysql`: enable the matching `SQLx` backend
//!
//! # Example
//! ```rust,ignore
//! use repokit_db::{Db, RepositoryConfig, SqlRepository};
//! use repokit_criteria::{Filter, Pageable, Sort};
//!
//! let config = RepositoryConfig::load(Some("repokit.yaml".as_ref()))?;
//! let db = Db::connect(&config).await?;
//! let customers = SqlRepository::new(db, CustomerMapping::default())?;
//!
//! let mut filter = Filter::new();
//! filter.must().range("totalOrders", 3, 4);
//! let page = customers
//!     .find_all(Some(&Pageable::new(1, 20)?.with_filter(filter).with_sort(Sort::new().desc("name"))))
//!     .await?;
//! ```

#![cfg_attr(
    not(any(feature = "pg", feature = "mysql", feature = "sqlite")),
    allow(
        unused_imports,
        unused_variables,
        dead_code,
        unreachable_code,
        unused_lifetimes,
        clippy::unused_async,
    )
)]

pub mod config;
pub mod db;
pub mod error;
pub mod repo;
pub mod translate;
pub mod tx_error;

mod pool_opts;
mod runner;

pub use config::{PoolConfig, RepositoryConfig};
pub use db::{Db, DbConn, TaskRunner};
pub use error::RepoError;
pub use repo::{
    Hydrated, PageRepository, ReadRepository, SqlPageRepository, SqlReadRepository,
    SqlRepository, SqlWriteRepository, UpdateOutcome, WriteRepository,
};
pub use runner::DbRunner;
pub use translate::{Binding, QueryCompiler};
pub use tx_error::{InfraError, TxError};

use std::time::Duration;

#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
use pool_opts::ApplyPoolOpts;

#[cfg(feature = "mysql")]
use sea_orm::sqlx::{MySqlPool, mysql::MySqlPoolOptions};
#[cfg(feature = "pg")]
use sea_orm::sqlx::{PgPool, postgres::PgPoolOptions};
#[cfg(feature = "sqlite")]
use sea_orm::sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend};
#[cfg(feature = "mysql")]
use sea_orm::SqlxMySqlConnector;
#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Non-transactional connection requested inside an active transaction")]
    ConnRequestedInsideTx,

    #[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
    #[error(transparent)]
    Sqlx(#[from] sea_orm::sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Config(Box<figment::Error>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<figment::Error> for DbError {
    fn from(e: figment::Error) -> Self {
        DbError::Config(Box::new(e))
    }
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Connection options.
/// Each driver applies the subset of pool knobs it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Connected pool plus its `SeaORM` bridge.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the DSN scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        // Be forgiving with env files.
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }

    /// Connect and build handle.
    ///
    /// `SQLite` database files are created when missing.
    ///
    /// # Errors
    /// Returns an error if the connection fails or the DSN is invalid.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        let dsn = dsn.trim_start();
        tracing::debug!(?engine, "connecting database pool");
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let pool = PgPoolOptions::new().apply(&opts).connect(dsn).await?;
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_owned(),
                    sea,
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(feature = "mysql")]
            DbEngine::MySql => {
                let pool = MySqlPoolOptions::new().apply(&opts).connect(dsn).await?;
                let sea = SqlxMySqlConnector::from_sqlx_mysql_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::MySql(pool),
                    dsn: dsn.to_owned(),
                    sea,
                })
            }
            #[cfg(not(feature = "mysql"))]
            DbEngine::MySql => Err(DbError::FeatureDisabled("MySQL feature not enabled")),
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let options: SqliteConnectOptions = dsn.parse()?;
                let pool = SqlitePoolOptions::new()
                    .apply(&opts)
                    .connect_with(options.create_if_missing(true))
                    .await?;
                let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Sqlite(pool),
                    dsn: dsn.to_owned(),
                    sea,
                })
            }
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    /// Graceful pool close. (Dropping the pool also closes it; this just makes it explicit.)
    pub async fn close(self) {
        match self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN used for this connection.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// SQL dialect statements are rendered in.
    #[must_use]
    pub fn backend(&self) -> DbBackend {
        self.sea.get_database_backend()
    }

    #[cfg(feature = "pg")]
    #[must_use]
    pub fn sqlx_postgres(&self) -> Option<&PgPool> {
        match self.pool {
            DbPool::Postgres(ref p) => Some(p),
            #[cfg(any(feature = "mysql", feature = "sqlite"))]
            _ => None,
        }
    }

    #[cfg(feature = "mysql")]
    #[must_use]
    pub fn sqlx_mysql(&self) -> Option<&MySqlPool> {
        match self.pool {
            DbPool::MySql(ref p) => Some(p),
            #[cfg(any(feature = "pg", feature = "sqlite"))]
            _ => None,
        }
    }

    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(any(feature = "pg", feature = "mysql"))]
            _ => None,
        }
    }

    pub(crate) fn sea_ref(&self) -> &DatabaseConnection {
        &self.sea
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_engines_by_scheme() {
        assert_eq!(DbHandle::detect("sqlite::memory:").ok(), Some(DbEngine::Sqlite));
        assert_eq!(
            DbHandle::detect("  postgresql://u@h/db").ok(),
            Some(DbEngine::Postgres)
        );
        assert_eq!(DbHandle::detect("mysql://u@h/db").ok(), Some(DbEngine::MySql));
        assert!(matches!(
            DbHandle::detect("redis://localhost"),
            Err(DbError::UnknownDsn(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_connection() -> Result<()> {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
        assert_eq!(db.engine(), DbEngine::Sqlite);
        assert_eq!(db.backend(), DbBackend::Sqlite);
        assert_eq!(db.dsn(), "sqlite::memory:");
        db.close().await;
        Ok(())
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_file_is_created() -> Result<()> {
        let dir = tempfile::tempdir().map_err(anyhow::Error::from)?;
        let path = dir.path().join("repokit.db");
        let dsn = format!("sqlite://{}", path.display());

        let db = DbHandle::connect(&dsn, ConnectOpts::default()).await?;
        assert!(path.exists());
        db.close().await;
        Ok(())
    }
}
