//! Repository configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! then `REPOKIT_*` environment variables (`__` separates nested keys, e.g.
//! `REPOKIT_POOL__MAX_CONNS=4`).
//!
//! ```yaml
//! dsn: "sqlite://./data/app.db"
//! pool:
//!   max_conns: 4
//!   acquire_timeout: 5s
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{ConnectOpts, DbError};

pub const ENV_PREFIX: &str = "REPOKIT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Connection string; the scheme selects the engine.
    pub dsn: String,
    pub pool: PoolConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite::memory:".to_owned(),
            pool: PoolConfig::default(),
        }
    }
}

/// Pool knobs, mirrored into [`ConnectOpts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_conns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_conns: Option<u32>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub acquire_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let opts = ConnectOpts::default();
        Self {
            max_conns: opts.max_conns,
            min_conns: opts.min_conns,
            acquire_timeout: opts.acquire_timeout,
            idle_timeout: opts.idle_timeout,
            max_lifetime: opts.max_lifetime,
            test_before_acquire: opts.test_before_acquire,
        }
    }
}

impl From<&PoolConfig> for ConnectOpts {
    fn from(cfg: &PoolConfig) -> Self {
        Self {
            max_conns: cfg.max_conns,
            min_conns: cfg.min_conns,
            acquire_timeout: cfg.acquire_timeout,
            idle_timeout: cfg.idle_timeout,
            max_lifetime: cfg.max_lifetime,
            test_before_acquire: cfg.test_before_acquire,
        }
    }
}

impl RepositoryConfig {
    /// The layered provider stack, ready for extra `merge`s.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Yaml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    /// Returns `DbError::Config` when a layer fails to parse or a key is unknown,
    /// and `DbError::InvalidConfig` when the DSN is blank.
    pub fn from_figment(figment: &Figment) -> Result<Self, DbError> {
        let config: Self = figment.extract()?;
        if config.dsn.trim().is_empty() {
            return Err(DbError::InvalidConfig("dsn must not be empty".to_owned()));
        }
        Ok(config)
    }

    /// Load defaults, then `file` (when given), then the environment.
    ///
    /// # Errors
    /// See [`RepositoryConfig::from_figment`].
    pub fn load(file: Option<&Path>) -> Result<Self, DbError> {
        Self::from_figment(&Self::figment(file))
    }

    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        ConnectOpts::from(&self.pool)
    }
}
