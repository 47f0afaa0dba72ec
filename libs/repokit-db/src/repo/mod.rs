//! Repository surface.
//!
//! The raw repositories ([`SqlReadRepository`], [`SqlWriteRepository`],
//! [`SqlPageRepository`]) speak [`Row`](repokit_criteria::Row)s and take the
//! runner explicitly. [`Hydrated`] turns their rows into entities, and
//! [`SqlRepository`] bundles all three behind a [`Db`](crate::Db), picking
//! the runner for each call.

mod base;
mod facade;
mod hydrate;
mod page;
mod read;
mod write;

use async_trait::async_trait;
use repokit_criteria::{DistinctFields, Fields, Filter, Identity, Page, Pageable, Sort};

use crate::error::RepoError;
use crate::runner::DbRunner;

pub use facade::SqlRepository;
pub use hydrate::Hydrated;
pub use page::SqlPageRepository;
pub use read::SqlReadRepository;
pub use write::{SqlWriteRepository, UpdateOutcome};

#[async_trait]
pub trait ReadRepository: Send + Sync {
    type Item: Send;

    /// The item stored under `id`, projected to `fields` when given.
    async fn find(
        &self,
        runner: &dyn DbRunner,
        id: &dyn Identity,
        fields: Option<&Fields>,
    ) -> Result<Option<Self::Item>, RepoError>;

    /// Whether an item is stored under `id`. Agrees with [`ReadRepository::find`].
    async fn exists(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<bool, RepoError>;

    async fn find_by(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
        fields: Option<&Fields>,
    ) -> Result<Vec<Self::Item>, RepoError>;

    /// `SELECT DISTINCT` over the distinct columns (every column when empty).
    async fn find_by_distinct(
        &self,
        runner: &dyn DbRunner,
        distinct: &DistinctFields,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Self::Item>, RepoError>;

    async fn count(&self, runner: &dyn DbRunner, filter: Option<&Filter>)
    -> Result<u64, RepoError>;
}

#[async_trait]
pub trait WriteRepository: Send + Sync {
    type Entity: Send + Sync;
    type Item: Send;

    /// Update the stored entity, or insert it when nothing is stored under its
    /// identity. Returns the entity as read back from storage.
    async fn add(&self, runner: &dyn DbRunner, entity: &Self::Entity)
    -> Result<Self::Item, RepoError>;

    /// [`WriteRepository::add`] for many entities, with one existence query
    /// for the whole batch. Every entity is validated before the first write.
    async fn add_all(
        &self,
        runner: &dyn DbRunner,
        entities: &[Self::Entity],
    ) -> Result<Vec<Self::Item>, RepoError>;

    /// Delete the entity stored under `id`; returns the number of deleted rows.
    async fn remove(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<u64, RepoError>;

    /// Delete every entity matching `filter`, or everything when `filter` is `None`.
    async fn remove_all(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
    ) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PageRepository: Send + Sync {
    type Item: Send;

    /// One page as described by `pageable`, or the whole table as a single
    /// page when `pageable` is `None`.
    async fn find_all(
        &self,
        runner: &dyn DbRunner,
        pageable: Option<&Pageable>,
    ) -> Result<Page<Self::Item>, RepoError>;
}
