use std::future::Future;
use std::sync::Arc;

use repokit_criteria::{
    DistinctFields, Fields, Filter, Flattener, Identity, Mapping, MappingFlattener, Page, Pageable,
    Sort, validate,
};

use super::hydrate::Hydrated;
use super::page::SqlPageRepository;
use super::read::SqlReadRepository;
use super::write::SqlWriteRepository;
use super::{PageRepository, ReadRepository, WriteRepository};
use crate::db::Db;
use crate::error::RepoError;
use crate::tx_error::TxError;

/// Read, write and page operations for one entity type over one database.
///
/// Every call runs on [`Db::runner`], so calls made inside
/// [`SqlRepository::transactional`] (or any [`Db::transactional`] on the same
/// database) join the open transaction.
pub struct SqlRepository<M: Mapping, F = MappingFlattener> {
    db: Db,
    mapping: Arc<M>,
    reader: Hydrated<SqlReadRepository<M>, M>,
    writer: Hydrated<SqlWriteRepository<M, F>, M>,
    pager: Hydrated<SqlPageRepository<M>, M>,
}

impl<M: Mapping> SqlRepository<M> {
    /// # Errors
    /// Returns [`RepoError::Criteria`] when the mapping does not map its identity column.
    pub fn new(db: Db, mapping: M) -> Result<Self, RepoError> {
        Self::with_flattener(db, mapping, MappingFlattener)
    }
}

impl<M: Mapping, F: Flattener<M>> SqlRepository<M, F> {
    /// Build with an explicit flattener for the write path.
    ///
    /// # Errors
    /// Returns [`RepoError::Criteria`] when the mapping does not map its identity column.
    pub fn with_flattener(db: Db, mapping: M, flattener: F) -> Result<Self, RepoError> {
        validate(&mapping)?;
        let mapping = Arc::new(mapping);
        Ok(Self {
            reader: Hydrated::new(
                SqlReadRepository::new(Arc::clone(&mapping)),
                Arc::clone(&mapping),
            ),
            writer: Hydrated::new(
                SqlWriteRepository::with_flattener(Arc::clone(&mapping), flattener),
                Arc::clone(&mapping),
            ),
            pager: Hydrated::new(
                SqlPageRepository::new(Arc::clone(&mapping)),
                Arc::clone(&mapping),
            ),
            db,
            mapping,
        })
    }

    #[must_use]
    pub fn db(&self) -> &Db {
        &self.db
    }

    #[must_use]
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// # Errors
    /// Returns [`RepoError::Criteria`] for an unmapped projected property and
    /// [`RepoError::Db`] when the query fails.
    pub async fn find(
        &self,
        id: &dyn Identity,
        fields: Option<&Fields>,
    ) -> Result<Option<M::Entity>, RepoError> {
        let runner = self.db.runner();
        self.reader.find(&runner, id, fields).await
    }

    /// # Errors
    /// Returns [`RepoError::Db`] when the query fails.
    pub async fn exists(&self, id: &dyn Identity) -> Result<bool, RepoError> {
        let runner = self.db.runner();
        self.reader.exists(&runner, id).await
    }

    /// # Errors
    /// Returns [`RepoError::Criteria`] when the criteria reference an unmapped
    /// property and [`RepoError::Db`] when the query fails.
    pub async fn find_by(
        &self,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
        fields: Option<&Fields>,
    ) -> Result<Vec<M::Entity>, RepoError> {
        let runner = self.db.runner();
        self.reader.find_by(&runner, filter, sort, fields).await
    }

    /// # Errors
    /// Same as [`SqlRepository::find_by`].
    pub async fn find_by_distinct(
        &self,
        distinct: &DistinctFields,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
    ) -> Result<Vec<M::Entity>, RepoError> {
        let runner = self.db.runner();
        self.reader
            .find_by_distinct(&runner, distinct, filter, sort)
            .await
    }

    /// # Errors
    /// Same as [`SqlRepository::find_by`].
    pub async fn count(&self, filter: Option<&Filter>) -> Result<u64, RepoError> {
        let runner = self.db.runner();
        self.reader.count(&runner, filter).await
    }

    /// Update `entity`, inserting it when nothing is stored under its identity.
    ///
    /// # Errors
    /// Returns [`RepoError::Criteria`] when the entity cannot be flattened,
    /// [`RepoError::NotFoundAfterWrite`] or [`RepoError::Hydration`] when the
    /// written row cannot be read back, and [`RepoError::Db`] when a statement fails.
    pub async fn add(&self, entity: &M::Entity) -> Result<M::Entity, RepoError> {
        let runner = self.db.runner();
        self.writer.add(&runner, entity).await
    }

    /// # Errors
    /// Returns [`RepoError::NotAnIdentity`] before any write when an entity has
    /// no identity and the mapping does not generate one; otherwise as
    /// [`SqlRepository::add`]. Wrap the call in [`SqlRepository::transactional`]
    /// to make the batch atomic.
    pub async fn add_all(&self, entities: &[M::Entity]) -> Result<Vec<M::Entity>, RepoError> {
        let runner = self.db.runner();
        self.writer.add_all(&runner, entities).await
    }

    /// # Errors
    /// Returns [`RepoError::Db`] when the statement fails.
    pub async fn remove(&self, id: &dyn Identity) -> Result<u64, RepoError> {
        let runner = self.db.runner();
        self.writer.remove(&runner, id).await
    }

    /// Delete matching rows, or every row when `filter` is `None`.
    ///
    /// # Errors
    /// Same as [`SqlRepository::find_by`].
    pub async fn remove_all(&self, filter: Option<&Filter>) -> Result<u64, RepoError> {
        let runner = self.db.runner();
        self.writer.remove_all(&runner, filter).await
    }

    /// # Errors
    /// Same as [`SqlRepository::find_by`].
    pub async fn find_all(&self, pageable: Option<&Pageable>) -> Result<Page<M::Entity>, RepoError> {
        let runner = self.db.runner();
        self.pager.find_all(&runner, pageable).await
    }

    /// Run `work` in one transaction on this repository's database.
    ///
    /// # Errors
    /// See [`Db::transactional`].
    pub async fn transactional<W, Fut, T, E>(&self, work: W) -> Result<T, TxError<E>>
    where
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.db.transactional(work).await
    }
}
