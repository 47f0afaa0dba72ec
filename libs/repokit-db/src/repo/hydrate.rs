use std::sync::Arc;

use async_trait::async_trait;
use repokit_criteria::{DistinctFields, Fields, Filter, Identity, Mapping, Page, Pageable, Row, Sort};

use super::{PageRepository, ReadRepository, WriteRepository};
use crate::error::RepoError;
use crate::runner::DbRunner;

/// Turns the rows of a raw repository into entities through [`Mapping::from_row`].
///
/// Projected reads always select the identity as well, so a projection can be
/// rebuilt by mappings that default the other columns. An empty row reads as
/// absent; a non-empty row the mapping rejects is [`RepoError::Hydration`].
pub struct Hydrated<R, M> {
    inner: R,
    mapping: Arc<M>,
}

impl<R, M: Mapping> Hydrated<R, M> {
    #[must_use]
    pub fn new(inner: R, mapping: Arc<M>) -> Self {
        Self { inner, mapping }
    }

    #[must_use]
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn unhydratable(&self) -> RepoError {
        RepoError::Hydration {
            table: self.mapping.name().to_owned(),
        }
    }

    fn hydrate(&self, row: &Row) -> Result<Option<M::Entity>, RepoError> {
        if row.is_empty() {
            return Ok(None);
        }
        self.mapping
            .from_row(row)
            .map(Some)
            .ok_or_else(|| self.unhydratable())
    }

    fn hydrate_all(&self, rows: &[Row]) -> Result<Vec<M::Entity>, RepoError> {
        rows.iter()
            .filter_map(|row| self.hydrate(row).transpose())
            .collect()
    }

    /// `fields` plus the identity property; `None` when every column is selected.
    fn with_identity(&self, fields: Option<&Fields>) -> Result<Option<Fields>, RepoError> {
        match fields {
            Some(fields) if !fields.is_empty() => {
                let mut fields = fields.clone();
                fields.add(self.mapping.identity_property()?);
                Ok(Some(fields))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl<R, M> ReadRepository for Hydrated<R, M>
where
    R: ReadRepository<Item = Row>,
    M: Mapping,
{
    type Item = M::Entity;

    async fn find(
        &self,
        runner: &dyn DbRunner,
        id: &dyn Identity,
        fields: Option<&Fields>,
    ) -> Result<Option<M::Entity>, RepoError> {
        let fields = self.with_identity(fields)?;
        match self.inner.find(runner, id, fields.as_ref()).await? {
            Some(row) => self.hydrate(&row),
            None => Ok(None),
        }
    }

    async fn exists(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<bool, RepoError> {
        self.inner.exists(runner, id).await
    }

    async fn find_by(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
        fields: Option<&Fields>,
    ) -> Result<Vec<M::Entity>, RepoError> {
        let fields = self.with_identity(fields)?;
        let rows = self
            .inner
            .find_by(runner, filter, sort, fields.as_ref())
            .await?;
        self.hydrate_all(&rows)
    }

    async fn find_by_distinct(
        &self,
        runner: &dyn DbRunner,
        distinct: &DistinctFields,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
    ) -> Result<Vec<M::Entity>, RepoError> {
        let rows = self
            .inner
            .find_by_distinct(runner, distinct, filter, sort)
            .await?;
        self.hydrate_all(&rows)
    }

    async fn count(&self, runner: &dyn DbRunner, filter: Option<&Filter>) -> Result<u64, RepoError> {
        self.inner.count(runner, filter).await
    }
}

#[async_trait]
impl<R, M> WriteRepository for Hydrated<R, M>
where
    R: WriteRepository<Entity = M::Entity, Item = Row>,
    M: Mapping,
{
    type Entity = M::Entity;
    type Item = M::Entity;

    async fn add(&self, runner: &dyn DbRunner, entity: &M::Entity) -> Result<M::Entity, RepoError> {
        let row = self.inner.add(runner, entity).await?;
        self.hydrate(&row)?.ok_or_else(|| self.unhydratable())
    }

    async fn add_all(
        &self,
        runner: &dyn DbRunner,
        entities: &[M::Entity],
    ) -> Result<Vec<M::Entity>, RepoError> {
        let rows = self.inner.add_all(runner, entities).await?;
        self.hydrate_all(&rows)
    }

    async fn remove(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<u64, RepoError> {
        self.inner.remove(runner, id).await
    }

    async fn remove_all(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
    ) -> Result<u64, RepoError> {
        self.inner.remove_all(runner, filter).await
    }
}

#[async_trait]
impl<R, M> PageRepository for Hydrated<R, M>
where
    R: PageRepository<Item = Row>,
    M: Mapping,
{
    type Item = M::Entity;

    async fn find_all(
        &self,
        runner: &dyn DbRunner,
        pageable: Option<&Pageable>,
    ) -> Result<Page<M::Entity>, RepoError> {
        let Some(pageable) = pageable else {
            let page = self.inner.find_all(runner, None).await?;
            let content = self.hydrate_all(page.content())?;
            return Ok(Page::single(content, page.total_elements()));
        };
        let widened = match self.with_identity(pageable.fields())? {
            Some(fields) => pageable.clone().with_fields(fields),
            None => pageable.clone(),
        };
        let page = self.inner.find_all(runner, Some(&widened)).await?;
        let content = self.hydrate_all(page.content())?;
        // The envelope reports the caller's request, not the widened one.
        Ok(Page::new(content, page.total_elements(), pageable))
    }
}
