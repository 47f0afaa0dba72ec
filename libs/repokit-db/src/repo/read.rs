use std::sync::Arc;

use async_trait::async_trait;
use repokit_criteria::{DistinctFields, Fields, Filter, Identity, Mapping, Row, Sort};

use super::ReadRepository;
use super::base::{self, Projection};
use crate::error::RepoError;
use crate::runner::DbRunner;
use crate::translate::QueryCompiler;

/// Row-level reads for one mapping.
pub struct SqlReadRepository<M> {
    mapping: Arc<M>,
}

impl<M> Clone for SqlReadRepository<M> {
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
        }
    }
}

impl<M: Mapping> SqlReadRepository<M> {
    #[must_use]
    pub fn new(mapping: Arc<M>) -> Self {
        Self { mapping }
    }

    #[must_use]
    pub fn mapping(&self) -> &M {
        &self.mapping
    }
}

#[async_trait]
impl<M: Mapping> ReadRepository for SqlReadRepository<M> {
    type Item = Row;

    async fn find(
        &self,
        runner: &dyn DbRunner,
        id: &dyn Identity,
        fields: Option<&Fields>,
    ) -> Result<Option<Row>, RepoError> {
        let id = id.id();
        if id.is_null() {
            return Ok(None);
        }
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let projection = Projection::fields(&compiler, fields)?;
        let select = base::select_one(mapping, &mut compiler, &projection, &id);
        let stmt = base::build(runner, mapping.name(), &select, &compiler);
        base::fetch_one(runner, stmt).await
    }

    async fn exists(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<bool, RepoError> {
        Ok(self.find(runner, id, None).await?.is_some())
    }

    async fn find_by(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
        fields: Option<&Fields>,
    ) -> Result<Vec<Row>, RepoError> {
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let projection = Projection::fields(&compiler, fields)?;
        let select = base::select(mapping, &mut compiler, &projection, filter, sort)?;
        let stmt = base::build(runner, mapping.name(), &select, &compiler);
        base::fetch_rows(runner, stmt).await
    }

    async fn find_by_distinct(
        &self,
        runner: &dyn DbRunner,
        distinct: &DistinctFields,
        filter: Option<&Filter>,
        sort: Option<&Sort>,
    ) -> Result<Vec<Row>, RepoError> {
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let projection = Projection::distinct(&compiler, distinct)?;
        let select = base::select(mapping, &mut compiler, &projection, filter, sort)?;
        let stmt = base::build(runner, mapping.name(), &select, &compiler);
        base::fetch_rows(runner, stmt).await
    }

    async fn count(&self, runner: &dyn DbRunner, filter: Option<&Filter>) -> Result<u64, RepoError> {
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let select = base::count(mapping, &mut compiler, filter)?;
        let stmt = base::build(runner, mapping.name(), &select, &compiler);
        base::fetch_count(runner, stmt).await
    }
}
