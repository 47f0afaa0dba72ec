use std::sync::Arc;

use async_trait::async_trait;
use repokit_criteria::{Mapping, Page, Pageable, Row};

use super::base::{self, Projection};
use super::read::SqlReadRepository;
use super::{PageRepository, ReadRepository};
use crate::error::RepoError;
use crate::runner::DbRunner;
use crate::translate::QueryCompiler;

/// Row-level pagination for one mapping.
pub struct SqlPageRepository<M> {
    mapping: Arc<M>,
    reader: SqlReadRepository<M>,
}

impl<M: Mapping> SqlPageRepository<M> {
    #[must_use]
    pub fn new(mapping: Arc<M>) -> Self {
        Self {
            reader: SqlReadRepository::new(Arc::clone(&mapping)),
            mapping,
        }
    }
}

#[async_trait]
impl<M: Mapping> PageRepository for SqlPageRepository<M> {
    type Item = Row;

    async fn find_all(
        &self,
        runner: &dyn DbRunner,
        pageable: Option<&Pageable>,
    ) -> Result<Page<Row>, RepoError> {
        let Some(pageable) = pageable else {
            let rows = self.reader.find_by(runner, None, None, None).await?;
            let total = self.reader.count(runner, None).await?;
            return Ok(Page::single(rows, total));
        };

        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let projection = match pageable.distinct_fields() {
            Some(distinct) if !distinct.is_empty() => Projection::distinct(&compiler, distinct)?,
            _ => Projection::fields(&compiler, pageable.fields())?,
        };

        // Both statements are compiled before either runs.
        let count = base::count(mapping, &mut compiler, pageable.filter())?;
        let mut select = base::select(
            mapping,
            &mut compiler,
            &projection,
            pageable.filter(),
            pageable.sort(),
        )?;
        select.limit(pageable.page_size()).offset(pageable.offset());

        let count = base::build(runner, mapping.name(), &count, &compiler);
        let select = base::build(runner, mapping.name(), &select, &compiler);
        let total = base::fetch_count(runner, count).await?;
        let rows = base::fetch_rows(runner, select).await?;
        Ok(Page::new(rows, total, pageable))
    }
}
