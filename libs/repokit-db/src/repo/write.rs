use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use repokit_criteria::{
    BranchKind, Fields, Filter, Flattener, Identity, Mapping, MappingFlattener, Row, Scalar,
};
use sea_orm::DbErr;
use sea_orm::sea_query::{Alias, Query, SimpleExpr};

use super::base::{self, Projection};
use super::read::SqlReadRepository;
use super::{ReadRepository, WriteRepository};
use crate::error::RepoError;
use crate::runner::DbRunner;
use crate::translate::QueryCompiler;

/// Result of the update half of an upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// Nothing is stored under the identity; the caller inserts instead.
    Missing,
}

/// Row-level writes for one mapping.
///
/// Entities are turned into rows by the injected [`Flattener`]; every write
/// is read back through the mapping before it is returned.
pub struct SqlWriteRepository<M, F = MappingFlattener> {
    mapping: Arc<M>,
    flattener: F,
    reader: SqlReadRepository<M>,
}

impl<M: Mapping> SqlWriteRepository<M> {
    #[must_use]
    pub fn new(mapping: Arc<M>) -> Self {
        Self::with_flattener(mapping, MappingFlattener)
    }
}

impl<M: Mapping, F: Flattener<M>> SqlWriteRepository<M, F> {
    #[must_use]
    pub fn with_flattener(mapping: Arc<M>, flattener: F) -> Self {
        Self {
            reader: SqlReadRepository::new(Arc::clone(&mapping)),
            mapping,
            flattener,
        }
    }

    /// Values to write, in mapping order. The identity column is left out
    /// unless `with_identity` is set.
    fn assignments(
        &self,
        compiler: &mut QueryCompiler<'_>,
        row: &Row,
        with_identity: bool,
    ) -> Result<Vec<(String, SimpleExpr)>, RepoError> {
        let mapping = &*self.mapping;
        let identity = mapping.identity();
        let mut out = Vec::with_capacity(mapping.map().len());
        for column in mapping.map().columns() {
            if column == identity && !with_identity {
                continue;
            }
            let value = row
                .get(column)
                .ok_or_else(|| RepoError::MissingColumnValue {
                    table: mapping.name().to_owned(),
                    column: column.to_owned(),
                })?;
            out.push((column.to_owned(), compiler.bind(BranchKind::Must, value)));
        }
        Ok(out)
    }

    /// `UPDATE .. WHERE <identity> = id`.
    ///
    /// A zero row count is confirmed with a lookup before reporting
    /// [`UpdateOutcome::Missing`]: `MySQL` counts changed rows, not matched ones.
    pub async fn update(
        &self,
        runner: &dyn DbRunner,
        id: &Scalar,
        row: &Row,
    ) -> Result<UpdateOutcome, RepoError> {
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let assignments = self.assignments(&mut compiler, row, false)?;

        if !assignments.is_empty() {
            let mut update = Query::update();
            update
                .table(Alias::new(mapping.name()))
                .values(
                    assignments
                        .into_iter()
                        .map(|(column, value)| (Alias::new(column), value)),
                )
                .and_where(base::identity_eq(mapping, &mut compiler, id));
            let stmt = base::build(runner, mapping.name(), &update, &compiler);
            if base::execute(runner, stmt).await?.rows_affected() > 0 {
                return Ok(UpdateOutcome::Updated);
            }
        }

        if self.reader.exists(runner, id).await? {
            Ok(UpdateOutcome::Updated)
        } else {
            Ok(UpdateOutcome::Missing)
        }
    }

    /// `INSERT` one row and return the identity it is stored under.
    ///
    /// With [`Mapping::auto_generate_id`] the identity column is omitted and
    /// the new identity is taken from `RETURNING` where the backend has it,
    /// from the last insert id otherwise. The same applies to a row whose
    /// identity is still unassigned.
    pub async fn insert(&self, runner: &dyn DbRunner, row: &Row) -> Result<Scalar, RepoError> {
        let mapping = &*self.mapping;
        let identity = mapping.identity();
        let assigned = if mapping.auto_generate_id() {
            Scalar::Null
        } else {
            row.get(identity).cloned().unwrap_or_default()
        };

        let mut compiler = QueryCompiler::new(mapping.map());
        let assignments = self.assignments(&mut compiler, row, !assigned.is_null())?;

        let mut insert = Query::insert();
        insert.into_table(Alias::new(mapping.name()));
        if assignments.is_empty() {
            insert.or_default_values();
        } else {
            let (columns, values): (Vec<_>, Vec<_>) = assignments.into_iter().unzip();
            insert
                .columns(columns.into_iter().map(Alias::new))
                .values(values)
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        if !assigned.is_null() {
            let stmt = base::build(runner, mapping.name(), &insert, &compiler);
            base::execute(runner, stmt).await?;
            return Ok(assigned);
        }

        if runner.as_seaorm().supports_returning() {
            insert.returning_col(Alias::new(identity));
            let stmt = base::build(runner, mapping.name(), &insert, &compiler);
            let returned = base::fetch_one(runner, stmt).await?;
            return returned
                .and_then(|row| row.get(identity).cloned())
                .filter(|id| !id.is_null())
                .ok_or_else(|| RepoError::MissingColumnValue {
                    table: mapping.name().to_owned(),
                    column: identity.to_owned(),
                });
        }

        let stmt = base::build(runner, mapping.name(), &insert, &compiler);
        let result = base::execute(runner, stmt).await?;
        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| DbErr::Custom(format!("generated identity out of range: {e}")))?;
        Ok(Scalar::Int(id))
    }

    /// Identity keys of the given identities that are already stored.
    async fn stored_identities(
        &self,
        runner: &dyn DbRunner,
        ids: &[Scalar],
    ) -> Result<HashSet<String>, RepoError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mapping = &*self.mapping;
        let identity = mapping.identity();
        let identity_property = mapping.identity_property()?;

        let mut filter = Filter::new();
        filter.must().include_group(identity_property, ids.iter().cloned());
        let fields: Fields = std::iter::once(identity_property).collect();

        let mut compiler = QueryCompiler::new(mapping.map());
        let projection = Projection::fields(&compiler, Some(&fields))?;
        let select = base::select(mapping, &mut compiler, &projection, Some(&filter), None)?;
        let stmt = base::build(runner, mapping.name(), &select, &compiler);

        Ok(base::fetch_rows(runner, stmt)
            .await?
            .iter()
            .filter_map(|row| row.get(identity).map(Scalar::identity_key))
            .collect())
    }

    async fn reselect(&self, runner: &dyn DbRunner, id: &Scalar) -> Result<Row, RepoError> {
        self.reader
            .find(runner, id, None)
            .await?
            .ok_or_else(|| RepoError::NotFoundAfterWrite {
                table: self.mapping.name().to_owned(),
                id: id.identity_key(),
            })
    }
}

#[async_trait]
impl<M, F> WriteRepository for SqlWriteRepository<M, F>
where
    M: Mapping,
    F: Flattener<M>,
{
    type Entity = M::Entity;
    type Item = Row;

    async fn add(&self, runner: &dyn DbRunner, entity: &M::Entity) -> Result<Row, RepoError> {
        let row = self.flattener.flatten(&*self.mapping, entity)?;
        let id = entity.id();

        let outcome = if id.is_null() {
            UpdateOutcome::Missing
        } else {
            self.update(runner, &id, &row).await?
        };
        let id = match outcome {
            UpdateOutcome::Updated => id,
            UpdateOutcome::Missing => self.insert(runner, &row).await?,
        };
        self.reselect(runner, &id).await
    }

    async fn add_all(
        &self,
        runner: &dyn DbRunner,
        entities: &[M::Entity],
    ) -> Result<Vec<Row>, RepoError> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let mapping = &*self.mapping;
        let identity_property = mapping.identity_property()?;

        let mut batch = Vec::with_capacity(entities.len());
        for (index, entity) in entities.iter().enumerate() {
            let id = entity.id();
            if id.is_null() && !mapping.auto_generate_id() {
                return Err(RepoError::NotAnIdentity { index });
            }
            batch.push((id, self.flattener.flatten(mapping, entity)?));
        }

        let known: Vec<Scalar> = batch
            .iter()
            .filter(|(id, _)| !id.is_null())
            .map(|(id, _)| id.clone())
            .collect();
        let stored = self.stored_identities(runner, &known).await?;
        let (updates, inserts): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|(id, _)| !id.is_null() && stored.contains(&id.identity_key()));

        let mut written = Vec::with_capacity(entities.len());
        for (id, row) in updates {
            match self.update(runner, &id, &row).await? {
                UpdateOutcome::Updated => written.push(id),
                UpdateOutcome::Missing => written.push(self.insert(runner, &row).await?),
            }
        }
        for (_, row) in inserts {
            written.push(self.insert(runner, &row).await?);
        }

        let mut filter = Filter::new();
        filter.must().include_group(identity_property, written);
        self.reader.find_by(runner, Some(&filter), None, None).await
    }

    async fn remove(&self, runner: &dyn DbRunner, id: &dyn Identity) -> Result<u64, RepoError> {
        let id = id.id();
        if id.is_null() {
            return Ok(0);
        }
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let delete = base::delete_one(mapping, &mut compiler, &id);
        let stmt = base::build(runner, mapping.name(), &delete, &compiler);
        Ok(base::execute(runner, stmt).await?.rows_affected())
    }

    async fn remove_all(
        &self,
        runner: &dyn DbRunner,
        filter: Option<&Filter>,
    ) -> Result<u64, RepoError> {
        let mapping = &*self.mapping;
        let mut compiler = QueryCompiler::new(mapping.map());
        let mut delete = Query::delete();
        delete.from_table(Alias::new(mapping.name()));
        if let Some(cond) = filter.map(|f| compiler.filter(f)).transpose()?.flatten() {
            delete.cond_where(cond);
        } else {
            tracing::warn!(table = mapping.name(), "removing every row");
        }
        let stmt = base::build(runner, mapping.name(), &delete, &compiler);
        Ok(base::execute(runner, stmt).await?.rows_affected())
    }
}
