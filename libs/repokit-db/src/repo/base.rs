//! Statement construction and execution shared by the raw repositories.

use repokit_criteria::{
    BranchKind, CriteriaError, DistinctFields, Fields, Filter, Mapping, Row, Scalar, Sort,
};
use sea_orm::sea_query::{
    Alias, Asterisk, DeleteStatement, Expr, Func, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{ExecResult, FromQueryResult, JsonValue, QueryResult, Statement, StatementBuilder};

use crate::error::RepoError;
use crate::runner::DbRunner;
use crate::translate::QueryCompiler;

/// Column list of a select.
pub(super) enum Projection<'m> {
    All,
    Columns(Vec<&'m str>),
    Distinct(Vec<&'m str>),
}

impl<'m> Projection<'m> {
    /// `fields` restricted to mapped columns; `None` or an empty set selects everything.
    pub(super) fn fields(
        compiler: &QueryCompiler<'m>,
        fields: Option<&Fields>,
    ) -> Result<Self, CriteriaError> {
        match fields {
            Some(fields) if !fields.is_empty() => Ok(Projection::Columns(compiler.columns(fields)?)),
            _ => Ok(Projection::All),
        }
    }

    /// `SELECT DISTINCT` over `distinct`, or `DISTINCT *` when it is empty.
    pub(super) fn distinct(
        compiler: &QueryCompiler<'m>,
        distinct: &DistinctFields,
    ) -> Result<Self, CriteriaError> {
        Ok(Projection::Distinct(compiler.columns(distinct.fields())?))
    }

    fn apply(&self, select: &mut SelectStatement) {
        match self {
            Projection::All => {
                select.column(Asterisk);
            }
            Projection::Columns(columns) => {
                select.columns(columns.iter().map(|c| Alias::new(*c)));
            }
            Projection::Distinct(columns) => {
                select.distinct();
                if columns.is_empty() {
                    select.column(Asterisk);
                } else {
                    select.columns(columns.iter().map(|c| Alias::new(*c)));
                }
            }
        }
    }
}

/// `<identity> = ..`, bound as a conjunctive value.
pub(super) fn identity_eq<M: Mapping>(
    mapping: &M,
    compiler: &mut QueryCompiler<'_>,
    id: &Scalar,
) -> SimpleExpr {
    Expr::col(Alias::new(mapping.identity())).eq(compiler.bind(BranchKind::Must, id))
}

/// `SELECT <projection> FROM <table> [WHERE ..] [ORDER BY ..]`.
pub(super) fn select<M: Mapping>(
    mapping: &M,
    compiler: &mut QueryCompiler<'_>,
    projection: &Projection<'_>,
    filter: Option<&Filter>,
    sort: Option<&Sort>,
) -> Result<SelectStatement, CriteriaError> {
    let mut select = Query::select();
    projection.apply(&mut select);
    select.from(Alias::new(mapping.name()));
    if let Some(cond) = filter.map(|f| compiler.filter(f)).transpose()?.flatten() {
        select.cond_where(cond);
    }
    if let Some(sort) = sort {
        compiler.order_by(&mut select, sort)?;
    }
    Ok(select)
}

/// `SELECT COUNT(<identity>) AS total FROM <table> [WHERE ..]`.
pub(super) fn count<M: Mapping>(
    mapping: &M,
    compiler: &mut QueryCompiler<'_>,
    filter: Option<&Filter>,
) -> Result<SelectStatement, CriteriaError> {
    let mut select = Query::select();
    select
        .expr_as(
            Func::count(Expr::col(Alias::new(mapping.identity()))),
            Alias::new("total"),
        )
        .from(Alias::new(mapping.name()));
    if let Some(cond) = filter.map(|f| compiler.filter(f)).transpose()?.flatten() {
        select.cond_where(cond);
    }
    Ok(select)
}

/// Single-row lookup by identity.
pub(super) fn select_one<M: Mapping>(
    mapping: &M,
    compiler: &mut QueryCompiler<'_>,
    projection: &Projection<'_>,
    id: &Scalar,
) -> SelectStatement {
    let mut select = Query::select();
    projection.apply(&mut select);
    select
        .from(Alias::new(mapping.name()))
        .and_where(identity_eq(mapping, compiler, id))
        .limit(1);
    select
}

/// `DELETE FROM <table> WHERE <identity> = ..`.
pub(super) fn delete_one<M: Mapping>(
    mapping: &M,
    compiler: &mut QueryCompiler<'_>,
    id: &Scalar,
) -> DeleteStatement {
    let mut delete = Query::delete();
    delete
        .from_table(Alias::new(mapping.name()))
        .and_where(identity_eq(mapping, compiler, id));
    delete
}

/// Render for the runner's backend and log it.
pub(super) fn build<S>(
    runner: &dyn DbRunner,
    table: &str,
    stmt: &S,
    compiler: &QueryCompiler<'_>,
) -> Statement
where
    S: StatementBuilder,
{
    let stmt = runner.as_seaorm().backend().build(stmt);
    tracing::debug!(table, sql = %stmt.sql, bindings = ?compiler.bindings(), "statement built");
    stmt
}

/// One result row as a [`Row`].
///
/// The JSON decoder picks the narrowest Rust type a column accepts, which reads
/// SQLite `REAL` as `f32`. Floating and null cells are read again as `f64` so a
/// persisted value comes back unchanged.
pub(super) fn decode_row(res: &QueryResult) -> Result<Row, RepoError> {
    let mut row = Row::from_json(JsonValue::from_query_result(res, "")?);
    let widen: Vec<String> = row
        .iter()
        .filter(|(_, value)| matches!(value, Scalar::Float(_) | Scalar::Null))
        .map(|(column, _)| column.to_owned())
        .collect();
    for column in widen {
        if let Ok(Some(value)) = res.try_get_by::<Option<f64>, _>(column.as_str()) {
            row.insert(column, value);
        }
    }
    Ok(row)
}

pub(super) async fn fetch_rows(runner: &dyn DbRunner, stmt: Statement) -> Result<Vec<Row>, RepoError> {
    let results = runner.as_seaorm().query_all(stmt).await?;
    results.iter().map(decode_row).collect()
}

pub(super) async fn fetch_one(
    runner: &dyn DbRunner,
    stmt: Statement,
) -> Result<Option<Row>, RepoError> {
    let Some(res) = runner.as_seaorm().query_one(stmt).await? else {
        return Ok(None);
    };
    let row = decode_row(&res)?;
    Ok((!row.is_empty()).then_some(row))
}

pub(super) async fn fetch_count(runner: &dyn DbRunner, stmt: Statement) -> Result<u64, RepoError> {
    let Some(res) = runner.as_seaorm().query_one(stmt).await? else {
        return Ok(0);
    };
    let total: i64 = res.try_get("", "total")?;
    Ok(u64::try_from(total).unwrap_or_default())
}

pub(super) async fn execute(runner: &dyn DbRunner, stmt: Statement) -> Result<ExecResult, RepoError> {
    Ok(runner.as_seaorm().execute(stmt).await?)
}
