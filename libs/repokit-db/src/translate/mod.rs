//! Criteria to `sea-query` compiler.
//!
//! One [`QueryCompiler`] is created per operation. It resolves properties
//! through the mapping, turns a [`Filter`](repokit_criteria::Filter) into a
//! `Condition`, a [`Sort`](repokit_criteria::Sort) into `ORDER BY` clauses and
//! a projection into a column list. Every bound value is recorded as a
//! [`Binding`] whose name encodes the branch it came from; the placeholder
//! counter runs for the whole operation so the names never collide between
//! the statements it builds.
//!
//! The SQL placeholders themselves are rendered by the backend's statement
//! builder; the recorded names are what shows up in logs and diagnostics.

mod filter;
mod sort;

use repokit_criteria::{BranchKind, CriteriaError, Fields, PropertyMap, Scalar};
use sea_orm::Value;
use sea_orm::sea_query::{Alias, Expr, Keyword, SimpleExpr};

/// One value bound while compiling, with its diagnostic name.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Scalar,
}

#[derive(Debug, Default)]
struct Placeholders {
    next: usize,
}

impl Placeholders {
    /// `:k` + `a`/`o` (conjunctive or `should`) + `p`/`n` (polarity) + counter.
    fn next_name(&mut self, kind: BranchKind) -> String {
        self.next += 1;
        let group = if kind.is_disjunctive() { 'o' } else { 'a' };
        let polarity = if kind.is_negated() { 'n' } else { 'p' };
        format!(":k{group}{polarity}{}", self.next)
    }
}

#[derive(Debug)]
pub struct QueryCompiler<'m> {
    map: &'m PropertyMap,
    placeholders: Placeholders,
    bindings: Vec<Binding>,
}

impl<'m> QueryCompiler<'m> {
    #[must_use]
    pub fn new(map: &'m PropertyMap) -> Self {
        Self {
            map,
            placeholders: Placeholders::default(),
            bindings: Vec::new(),
        }
    }

    /// Column for `property`.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnmappedProperty`] when the property is not mapped.
    pub fn resolve(&self, property: &str) -> Result<&'m str, CriteriaError> {
        let map: &'m PropertyMap = self.map;
        map.column(property)
    }

    /// Columns of a projection, in mapping declaration order.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnmappedProperty`] for the first requested
    /// property that is not mapped.
    pub fn columns(&self, fields: &Fields) -> Result<Vec<&'m str>, CriteriaError> {
        for property in fields.iter() {
            self.resolve(property)?;
        }
        let map: &'m PropertyMap = self.map;
        Ok(map
            .iter()
            .filter(|(property, _)| fields.contains(property))
            .map(|(_, column)| column)
            .collect())
    }

    /// Values bound so far, in binding order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Record `value` under the next placeholder name for `kind` and return
    /// it in its bindable form.
    ///
    /// `NULL` is rendered as the untyped keyword rather than bound, so it can
    /// be assigned to a column of any type.
    pub(crate) fn bind(&mut self, kind: BranchKind, value: &Scalar) -> SimpleExpr {
        let value = value.bindable();
        if value.is_null() {
            return SimpleExpr::Keyword(Keyword::Null);
        }
        let name = self.placeholders.next_name(kind);
        let bound = SimpleExpr::Value(to_value(&value));
        self.bindings.push(Binding { name, value });
        bound
    }

    fn column_expr(&self, property: &str) -> Result<Expr, CriteriaError> {
        Ok(Expr::col(Alias::new(self.resolve(property)?)))
    }
}

fn to_value(scalar: &Scalar) -> Value {
    match scalar.bindable() {
        Scalar::Null => Value::from(Option::<String>::None),
        Scalar::Bool(b) => Value::from(i64::from(b)),
        Scalar::Int(v) => Value::from(v),
        Scalar::Float(v) => Value::from(v),
        Scalar::Text(s) => Value::from(s),
    }
}
