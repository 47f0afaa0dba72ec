use repokit_criteria::{CriteriaError, Sort, SortDir};
use sea_orm::sea_query::{Alias, Order, SelectStatement};

use super::QueryCompiler;

impl QueryCompiler<'_> {
    /// Append `ORDER BY` clauses for every key of `sort`, in order.
    ///
    /// Every property is resolved before the statement is touched, so an
    /// unmapped property leaves `select` unchanged.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnmappedProperty`] when a sorted property is not mapped.
    pub fn order_by(&self, select: &mut SelectStatement, sort: &Sort) -> Result<(), CriteriaError> {
        let keys = sort
            .orders()
            .iter()
            .map(|key| Ok((self.resolve(&key.property)?, key.dir)))
            .collect::<Result<Vec<_>, CriteriaError>>()?;

        for (column, dir) in keys {
            let order = match dir {
                SortDir::Asc => Order::Asc,
                SortDir::Desc => Order::Desc,
            };
            select.order_by(Alias::new(column), order);
        }
        Ok(())
    }
}
