use repokit_criteria::{BranchKind, CriteriaError, Criterion, Filter, Operand, Operator, Scalar};
use sea_orm::sea_query::{Condition, LikeExpr, SimpleExpr};

use super::QueryCompiler;

#[derive(Clone, Copy)]
enum Wildcard {
    Both,
    Trailing,
    Leading,
}

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn mismatch(operator: Operator, criterion: &Criterion) -> CriteriaError {
    CriteriaError::OperandMismatch {
        operator: operator.to_string(),
        property: criterion.property.clone(),
    }
}

impl QueryCompiler<'_> {
    /// Compile `filter` into one condition.
    ///
    /// `must` and complemented `must_not` conditions are ANDed; every `should`
    /// condition is ORed onto that group. Returns `None` when the filter holds
    /// no effective condition.
    ///
    /// # Errors
    /// Returns [`CriteriaError::UnmappedProperty`] for a property missing from
    /// the mapping and [`CriteriaError::OperandMismatch`] for an operand whose
    /// shape does not fit its operator.
    pub fn filter(&mut self, filter: &Filter) -> Result<Option<Condition>, CriteriaError> {
        let mut all = Condition::all();
        let mut all_len = 0_usize;
        let mut any = Condition::any();
        let mut any_len = 0_usize;

        for (kind, branch) in filter.branches() {
            for (operator, criterion) in branch.iter() {
                let operator = if kind.is_negated() {
                    operator.complement()
                } else {
                    operator
                };
                let expr = self.predicate(kind, operator, criterion)?;
                if kind.is_disjunctive() {
                    any = any.add(expr);
                    any_len += 1;
                } else {
                    all = all.add(expr);
                    all_len += 1;
                }
            }
        }

        Ok(match (all_len, any_len) {
            (0, 0) => None,
            (_, 0) => Some(all),
            (0, _) => Some(any),
            _ => Some(Condition::any().add(all).add(any)),
        })
    }

    fn predicate(
        &mut self,
        kind: BranchKind,
        operator: Operator,
        criterion: &Criterion,
    ) -> Result<SimpleExpr, CriteriaError> {
        let col = self.column_expr(&criterion.property)?;

        Ok(match (operator, &criterion.operand) {
            (Operator::Equals, Operand::Scalar(Scalar::Null)) => col.is_null(),
            (Operator::NotEqual, Operand::Scalar(Scalar::Null)) => col.is_not_null(),
            (Operator::Equals, Operand::Scalar(v)) => col.eq(self.bind(kind, v)),
            (Operator::NotEqual, Operand::Scalar(v)) => col.ne(self.bind(kind, v)),
            (Operator::GreaterThan, Operand::Scalar(v)) => col.gt(self.bind(kind, v)),
            (Operator::GreaterThanOrEqual, Operand::Scalar(v)) => col.gte(self.bind(kind, v)),
            (Operator::LessThan, Operand::Scalar(v)) => col.lt(self.bind(kind, v)),
            (Operator::LessThanOrEqual, Operand::Scalar(v)) => col.lte(self.bind(kind, v)),

            (
                Operator::Contains
                | Operator::NotContains
                | Operator::StartsWith
                | Operator::NotStarts
                | Operator::EndsWith
                | Operator::NotEnds,
                Operand::Scalar(Scalar::Null),
            ) => return Err(mismatch(operator, criterion)),
            (Operator::Contains, Operand::Scalar(v)) => col.like(self.like(kind, v, Wildcard::Both)),
            (Operator::NotContains, Operand::Scalar(v)) => {
                col.not_like(self.like(kind, v, Wildcard::Both))
            }
            (Operator::StartsWith, Operand::Scalar(v)) => {
                col.like(self.like(kind, v, Wildcard::Trailing))
            }
            (Operator::NotStarts, Operand::Scalar(v)) => {
                col.not_like(self.like(kind, v, Wildcard::Trailing))
            }
            (Operator::EndsWith, Operand::Scalar(v)) => {
                col.like(self.like(kind, v, Wildcard::Leading))
            }
            (Operator::NotEnds, Operand::Scalar(v)) => {
                col.not_like(self.like(kind, v, Wildcard::Leading))
            }

            (Operator::Range, Operand::Pair(low, high)) => {
                let low = self.bind(kind, low);
                let high = self.bind(kind, high);
                col.between(low, high)
            }
            (Operator::NotRange, Operand::Pair(low, high)) => {
                let low = self.bind(kind, low);
                let high = self.bind(kind, high);
                col.not_between(low, high)
            }

            (Operator::Group, Operand::Set(values)) => {
                let values: Vec<_> = values.iter().map(|v| self.bind(kind, v)).collect();
                col.is_in(values)
            }
            (Operator::NotGroup, Operand::Set(values)) => {
                let values: Vec<_> = values.iter().map(|v| self.bind(kind, v)).collect();
                col.is_not_in(values)
            }

            (Operator::Empty, Operand::None) => col.eq(self.bind(kind, &Scalar::from(""))),
            (Operator::NotEmpty, Operand::None) => col.ne(self.bind(kind, &Scalar::from(""))),

            (operator, _) => return Err(mismatch(operator, criterion)),
        })
    }

    fn like(&mut self, kind: BranchKind, value: &Scalar, wildcard: Wildcard) -> LikeExpr {
        let escaped = like_escape(&value.bindable().to_string());
        let pattern = match wildcard {
            Wildcard::Both => format!("%{escaped}%"),
            Wildcard::Trailing => format!("{escaped}%"),
            Wildcard::Leading => format!("%{escaped}"),
        };
        self.bind(kind, &Scalar::Text(pattern.clone()));
        LikeExpr::new(pattern).escape('\\')
    }
}
