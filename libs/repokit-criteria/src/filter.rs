//! Three-branch boolean criteria tree.
//!
//! A [`Filter`] holds a conjunctive `must` branch, a `must_not` branch whose
//! conditions are each inverted through [`Operator::complement`] before
//! being ANDed, and a disjunctive `should` branch.
//!
//! ```
//! use repokit_criteria::Filter;
//!
//! let mut filter = Filter::new();
//! filter.must().range("totalOrders", 3, 4).contain("name", "Ken");
//! filter.must_not().include_group("id", [2, 3]);
//! assert!(!filter.is_empty());
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;
use crate::scalar::Scalar;

/// Shape of the operand an operator expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// No operand (`empty`, `not_empty`).
    Nullary,
    Scalar,
    Pair,
    Set,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    NotStarts,
    EndsWith,
    NotEnds,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Range,
    NotRange,
    Group,
    NotGroup,
    Empty,
    NotEmpty,
}

impl Operator {
    pub const ALL: [Operator; 18] = [
        Operator::Equals,
        Operator::NotEqual,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::NotStarts,
        Operator::EndsWith,
        Operator::NotEnds,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::Range,
        Operator::NotRange,
        Operator::Group,
        Operator::NotGroup,
        Operator::Empty,
        Operator::NotEmpty,
    ];

    /// The operator applied when this one appears in a `must_not` branch.
    #[must_use]
    pub fn complement(self) -> Operator {
        match self {
            Operator::Equals => Operator::NotEqual,
            Operator::NotEqual => Operator::Equals,
            Operator::Contains => Operator::NotContains,
            Operator::NotContains => Operator::Contains,
            Operator::StartsWith => Operator::NotStarts,
            Operator::NotStarts => Operator::StartsWith,
            Operator::EndsWith => Operator::NotEnds,
            Operator::NotEnds => Operator::EndsWith,
            Operator::GreaterThan => Operator::LessThanOrEqual,
            Operator::GreaterThanOrEqual => Operator::LessThan,
            Operator::LessThan => Operator::GreaterThanOrEqual,
            Operator::LessThanOrEqual => Operator::GreaterThan,
            Operator::Range => Operator::NotRange,
            Operator::NotRange => Operator::Range,
            Operator::Group => Operator::NotGroup,
            Operator::NotGroup => Operator::Group,
            Operator::Empty => Operator::NotEmpty,
            Operator::NotEmpty => Operator::Empty,
        }
    }

    #[must_use]
    pub fn arity(self) -> Arity {
        match self {
            Operator::Range | Operator::NotRange => Arity::Pair,
            Operator::Group | Operator::NotGroup => Arity::Set,
            Operator::Empty | Operator::NotEmpty => Arity::Nullary,
            _ => Arity::Scalar,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEqual => "not_equal",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::NotStarts => "not_starts",
            Operator::EndsWith => "ends_with",
            Operator::NotEnds => "not_ends",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::Range => "range",
            Operator::NotRange => "not_range",
            Operator::Group => "group",
            Operator::NotGroup => "not_group",
            Operator::Empty => "empty",
            Operator::NotEmpty => "not_empty",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CriteriaError::UnknownOperator(s.to_owned()))
    }
}

/// Value side of a condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    None,
    Scalar(Scalar),
    Pair(Scalar, Scalar),
    Set(Vec<Scalar>),
}

impl Operand {
    /// Whether the operand still holds something to compare against.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        !matches!(self, Operand::Set(values) if values.is_empty())
    }
}

/// One `{property, operand}` pair under an operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub property: String,
    pub operand: Operand,
}

/// Which of the three branches a condition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Must,
    MustNot,
    Should,
}

impl BranchKind {
    /// `must_not` conditions are applied through their complement.
    #[must_use]
    pub fn is_negated(self) -> bool {
        matches!(self, BranchKind::MustNot)
    }

    #[must_use]
    pub fn is_disjunctive(self) -> bool {
        matches!(self, BranchKind::Should)
    }
}

/// Conditions of one branch, grouped by operator in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Branch {
    conditions: IndexMap<Operator, Vec<Criterion>>,
}

impl Branch {
    /// Record a condition. Empty sets are dropped here so they never reach translation.
    pub fn push(
        &mut self,
        operator: Operator,
        property: impl Into<String>,
        operand: Operand,
    ) -> &mut Self {
        if operand.is_effective() {
            self.conditions
                .entry(operator)
                .or_default()
                .push(Criterion {
                    property: property.into(),
                    operand,
                });
        }
        self
    }

    fn scalar(
        &mut self,
        operator: Operator,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.push(operator, property, Operand::Scalar(value.into()))
    }

    fn set<V, I>(&mut self, operator: Operator, property: impl Into<String>, values: I) -> &mut Self
    where
        V: Into<Scalar>,
        I: IntoIterator<Item = V>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(operator, property, Operand::Set(values))
    }

    pub fn equal(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::Equals, property, value)
    }

    pub fn not_equal(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::NotEqual, property, value)
    }

    pub fn contain(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::Contains, property, value)
    }

    pub fn not_contain(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.scalar(Operator::NotContains, property, value)
    }

    pub fn starts_with(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.scalar(Operator::StartsWith, property, value)
    }

    pub fn not_starts(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::NotStarts, property, value)
    }

    pub fn ends_with(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::EndsWith, property, value)
    }

    pub fn not_ends(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::NotEnds, property, value)
    }

    pub fn greater_than(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.scalar(Operator::GreaterThan, property, value)
    }

    pub fn greater_than_or_equal(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.scalar(Operator::GreaterThanOrEqual, property, value)
    }

    pub fn less_than(&mut self, property: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.scalar(Operator::LessThan, property, value)
    }

    pub fn less_than_or_equal(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.scalar(Operator::LessThanOrEqual, property, value)
    }

    /// Inclusive `BETWEEN first AND second`.
    pub fn range(
        &mut self,
        property: impl Into<String>,
        first: impl Into<Scalar>,
        second: impl Into<Scalar>,
    ) -> &mut Self {
        self.push(
            Operator::Range,
            property,
            Operand::Pair(first.into(), second.into()),
        )
    }

    pub fn not_range(
        &mut self,
        property: impl Into<String>,
        first: impl Into<Scalar>,
        second: impl Into<Scalar>,
    ) -> &mut Self {
        self.push(
            Operator::NotRange,
            property,
            Operand::Pair(first.into(), second.into()),
        )
    }

    pub fn include_group<V, I>(&mut self, property: impl Into<String>, values: I) -> &mut Self
    where
        V: Into<Scalar>,
        I: IntoIterator<Item = V>,
    {
        self.set(Operator::Group, property, values)
    }

    pub fn not_include_group<V, I>(&mut self, property: impl Into<String>, values: I) -> &mut Self
    where
        V: Into<Scalar>,
        I: IntoIterator<Item = V>,
    {
        self.set(Operator::NotGroup, property, values)
    }

    /// Matches the storage empty string.
    pub fn empty(&mut self, property: impl Into<String>) -> &mut Self {
        self.push(Operator::Empty, property, Operand::None)
    }

    pub fn not_empty(&mut self, property: impl Into<String>) -> &mut Self {
        self.push(Operator::NotEmpty, property, Operand::None)
    }

    /// Conditions recorded under `operator`.
    #[must_use]
    pub fn get(&self, operator: Operator) -> &[Criterion] {
        self.conditions.get(&operator).map_or(&[], Vec::as_slice)
    }

    /// Effective conditions, grouped by operator in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Operator, &Criterion)> {
        self.conditions
            .iter()
            .flat_map(|(op, list)| list.iter().map(move |c| (*op, c)))
            .filter(|(_, c)| c.operand.is_effective())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    must: Branch,
    must_not: Branch,
    should: Branch,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(&mut self) -> &mut Branch {
        &mut self.must
    }

    pub fn must_not(&mut self) -> &mut Branch {
        &mut self.must_not
    }

    pub fn should(&mut self) -> &mut Branch {
        &mut self.should
    }

    #[must_use]
    pub fn branch(&self, kind: BranchKind) -> &Branch {
        match kind {
            BranchKind::Must => &self.must,
            BranchKind::MustNot => &self.must_not,
            BranchKind::Should => &self.should,
        }
    }

    /// All three branches in translation order.
    pub fn branches(&self) -> impl Iterator<Item = (BranchKind, &Branch)> {
        [
            (BranchKind::Must, &self.must),
            (BranchKind::MustNot, &self.must_not),
            (BranchKind::Should, &self.should),
        ]
        .into_iter()
    }

    /// Every property referenced by an effective condition.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.branches()
            .flat_map(|(_, branch)| branch.iter().map(|(_, c)| c.property.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches().all(|(_, branch)| branch.is_empty())
    }

    pub fn clear(&mut self) {
        self.must.clear();
        self.must_not.clear();
        self.should.clear();
    }
}
