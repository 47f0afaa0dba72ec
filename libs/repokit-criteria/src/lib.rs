#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Criteria value objects and the mapping contract.
//!
//! Everything a caller constructs to talk to a repository lives here:
//! [`Filter`], [`Sort`], [`Fields`], [`DistinctFields`], [`Pageable`], and the
//! [`Mapping`] of an entity type. Rows travel as [`Row`]s of typed [`Scalar`]s.

pub mod error;
pub mod fields;
pub mod filter;
pub mod flatten;
pub mod mapping;
pub mod page;
pub mod scalar;
pub mod sort;

pub use error::CriteriaError;
pub use fields::{DistinctFields, Fields};
pub use filter::{Arity, Branch, BranchKind, Criterion, Filter, Operand, Operator};
pub use flatten::{Flattener, MappingFlattener, SerdeFlattener};
pub use mapping::{Identity, Mapping, PropertyMap, validate};
pub use page::{Page, Pageable};
pub use scalar::{Row, Scalar};
pub use sort::{Sort, SortDir, SortKey};
