use thiserror::Error;

/// Errors raised while building or resolving criteria against a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("property `{property}` is not mapped to a column")]
    UnmappedProperty { property: String },

    #[error("identity column `{identity}` of `{table}` has no property in the mapping")]
    MissingPrimaryKeyMapping { table: String, identity: String },

    #[error("invalid page request: page {page_number} with size {page_size}")]
    InvalidPage { page_number: u64, page_size: u64 },

    #[error("operator `{operator}` on `{property}` was given an operand of the wrong shape")]
    OperandMismatch { operator: String, property: String },

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("cannot flatten `{table}` entity: {reason}")]
    UnflattenableEntity { table: String, reason: String },
}
