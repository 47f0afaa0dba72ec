use repokit_criteria::CriteriaError;
use thiserror::Error;

use crate::DbError;

/// Errors surfaced by repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// `add_all` was handed an entity without an identity while the mapping
    /// does not let storage assign one. Raised before any statement runs.
    #[error("entity at position {index} carries no identity")]
    NotAnIdentity { index: usize },

    #[error("row for `{table}` has no value for column `{column}`")]
    MissingColumnValue { table: String, column: String },

    #[error("`{table}` row `{id}` could not be read back after writing it")]
    NotFoundAfterWrite { table: String, id: String },

    #[error("`{table}` row could not be hydrated into an entity")]
    Hydration { table: String },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sea_orm::DbErr> for RepoError {
    fn from(e: sea_orm::DbErr) -> Self {
        RepoError::Db(DbError::Sea(e))
    }
}

impl RepoError {
    /// Whether the error comes from resolving criteria rather than from storage.
    #[must_use]
    pub fn is_criteria(&self) -> bool {
        matches!(self, RepoError::Criteria(_))
    }
}
